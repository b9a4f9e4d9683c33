//! Derived views for the dashboard and the reports screen.
//!
//! Everything here composes the `aggregate` primitives; the structs are the
//! JSON shapes the presentation layer renders directly.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{self, AttendanceSummary, Totals};
use crate::dates::{self, MonthKey};
use crate::models::{
    AttendanceRecord, CreditRecord, ExpenseCategory, ExpenseEntry, IncomeEntry, IncomeSource,
    Staff,
};
use crate::money::Money;

/// Everything the dashboard header shows for one reference date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: NaiveDate,
    pub day: Totals,
    pub month: Totals,
    pub pending_credit_count: usize,
    pub pending_credit_total: Money,
    pub attendance: AttendanceSummary,
}

pub fn dashboard(
    incomes: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    credits: &[CreditRecord],
    attendance: &[AttendanceRecord],
    staff: &[Staff],
    date: NaiveDate,
) -> Dashboard {
    let credit = aggregate::credit_status(credits, date);
    Dashboard {
        date,
        day: aggregate::daily_totals(incomes, expenses, date),
        month: aggregate::monthly_totals(incomes, expenses, MonthKey::of(date)),
        pending_credit_count: credit.pending.len(),
        pending_credit_total: credit.pending_total(),
        attendance: aggregate::attendance_summary(attendance, staff, date),
    }
}

/// One point of the dashboard chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
}

/// The trailing `days` days ending at `end`, oldest first. Days without
/// entries keep their zero point so the chart has one point per day.
pub fn daily_trend(
    incomes: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    end: NaiveDate,
    days: u32,
) -> Vec<DailyPoint> {
    dates::trailing_days(end, days)
        .into_iter()
        .map(|date| DailyPoint {
            date,
            totals: aggregate::daily_totals(incomes, expenses, date),
        })
        .collect()
}

/// One point of the 6-month report series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    pub month: MonthKey,
    #[serde(flatten)]
    pub totals: Totals,
}

/// The trailing `months` months ending at `end`, oldest first.
pub fn monthly_trend(
    incomes: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    end: MonthKey,
    months: u32,
) -> Vec<MonthlyPoint> {
    dates::trailing_months(end, months)
        .into_iter()
        .map(|month| MonthlyPoint {
            month,
            totals: aggregate::monthly_totals(incomes, expenses, month),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLine {
    pub source: IncomeSource,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryLine {
    pub category: ExpenseCategory,
    pub total: Money,
}

/// Month totals plus the per-source and per-category breakdowns. Rows appear
/// in enum declaration order; zero rows are omitted, matching the reports
/// screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub month: MonthKey,
    pub totals: Totals,
    pub income_by_source: Vec<SourceLine>,
    pub expense_by_category: Vec<CategoryLine>,
}

pub fn monthly_report(
    incomes: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    month: MonthKey,
) -> MonthlyReport {
    let income_by_source = IncomeSource::ALL
        .into_iter()
        .filter_map(|source| {
            let total: Money = incomes
                .iter()
                .filter(|e| !e.is_deleted && month.contains(e.date) && e.source == source)
                .map(|e| e.amount)
                .sum();
            total.is_positive().then_some(SourceLine { source, total })
        })
        .collect();
    let expense_by_category = ExpenseCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let total: Money = expenses
                .iter()
                .filter(|e| !e.is_deleted && month.contains(e.date) && e.category == category)
                .map(|e| e.amount)
                .sum();
            total
                .is_positive()
                .then_some(CategoryLine { category, total })
        })
        .collect();
    MonthlyReport {
        month,
        totals: aggregate::monthly_totals(incomes, expenses, month),
        income_by_source,
        expense_by_category,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, CreditState};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn income(date: &str, source: IncomeSource, rupees: i64) -> IncomeEntry {
        IncomeEntry {
            id: format!("i-{date}-{source}"),
            date: d(date),
            source,
            description: None,
            amount: Money::from_rupees(rupees),
            is_deleted: false,
        }
    }

    fn expense(date: &str, category: ExpenseCategory, rupees: i64) -> ExpenseEntry {
        ExpenseEntry {
            id: format!("e-{date}-{category}"),
            date: d(date),
            category,
            description: None,
            amount: Money::from_rupees(rupees),
            is_deleted: false,
        }
    }

    #[test]
    fn test_dashboard_for_reference_date() {
        let incomes = [
            income("2024-05-10", IncomeSource::Restaurant, 2_000),
            income("2024-05-01", IncomeSource::Zomato, 500),
        ];
        let expenses = [expense("2024-05-10", ExpenseCategory::Groceries, 700)];
        let credits = [CreditRecord {
            id: "c1".into(),
            customer_name: "Meena".into(),
            phone: String::new(),
            amount: Money::from_rupees(750),
            reason: "tab".into(),
            due_date: None,
            status: CreditState::Pending,
            date: d("2024-04-28"),
            is_deleted: false,
        }];
        let staff = [Staff {
            id: "s1".into(),
            name: "Ravi".into(),
            phone: String::new(),
            role: "Cook".into(),
            monthly_salary: Money::from_rupees(18_000),
            is_deleted: false,
        }];
        let attendance = [AttendanceRecord {
            id: "a1".into(),
            staff_id: "s1".into(),
            date: d("2024-05-10"),
            status: AttendanceStatus::Present,
        }];

        let view = dashboard(
            &incomes,
            &expenses,
            &credits,
            &attendance,
            &staff,
            d("2024-05-10"),
        );
        assert_eq!(view.day.income, Money::from_rupees(2_000));
        assert_eq!(view.day.net, Money::from_rupees(1_300));
        assert_eq!(view.month.income, Money::from_rupees(2_500));
        assert_eq!(view.pending_credit_count, 1);
        assert_eq!(view.pending_credit_total, Money::from_rupees(750));
        assert_eq!(view.attendance.present_count, 1);
        assert_eq!(view.attendance.total_staff, 1);
    }

    #[test]
    fn test_daily_trend_has_one_point_per_day_oldest_first() {
        let incomes = [income("2024-05-07", IncomeSource::Restaurant, 900)];
        let trend = daily_trend(&incomes, &[], d("2024-05-07"), 7);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, d("2024-05-01"));
        assert_eq!(trend[6].date, d("2024-05-07"));
        assert_eq!(trend[0].totals, Totals::ZERO);
        assert_eq!(trend[6].totals.income, Money::from_rupees(900));
    }

    #[test]
    fn test_monthly_trend_spans_six_months() {
        let incomes = [
            income("2024-01-10", IncomeSource::Restaurant, 100),
            income("2024-06-10", IncomeSource::Restaurant, 600),
        ];
        let trend = monthly_trend(&incomes, &[], "2024-06".parse().unwrap(), 6);
        assert_eq!(trend.len(), 6);
        assert_eq!(trend[0].month.to_string(), "2024-01");
        assert_eq!(trend[5].month.to_string(), "2024-06");
        assert_eq!(trend[0].totals.income, Money::from_rupees(100));
        assert_eq!(trend[1].totals, Totals::ZERO);
        assert_eq!(trend[5].totals.income, Money::from_rupees(600));
    }

    #[test]
    fn test_monthly_report_breakdowns() {
        let incomes = [
            income("2024-05-01", IncomeSource::Zomato, 300),
            income("2024-05-02", IncomeSource::Restaurant, 1_000),
            income("2024-05-03", IncomeSource::Restaurant, 500),
            income("2024-06-01", IncomeSource::BulkOrders, 9_999),
        ];
        let mut hidden = expense("2024-05-02", ExpenseCategory::Rent, 8_000);
        hidden.is_deleted = true;
        let expenses = [
            expense("2024-05-02", ExpenseCategory::Chicken, 450),
            expense("2024-05-04", ExpenseCategory::Electricity, 1_200),
            hidden,
        ];

        let report = monthly_report(&incomes, &expenses, "2024-05".parse().unwrap());
        assert_eq!(report.totals.income, Money::from_rupees(1_800));
        assert_eq!(report.totals.expense, Money::from_rupees(1_650));

        // Enum order, zero rows omitted.
        let sources: Vec<IncomeSource> = report.income_by_source.iter().map(|l| l.source).collect();
        assert_eq!(sources, [IncomeSource::Restaurant, IncomeSource::Zomato]);
        assert_eq!(report.income_by_source[0].total, Money::from_rupees(1_500));

        let categories: Vec<ExpenseCategory> =
            report.expense_by_category.iter().map(|l| l.category).collect();
        assert_eq!(
            categories,
            [ExpenseCategory::Chicken, ExpenseCategory::Electricity]
        );
    }

    #[test]
    fn test_report_serializes_for_presentation() {
        let incomes = [income("2024-05-01", IncomeSource::BulkOrders, 300)];
        let report = monthly_report(&incomes, &[], "2024-05".parse().unwrap());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["month"], "2024-05");
        assert_eq!(json["totals"]["income"], 300);
        assert_eq!(json["incomeBySource"][0]["source"], "Bulk Orders");

        let trend = daily_trend(&incomes, &[], d("2024-05-01"), 2);
        let json = serde_json::to_value(&trend).unwrap();
        assert_eq!(json[1]["date"], "2024-05-01");
        assert_eq!(json[1]["income"], 300);
        assert_eq!(json[0]["net"], 0);
    }
}
