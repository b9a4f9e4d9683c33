//! Pure aggregation over the ledger collections.
//!
//! Every function is a pure function of the collections it is handed plus a
//! reference date or month. Soft-deleted rows never count, empty input
//! aggregates to zero rather than an error, and nothing is cached between
//! calls.

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::MonthKey;
use crate::models::{
    AttendanceRecord, AttendanceStatus, CreditRecord, CreditState, ExpenseEntry, IncomeEntry,
    PayoutKind, SalaryPayment, Staff,
};
use crate::money::Money;

/// Income/expense/net for one day or one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub income: Money,
    pub expense: Money,
    pub net: Money,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        income: Money::ZERO,
        expense: Money::ZERO,
        net: Money::ZERO,
    };
}

pub fn daily_totals(incomes: &[IncomeEntry], expenses: &[ExpenseEntry], date: NaiveDate) -> Totals {
    let income: Money = incomes
        .iter()
        .filter(|e| !e.is_deleted && e.date == date)
        .map(|e| e.amount)
        .sum();
    let expense: Money = expenses
        .iter()
        .filter(|e| !e.is_deleted && e.date == date)
        .map(|e| e.amount)
        .sum();
    Totals {
        income,
        expense,
        net: income - expense,
    }
}

pub fn monthly_totals(
    incomes: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    month: MonthKey,
) -> Totals {
    let income: Money = incomes
        .iter()
        .filter(|e| !e.is_deleted && month.contains(e.date))
        .map(|e| e.amount)
        .sum();
    let expense: Money = expenses
        .iter()
        .filter(|e| !e.is_deleted && month.contains(e.date))
        .map(|e| e.amount)
        .sum();
    Totals {
        income,
        expense,
        net: income - expense,
    }
}

/// Head count for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub present_count: usize,
    pub total_staff: usize,
}

/// Present means an explicit Present record for that date. Everyone else,
/// recorded-absent or unrecorded, is not present; archived staff count
/// nowhere.
pub fn attendance_summary(
    records: &[AttendanceRecord],
    staff: &[Staff],
    date: NaiveDate,
) -> AttendanceSummary {
    let active: Vec<&str> = staff
        .iter()
        .filter(|s| !s.is_deleted)
        .map(|s| s.id.as_str())
        .collect();
    let present_count = records
        .iter()
        .filter(|r| r.date == date && r.status == AttendanceStatus::Present)
        .filter(|r| active.contains(&r.staff_id.as_str()))
        .count();
    AttendanceSummary {
        present_count,
        total_staff: active.len(),
    }
}

/// One staff member's month: what was paid out, split by payout type, and
/// what remains of the salary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBalance {
    pub paid_salary: Money,
    pub paid_advance: Money,
    /// monthlySalary minus both sums; negative means overpaid.
    pub balance: Money,
}

pub fn payroll_balance(
    staff: &Staff,
    payments: &[SalaryPayment],
    month: MonthKey,
) -> PayrollBalance {
    let mut paid_salary = Money::ZERO;
    let mut paid_advance = Money::ZERO;
    for payment in payments
        .iter()
        .filter(|p| p.staff_id == staff.id && month.contains(p.date))
    {
        match payment.kind {
            PayoutKind::Salary => paid_salary += payment.amount,
            PayoutKind::Advance => paid_advance += payment.amount,
        }
    }
    PayrollBalance {
        paid_salary,
        paid_advance,
        balance: staff.monthly_salary - paid_salary - paid_advance,
    }
}

/// Credit ledger broken out by state for a reference date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditStatus {
    pub pending: Vec<CreditRecord>,
    /// Subset of `pending` whose due date is strictly before the reference
    /// date.
    pub overdue: Vec<CreditRecord>,
    pub paid_total: Money,
}

impl CreditStatus {
    pub fn pending_total(&self) -> Money {
        self.pending.iter().map(|c| c.amount).sum()
    }
}

pub fn credit_status(credits: &[CreditRecord], today: NaiveDate) -> CreditStatus {
    let mut pending = Vec::new();
    let mut overdue = Vec::new();
    let mut paid_total = Money::ZERO;
    for credit in credits.iter().filter(|c| !c.is_deleted) {
        match credit.status {
            CreditState::Pending => {
                if credit.due_date.is_some_and(|due| due < today) {
                    overdue.push(credit.clone());
                }
                pending.push(credit.clone());
            }
            CreditState::Paid => paid_total += credit.amount,
        }
    }
    CreditStatus {
        pending,
        overdue,
        paid_total,
    }
}

/// One row on the reminders screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Reminder {
    OverdueCredit { credit: CreditRecord },
    SalaryDue { staff: Staff, balance: Money },
}

/// Overdue credits plus every active staff member still owed money in the
/// reference date's month.
pub fn reminders(
    credits: &[CreditRecord],
    staff: &[Staff],
    payments: &[SalaryPayment],
    today: NaiveDate,
) -> Vec<Reminder> {
    let month = MonthKey::of(today);
    let mut items: Vec<Reminder> = credit_status(credits, today)
        .overdue
        .into_iter()
        .map(|credit| Reminder::OverdueCredit { credit })
        .collect();
    for member in staff.iter().filter(|s| !s.is_deleted) {
        let balance = payroll_balance(member, payments, month).balance;
        if balance.is_positive() {
            items.push(Reminder::SalaryDue {
                staff: member.clone(),
                balance,
            });
        }
    }
    items
}

/// Badge count behind the reminders tab. Recomputed on every call.
pub fn reminder_count(
    credits: &[CreditRecord],
    staff: &[Staff],
    payments: &[SalaryPayment],
    today: NaiveDate,
) -> usize {
    reminders(credits, staff, payments, today).len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
