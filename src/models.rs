//! Record types for the six ledger collections.
//!
//! Field names serialize in camelCase because that is the shape the legacy
//! snapshot arrays use (see `snapshot`). Enum values serialize as the exact
//! strings the ledger has always stored, e.g. `"Bulk Orders"` and
//! `"Milk & Curd"`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeSource {
    Restaurant,
    #[serde(rename = "Bulk Orders")]
    BulkOrders,
    Zomato,
    Other,
}

impl IncomeSource {
    /// Declaration order, which is also the report breakdown order.
    pub const ALL: [IncomeSource; 4] = [
        IncomeSource::Restaurant,
        IncomeSource::BulkOrders,
        IncomeSource::Zomato,
        IncomeSource::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IncomeSource::Restaurant => "Restaurant",
            IncomeSource::BulkOrders => "Bulk Orders",
            IncomeSource::Zomato => "Zomato",
            IncomeSource::Other => "Other",
        }
    }
}

impl fmt::Display for IncomeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncomeSource {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncomeSource::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| LedgerError::validation(format!("unknown income source {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Chicken,
    #[serde(rename = "Milk & Curd")]
    MilkAndCurd,
    Groceries,
    Vegetables,
    Water,
    Fish,
    Spices,
    Electricity,
    Rent,
    Other,
}

impl ExpenseCategory {
    /// Declaration order, which is also the report breakdown order.
    pub const ALL: [ExpenseCategory; 10] = [
        ExpenseCategory::Chicken,
        ExpenseCategory::MilkAndCurd,
        ExpenseCategory::Groceries,
        ExpenseCategory::Vegetables,
        ExpenseCategory::Water,
        ExpenseCategory::Fish,
        ExpenseCategory::Spices,
        ExpenseCategory::Electricity,
        ExpenseCategory::Rent,
        ExpenseCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::Chicken => "Chicken",
            ExpenseCategory::MilkAndCurd => "Milk & Curd",
            ExpenseCategory::Groceries => "Groceries",
            ExpenseCategory::Vegetables => "Vegetables",
            ExpenseCategory::Water => "Water",
            ExpenseCategory::Fish => "Fish",
            ExpenseCategory::Spices => "Spices",
            ExpenseCategory::Electricity => "Electricity",
            ExpenseCategory::Rent => "Rent",
            ExpenseCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| LedgerError::validation(format!("unknown expense category {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }

    /// The other status; toggling twice is the identity.
    pub fn toggled(self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Present,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            _ => Err(LedgerError::validation(format!(
                "unknown attendance status {s:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutKind {
    Salary,
    Advance,
}

impl PayoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayoutKind::Salary => "Salary",
            PayoutKind::Advance => "Advance",
        }
    }
}

impl fmt::Display for PayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Salary" => Ok(PayoutKind::Salary),
            "Advance" => Ok(PayoutKind::Advance),
            _ => Err(LedgerError::validation(format!("unknown payout type {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditState {
    Pending,
    Paid,
}

impl CreditState {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditState::Pending => "Pending",
            CreditState::Paid => "Paid",
        }
    }
}

impl fmt::Display for CreditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(CreditState::Pending),
            "Paid" => Ok(CreditState::Paid),
            _ => Err(LedgerError::validation(format!("unknown credit status {s:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeEntry {
    pub id: String,
    pub date: NaiveDate,
    pub source: IncomeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Money,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseEntry {
    pub id: String,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Money,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Free text, e.g. "Cook" or "Front desk".
    pub role: String,
    /// Salary target for the current and all future months; a raise is not
    /// versioned historically.
    pub monthly_salary: Money,
    #[serde(default)]
    pub is_deleted: bool,
}

/// At most one record exists per (staff, date); the stores reject duplicates
/// and the engine upserts through `toggle_attendance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub staff_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Append-only: payments are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPayment {
    pub id: String,
    pub staff_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: PayoutKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRecord {
    pub id: String,
    pub customer_name: String,
    pub phone: String,
    pub amount: Money,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub status: CreditState,
    /// Creation date, distinct from the optional due date.
    pub date: NaiveDate,
    #[serde(default)]
    pub is_deleted: bool,
}

// ---------------------------------------------------------------------------
// Drafts and patches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncome {
    pub date: NaiveDate,
    pub source: IncomeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Money,
}

impl NewIncome {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Money,
}

impl NewExpense {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: String,
    pub monthly_salary: Money,
}

impl NewStaff {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_text("name", &self.name)?;
        ensure_positive("monthlySalary", self.monthly_salary)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendance {
    pub staff_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub staff_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: PayoutKind,
}

impl NewPayment {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredit {
    pub customer_name: String,
    #[serde(default)]
    pub phone: String,
    pub amount: Money,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Creation date of the credit.
    pub date: NaiveDate,
}

impl NewCredit {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_text("customerName", &self.customer_name)?;
        ensure_text("reason", &self.reason)?;
        ensure_positive("amount", self.amount)
    }
}

/// Partial update for an income entry. `description: Some(None)` clears the
/// field; `None` leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct IncomePatch {
    pub date: Option<NaiveDate>,
    pub source: Option<IncomeSource>,
    pub description: Option<Option<String>>,
    pub amount: Option<Money>,
}

impl IncomePatch {
    pub fn validate(&self) -> LedgerResult<()> {
        match self.amount {
            Some(amount) => ensure_positive("amount", amount),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub date: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
    pub description: Option<Option<String>>,
    pub amount: Option<Money>,
}

impl ExpensePatch {
    pub fn validate(&self) -> LedgerResult<()> {
        match self.amount {
            Some(amount) => ensure_positive("amount", amount),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub monthly_salary: Option<Money>,
}

impl StaffPatch {
    pub fn validate(&self) -> LedgerResult<()> {
        if let Some(name) = &self.name {
            ensure_text("name", name)?;
        }
        match self.monthly_salary {
            Some(salary) => ensure_positive("monthlySalary", salary),
            None => Ok(()),
        }
    }
}

fn ensure_positive(field: &str, amount: Money) -> LedgerResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::validation(format!(
            "{field} must be greater than zero"
        )))
    }
}

fn ensure_text(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        Err(LedgerError::validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn test_enum_strings_round_trip() {
        for source in IncomeSource::ALL {
            assert_eq!(source.as_str().parse::<IncomeSource>().unwrap(), source);
        }
        for category in ExpenseCategory::ALL {
            assert_eq!(category.as_str().parse::<ExpenseCategory>().unwrap(), category);
        }
        assert_eq!(IncomeSource::BulkOrders.to_string(), "Bulk Orders");
        assert_eq!(ExpenseCategory::MilkAndCurd.to_string(), "Milk & Curd");
        assert!(matches!(
            "Takeaway".parse::<IncomeSource>(),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            "Fuel".parse::<ExpenseCategory>(),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_status_toggle_is_involution() {
        assert_eq!(AttendanceStatus::Present.toggled(), AttendanceStatus::Absent);
        assert_eq!(AttendanceStatus::Absent.toggled(), AttendanceStatus::Present);
        assert_eq!(
            AttendanceStatus::Present.toggled().toggled(),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn test_entity_json_uses_legacy_field_names() {
        let entry = IncomeEntry {
            id: "i1".into(),
            date: "2024-05-01".parse().unwrap(),
            source: IncomeSource::BulkOrders,
            description: None,
            amount: Money::from_rupees(1200),
            is_deleted: false,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["source"], "Bulk Orders");
        assert_eq!(json["amount"], 1200);
        assert_eq!(json["isDeleted"], false);
        assert!(json.get("description").is_none());

        let payment = SalaryPayment {
            id: "p1".into(),
            staff_id: "s1".into(),
            date: "2024-05-02".parse().unwrap(),
            amount: Money::from_rupees(500),
            kind: PayoutKind::Advance,
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["staffId"], "s1");
        assert_eq!(json["type"], "Advance");

        let staff = Staff {
            id: "s1".into(),
            name: "Ravi".into(),
            phone: "9876500000".into(),
            role: "Cook".into(),
            monthly_salary: Money::from_rupees(30_000),
            is_deleted: false,
        };
        let json = serde_json::to_value(&staff).unwrap();
        assert_eq!(json["monthlySalary"], 30_000);
    }

    #[test]
    fn test_legacy_json_without_optional_fields_parses() {
        let credit: CreditRecord = serde_json::from_str(
            r#"{
                "id": "c1",
                "customerName": "Meena",
                "phone": "9400000000",
                "amount": 750,
                "reason": "Dinner party",
                "status": "Pending",
                "date": "2024-04-28"
            }"#,
        )
        .unwrap();
        assert_eq!(credit.due_date, None);
        assert!(!credit.is_deleted);
        assert_eq!(credit.status, CreditState::Pending);
    }

    #[test]
    fn test_draft_validation() {
        let ok = NewIncome {
            date: "2024-05-01".parse().unwrap(),
            source: IncomeSource::Restaurant,
            description: Some("Lunch rush".into()),
            amount: Money::from_rupees(4_500),
        };
        assert!(ok.validate().is_ok());

        let zero = NewIncome { amount: Money::ZERO, ..ok.clone() };
        assert!(matches!(zero.validate(), Err(LedgerError::Validation(_))));

        let negative = NewPayment {
            staff_id: "s1".into(),
            date: "2024-05-01".parse().unwrap(),
            amount: Money::from_paise(-100),
            kind: PayoutKind::Salary,
        };
        assert!(matches!(negative.validate(), Err(LedgerError::Validation(_))));

        let unnamed = NewStaff {
            name: "  ".into(),
            phone: String::new(),
            role: "Cook".into(),
            monthly_salary: Money::from_rupees(18_000),
        };
        assert!(matches!(unnamed.validate(), Err(LedgerError::Validation(_))));

        let unreasoned = NewCredit {
            customer_name: "Meena".into(),
            phone: String::new(),
            amount: Money::from_rupees(750),
            reason: String::new(),
            due_date: None,
            date: "2024-04-28".parse().unwrap(),
        };
        assert!(matches!(unreasoned.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_patch_validation() {
        let patch = IncomePatch { amount: Some(Money::ZERO), ..Default::default() };
        assert!(matches!(patch.validate(), Err(LedgerError::Validation(_))));
        assert!(IncomePatch::default().validate().is_ok());

        let patch = StaffPatch { name: Some(String::new()), ..Default::default() };
        assert!(matches!(patch.validate(), Err(LedgerError::Validation(_))));
    }
}
