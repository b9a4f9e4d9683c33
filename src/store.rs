//! The repository boundary between persistence and the engine.
//!
//! Both stores implement [`LedgerStore`]: `db::SqliteLedger` for real
//! deployments and `memory::MemoryLedger` for tests and legacy-snapshot
//! work. Rules both must uphold:
//!
//! - drafts are validated before any write (amount > 0, required text);
//! - new attendance and payments must reference a non-archived staff member;
//! - at most one attendance record per (staff, date), rejected with a
//!   conflict even though `toggle_attendance` never produces duplicates;
//! - soft-deleted rows are invisible to listing unless explicitly requested,
//!   but are never physically removed.

use chrono::NaiveDate;

use crate::dates::MonthKey;
use crate::error::LedgerResult;
use crate::models::{
    AttendanceRecord, AttendanceStatus, CreditRecord, CreditState, ExpenseEntry, ExpensePatch,
    IncomeEntry, IncomePatch, NewAttendance, NewCredit, NewExpense, NewIncome, NewPayment,
    NewStaff, SalaryPayment, Staff, StaffPatch,
};

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Date-bounded listing for income and expense entries. Bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Include soft-deleted rows; only snapshot export and audits want them.
    pub include_deleted: bool,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn on(date: NaiveDate) -> Self {
        EntryFilter {
            from: Some(date),
            to: Some(date),
            ..Self::default()
        }
    }

    pub fn month(month: MonthKey) -> Self {
        EntryFilter {
            from: Some(month.start()),
            to: Some(month.end()),
            ..Self::default()
        }
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub staff_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn on(date: NaiveDate) -> Self {
        AttendanceFilter {
            from: Some(date),
            to: Some(date),
            ..Self::default()
        }
    }

    pub fn for_staff_on(staff_id: impl Into<String>, date: NaiveDate) -> Self {
        AttendanceFilter {
            staff_id: Some(staff_id.into()),
            from: Some(date),
            to: Some(date),
        }
    }

    pub(crate) fn matches(&self, record: &AttendanceRecord) -> bool {
        self.staff_id.as_deref().map_or(true, |id| record.staff_id == id)
            && self.from.map_or(true, |from| record.date >= from)
            && self.to.map_or(true, |to| record.date <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub staff_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl PaymentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn month(month: MonthKey) -> Self {
        PaymentFilter {
            from: Some(month.start()),
            to: Some(month.end()),
            ..Self::default()
        }
    }

    pub fn for_staff_month(staff_id: impl Into<String>, month: MonthKey) -> Self {
        PaymentFilter {
            staff_id: Some(staff_id.into()),
            from: Some(month.start()),
            to: Some(month.end()),
        }
    }

    pub(crate) fn matches(&self, payment: &SalaryPayment) -> bool {
        self.staff_id.as_deref().map_or(true, |id| payment.staff_id == id)
            && self.from.map_or(true, |from| payment.date >= from)
            && self.to.map_or(true, |to| payment.date <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreditFilter {
    pub status: Option<CreditState>,
    /// Include soft-deleted rows; only snapshot export and audits want them.
    pub include_deleted: bool,
}

impl CreditFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: CreditState) -> Self {
        CreditFilter {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// The store trait
// ---------------------------------------------------------------------------

/// Per-entity CRUD over the six ledger collections.
///
/// No method spans more than one collection; cross-entity effects (the payout
/// mirror, settlement income) are the engine's job, which is also why there
/// is no transactional surface here.
pub trait LedgerStore {
    // Income
    fn insert_income(&self, draft: NewIncome) -> LedgerResult<IncomeEntry>;
    fn update_income(&self, id: &str, patch: IncomePatch) -> LedgerResult<IncomeEntry>;
    /// Soft delete; the row stays behind `include_deleted`.
    fn delete_income(&self, id: &str) -> LedgerResult<()>;
    fn list_income(&self, filter: &EntryFilter) -> LedgerResult<Vec<IncomeEntry>>;

    // Expenses
    fn insert_expense(&self, draft: NewExpense) -> LedgerResult<ExpenseEntry>;
    fn update_expense(&self, id: &str, patch: ExpensePatch) -> LedgerResult<ExpenseEntry>;
    fn delete_expense(&self, id: &str) -> LedgerResult<()>;
    fn list_expenses(&self, filter: &EntryFilter) -> LedgerResult<Vec<ExpenseEntry>>;

    // Staff
    fn insert_staff(&self, draft: NewStaff) -> LedgerResult<Staff>;
    fn update_staff(&self, id: &str, patch: StaffPatch) -> LedgerResult<Staff>;
    /// Archives the staff member. Their attendance and payment history stays
    /// valid and summable.
    fn delete_staff(&self, id: &str) -> LedgerResult<()>;
    fn list_staff(&self, include_archived: bool) -> LedgerResult<Vec<Staff>>;
    /// Resolves archived staff too, for payment history and repairs.
    fn get_staff(&self, id: &str) -> LedgerResult<Staff>;

    // Attendance
    fn insert_attendance(&self, draft: NewAttendance) -> LedgerResult<AttendanceRecord>;
    fn set_attendance_status(
        &self,
        id: &str,
        status: AttendanceStatus,
    ) -> LedgerResult<AttendanceRecord>;
    fn list_attendance(&self, filter: &AttendanceFilter) -> LedgerResult<Vec<AttendanceRecord>>;

    // Salary payments
    fn insert_payment(&self, draft: NewPayment) -> LedgerResult<SalaryPayment>;
    fn list_payments(&self, filter: &PaymentFilter) -> LedgerResult<Vec<SalaryPayment>>;

    // Credits
    fn insert_credit(&self, draft: NewCredit) -> LedgerResult<CreditRecord>;
    /// Not-found covers soft-deleted credits: they cannot be settled.
    fn get_credit(&self, id: &str) -> LedgerResult<CreditRecord>;
    fn mark_credit_paid(&self, id: &str) -> LedgerResult<CreditRecord>;
    fn delete_credit(&self, id: &str) -> LedgerResult<()>;
    fn list_credits(&self, filter: &CreditFilter) -> LedgerResult<Vec<CreditRecord>>;
}
