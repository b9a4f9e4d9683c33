//! HotelFlow - Bookkeeping Core
//!
//! Income and expense ledgers, staff attendance and payroll, customer credit
//! tracking, and the aggregations the dashboard screens are built from.
//! Storage goes through the [`LedgerStore`] trait with SQLite
//! ([`SqliteLedger`]) and in-memory ([`MemoryLedger`]) backends. Amounts are
//! integer paise ([`Money`]), dates are ISO `YYYY-MM-DD` strings at the
//! edges and [`chrono::NaiveDate`] inside.

pub mod aggregate;
pub mod dates;
pub mod db;
pub mod engine;
pub mod error;
pub mod gate;
pub mod memory;
pub mod models;
pub mod money;
pub mod reports;
pub mod snapshot;
pub mod store;

pub use aggregate::{
    attendance_summary, credit_status, daily_totals, monthly_totals, payroll_balance,
    reminder_count, reminders, AttendanceSummary, CreditStatus, PayrollBalance, Reminder, Totals,
};
pub use dates::{parse_date, trailing_days, trailing_months, MonthKey};
pub use db::SqliteLedger;
pub use engine::{Ledger, LedgerConfig, PayoutAudit, PayoutError, PayoutReceipt, PayoutResult};
pub use error::{LedgerError, LedgerResult};
pub use gate::{AccessGate, GateError};
pub use memory::MemoryLedger;
pub use models::{
    AttendanceRecord, AttendanceStatus, CreditRecord, CreditState, ExpenseCategory, ExpenseEntry,
    ExpensePatch, IncomeEntry, IncomePatch, IncomeSource, NewAttendance, NewCredit, NewExpense,
    NewIncome, NewPayment, NewStaff, PayoutKind, SalaryPayment, Staff, StaffPatch,
};
pub use money::{format_inr, Money};
pub use reports::{
    daily_trend, dashboard, monthly_report, monthly_trend, CategoryLine, DailyPoint, Dashboard,
    MonthlyPoint, MonthlyReport, SourceLine,
};
pub use snapshot::Snapshot;
pub use store::{AttendanceFilter, CreditFilter, EntryFilter, LedgerStore, PaymentFilter};
