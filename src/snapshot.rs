//! The legacy snapshot format.
//!
//! The local-storage era persisted each collection as a camelCase JSON
//! array. A snapshot is one document holding all six, used to move a device
//! off the legacy format or to back up a store. Ids and soft-deleted rows
//! travel intact; seeding happens through `MemoryLedger::from_snapshot` or
//! `SqliteLedger::import_snapshot`.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AttendanceRecord, CreditRecord, ExpenseEntry, IncomeEntry, SalaryPayment, Staff,
};
use crate::store::{AttendanceFilter, CreditFilter, EntryFilter, LedgerStore, PaymentFilter};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub income: Vec<IncomeEntry>,
    pub expenses: Vec<ExpenseEntry>,
    pub staff: Vec<Staff>,
    pub attendance: Vec<AttendanceRecord>,
    pub salary_payments: Vec<SalaryPayment>,
    pub credits: Vec<CreditRecord>,
}

impl Snapshot {
    /// Parses a snapshot document. Malformed dates, unknown enum values and
    /// bad amounts surface as validation errors.
    pub fn read_from(reader: impl Read) -> LedgerResult<Snapshot> {
        serde_json::from_reader(reader)
            .map_err(|e| LedgerError::validation(format!("snapshot parse failed: {e}")))
    }

    pub fn write_to(&self, writer: impl Write) -> LedgerResult<()> {
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| LedgerError::storage(format!("snapshot write failed: {e}")))
    }

    /// Pulls every row out of a store, soft-deleted ones included.
    pub fn collect(store: &impl LedgerStore) -> LedgerResult<Snapshot> {
        let everything = EntryFilter {
            include_deleted: true,
            ..Default::default()
        };
        Ok(Snapshot {
            income: store.list_income(&everything)?,
            expenses: store.list_expenses(&everything)?,
            staff: store.list_staff(true)?,
            attendance: store.list_attendance(&AttendanceFilter::all())?,
            salary_payments: store.list_payments(&PaymentFilter::all())?,
            credits: store.list_credits(&CreditFilter {
                include_deleted: true,
                ..Default::default()
            })?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty()
            && self.expenses.is_empty()
            && self.staff.is_empty()
            && self.attendance.is_empty()
            && self.salary_payments.is_empty()
            && self.credits.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
