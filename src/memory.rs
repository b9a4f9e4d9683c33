//! In-memory ledger store.
//!
//! Holds whole collections behind a mutex, which is exactly how the legacy
//! local-storage era kept its data. The engine and report tests run against
//! this store; `from_snapshot` / `snapshot` move data in and out of the
//! legacy JSON format with ids and soft-deleted rows intact.

use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AttendanceRecord, AttendanceStatus, CreditRecord, CreditState, ExpenseEntry, ExpensePatch,
    IncomeEntry, IncomePatch, NewAttendance, NewCredit, NewExpense, NewIncome, NewPayment,
    NewStaff, SalaryPayment, Staff, StaffPatch,
};
use crate::snapshot::Snapshot;
use crate::store::{AttendanceFilter, CreditFilter, EntryFilter, LedgerStore, PaymentFilter};

#[derive(Debug, Default)]
struct State {
    income: Vec<IncomeEntry>,
    expenses: Vec<ExpenseEntry>,
    staff: Vec<Staff>,
    attendance: Vec<AttendanceRecord>,
    payments: Vec<SalaryPayment>,
    credits: Vec<CreditRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a legacy snapshot, keeping ids and deleted rows.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        MemoryLedger {
            state: Mutex::new(State {
                income: snapshot.income,
                expenses: snapshot.expenses,
                staff: snapshot.staff,
                attendance: snapshot.attendance,
                payments: snapshot.salary_payments,
                credits: snapshot.credits,
            }),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::storage("ledger state lock poisoned"))
    }
}

fn ensure_active_staff(state: &State, staff_id: &str) -> LedgerResult<()> {
    if state.staff.iter().any(|s| s.id == staff_id && !s.is_deleted) {
        Ok(())
    } else {
        Err(LedgerError::not_found("staff", staff_id))
    }
}

impl LedgerStore for MemoryLedger {
    fn insert_income(&self, draft: NewIncome) -> LedgerResult<IncomeEntry> {
        draft.validate()?;
        let mut state = self.lock()?;
        let entry = IncomeEntry {
            id: Uuid::new_v4().to_string(),
            date: draft.date,
            source: draft.source,
            description: draft.description,
            amount: draft.amount,
            is_deleted: false,
        };
        state.income.push(entry.clone());
        Ok(entry)
    }

    fn update_income(&self, id: &str, patch: IncomePatch) -> LedgerResult<IncomeEntry> {
        patch.validate()?;
        let mut state = self.lock()?;
        let entry = state
            .income
            .iter_mut()
            .find(|e| e.id == id && !e.is_deleted)
            .ok_or_else(|| LedgerError::not_found("income entry", id))?;
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(source) = patch.source {
            entry.source = source;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        Ok(entry.clone())
    }

    fn delete_income(&self, id: &str) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let entry = state
            .income
            .iter_mut()
            .find(|e| e.id == id && !e.is_deleted)
            .ok_or_else(|| LedgerError::not_found("income entry", id))?;
        entry.is_deleted = true;
        Ok(())
    }

    fn list_income(&self, filter: &EntryFilter) -> LedgerResult<Vec<IncomeEntry>> {
        let state = self.lock()?;
        Ok(state
            .income
            .iter()
            .filter(|e| (filter.include_deleted || !e.is_deleted) && filter.contains(e.date))
            .cloned()
            .collect())
    }

    fn insert_expense(&self, draft: NewExpense) -> LedgerResult<ExpenseEntry> {
        draft.validate()?;
        let mut state = self.lock()?;
        let entry = ExpenseEntry {
            id: Uuid::new_v4().to_string(),
            date: draft.date,
            category: draft.category,
            description: draft.description,
            amount: draft.amount,
            is_deleted: false,
        };
        state.expenses.push(entry.clone());
        Ok(entry)
    }

    fn update_expense(&self, id: &str, patch: ExpensePatch) -> LedgerResult<ExpenseEntry> {
        patch.validate()?;
        let mut state = self.lock()?;
        let entry = state
            .expenses
            .iter_mut()
            .find(|e| e.id == id && !e.is_deleted)
            .ok_or_else(|| LedgerError::not_found("expense entry", id))?;
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        Ok(entry.clone())
    }

    fn delete_expense(&self, id: &str) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let entry = state
            .expenses
            .iter_mut()
            .find(|e| e.id == id && !e.is_deleted)
            .ok_or_else(|| LedgerError::not_found("expense entry", id))?;
        entry.is_deleted = true;
        Ok(())
    }

    fn list_expenses(&self, filter: &EntryFilter) -> LedgerResult<Vec<ExpenseEntry>> {
        let state = self.lock()?;
        Ok(state
            .expenses
            .iter()
            .filter(|e| (filter.include_deleted || !e.is_deleted) && filter.contains(e.date))
            .cloned()
            .collect())
    }

    fn insert_staff(&self, draft: NewStaff) -> LedgerResult<Staff> {
        draft.validate()?;
        let mut state = self.lock()?;
        let staff = Staff {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            phone: draft.phone,
            role: draft.role,
            monthly_salary: draft.monthly_salary,
            is_deleted: false,
        };
        state.staff.push(staff.clone());
        Ok(staff)
    }

    fn update_staff(&self, id: &str, patch: StaffPatch) -> LedgerResult<Staff> {
        patch.validate()?;
        let mut state = self.lock()?;
        let staff = state
            .staff
            .iter_mut()
            .find(|s| s.id == id && !s.is_deleted)
            .ok_or_else(|| LedgerError::not_found("staff", id))?;
        if let Some(name) = patch.name {
            staff.name = name;
        }
        if let Some(phone) = patch.phone {
            staff.phone = phone;
        }
        if let Some(role) = patch.role {
            staff.role = role;
        }
        if let Some(salary) = patch.monthly_salary {
            staff.monthly_salary = salary;
        }
        Ok(staff.clone())
    }

    fn delete_staff(&self, id: &str) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let staff = state
            .staff
            .iter_mut()
            .find(|s| s.id == id && !s.is_deleted)
            .ok_or_else(|| LedgerError::not_found("staff", id))?;
        staff.is_deleted = true;
        Ok(())
    }

    fn list_staff(&self, include_archived: bool) -> LedgerResult<Vec<Staff>> {
        let state = self.lock()?;
        Ok(state
            .staff
            .iter()
            .filter(|s| include_archived || !s.is_deleted)
            .cloned()
            .collect())
    }

    fn get_staff(&self, id: &str) -> LedgerResult<Staff> {
        let state = self.lock()?;
        state
            .staff
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("staff", id))
    }

    fn insert_attendance(&self, draft: NewAttendance) -> LedgerResult<AttendanceRecord> {
        let mut state = self.lock()?;
        ensure_active_staff(&state, &draft.staff_id)?;
        if state
            .attendance
            .iter()
            .any(|r| r.staff_id == draft.staff_id && r.date == draft.date)
        {
            return Err(LedgerError::conflict(format!(
                "attendance already recorded for staff {} on {}",
                draft.staff_id, draft.date
            )));
        }
        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            staff_id: draft.staff_id,
            date: draft.date,
            status: draft.status,
        };
        state.attendance.push(record.clone());
        Ok(record)
    }

    fn set_attendance_status(
        &self,
        id: &str,
        status: AttendanceStatus,
    ) -> LedgerResult<AttendanceRecord> {
        let mut state = self.lock()?;
        let record = state
            .attendance
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| LedgerError::not_found("attendance record", id))?;
        record.status = status;
        Ok(record.clone())
    }

    fn list_attendance(&self, filter: &AttendanceFilter) -> LedgerResult<Vec<AttendanceRecord>> {
        let state = self.lock()?;
        Ok(state
            .attendance
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn insert_payment(&self, draft: NewPayment) -> LedgerResult<SalaryPayment> {
        draft.validate()?;
        let mut state = self.lock()?;
        ensure_active_staff(&state, &draft.staff_id)?;
        let payment = SalaryPayment {
            id: Uuid::new_v4().to_string(),
            staff_id: draft.staff_id,
            date: draft.date,
            amount: draft.amount,
            kind: draft.kind,
        };
        state.payments.push(payment.clone());
        Ok(payment)
    }

    fn list_payments(&self, filter: &PaymentFilter) -> LedgerResult<Vec<SalaryPayment>> {
        let state = self.lock()?;
        Ok(state
            .payments
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    fn insert_credit(&self, draft: NewCredit) -> LedgerResult<CreditRecord> {
        draft.validate()?;
        let mut state = self.lock()?;
        let credit = CreditRecord {
            id: Uuid::new_v4().to_string(),
            customer_name: draft.customer_name,
            phone: draft.phone,
            amount: draft.amount,
            reason: draft.reason,
            due_date: draft.due_date,
            status: CreditState::Pending,
            date: draft.date,
            is_deleted: false,
        };
        state.credits.push(credit.clone());
        Ok(credit)
    }

    fn get_credit(&self, id: &str) -> LedgerResult<CreditRecord> {
        let state = self.lock()?;
        state
            .credits
            .iter()
            .find(|c| c.id == id && !c.is_deleted)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("credit record", id))
    }

    fn mark_credit_paid(&self, id: &str) -> LedgerResult<CreditRecord> {
        let mut state = self.lock()?;
        let credit = state
            .credits
            .iter_mut()
            .find(|c| c.id == id && !c.is_deleted)
            .ok_or_else(|| LedgerError::not_found("credit record", id))?;
        credit.status = CreditState::Paid;
        Ok(credit.clone())
    }

    fn delete_credit(&self, id: &str) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let credit = state
            .credits
            .iter_mut()
            .find(|c| c.id == id && !c.is_deleted)
            .ok_or_else(|| LedgerError::not_found("credit record", id))?;
        credit.is_deleted = true;
        Ok(())
    }

    fn list_credits(&self, filter: &CreditFilter) -> LedgerResult<Vec<CreditRecord>> {
        let state = self.lock()?;
        Ok(state
            .credits
            .iter()
            .filter(|c| {
                (filter.include_deleted || !c.is_deleted)
                    && filter.status.map_or(true, |s| c.status == s)
            })
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
