//! Side-effecting ledger operations: attendance toggling, the payout saga,
//! credit settlement, and payout reconciliation.
//!
//! Everything here runs over a [`LedgerStore`]; the pure derivations live in
//! `aggregate` and `reports`.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AttendanceRecord, AttendanceStatus, CreditRecord, CreditState, ExpenseCategory, ExpenseEntry,
    IncomeSource, NewAttendance, NewExpense, NewIncome, NewPayment, PayoutKind, SalaryPayment,
};
use crate::money::Money;
use crate::store::{AttendanceFilter, EntryFilter, LedgerStore, PaymentFilter};

/// Behavior switches kept from revisions that disagreed with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerConfig {
    /// Post an income entry (source Other) when a credit is settled. Off by
    /// default: settling only flips the credit's status.
    pub mirror_settled_credit_income: bool,
}

/// Failure modes of the two-step payout write.
#[derive(Debug, Error)]
pub enum PayoutError {
    /// The payment itself was rejected or failed; nothing was written.
    #[error(transparent)]
    Payment(#[from] LedgerError),

    /// The payment committed but the mirrored expense write failed. The
    /// expense ledger under-reports payroll until the mirror is repaired
    /// with `mirror_payout` or flagged by `reconcile_payouts`.
    #[error("payment committed but expense mirror failed: {source}")]
    MirrorWrite {
        payment: SalaryPayment,
        source: LedgerError,
    },
}

pub type PayoutResult<T> = Result<T, PayoutError>;

/// A fully committed payout: the payment and its expense-ledger mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutReceipt {
    pub payment: SalaryPayment,
    pub mirrored_expense: ExpenseEntry,
}

/// Result of a payout reconciliation sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutAudit {
    pub checked: usize,
    /// Payments with no expense entry referencing them.
    pub orphans: Vec<SalaryPayment>,
}

/// The business operations over a ledger store.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Ledger { store, config }
    }

    /// Plain CRUD goes straight to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    // -----------------------------------------------------------------------
    // Attendance
    // -----------------------------------------------------------------------

    /// Upserts the attendance mark for (staff, date): the first toggle
    /// inserts a Present record, later toggles flip the existing record in
    /// place. This never creates a second record for the pair.
    pub fn toggle_attendance(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> LedgerResult<AttendanceRecord> {
        let existing = self
            .store
            .list_attendance(&AttendanceFilter::for_staff_on(staff_id, date))?
            .into_iter()
            .next();
        let record = match existing {
            Some(record) => self
                .store
                .set_attendance_status(&record.id, record.status.toggled())?,
            None => self.store.insert_attendance(NewAttendance {
                staff_id: staff_id.to_string(),
                date,
                status: AttendanceStatus::Present,
            })?,
        };
        info!(
            staff_id = %record.staff_id,
            date = %record.date,
            status = %record.status,
            "Attendance toggled"
        );
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Payouts
    // -----------------------------------------------------------------------

    /// Records money released to a staff member, then mirrors it into the
    /// expense ledger so expense totals include payroll.
    ///
    /// The two writes are not atomic. When the mirror write fails the
    /// payment stays committed and comes back inside
    /// [`PayoutError::MirrorWrite`] so the caller can retry the missing half.
    pub fn record_payout(
        &self,
        staff_id: &str,
        date: NaiveDate,
        amount: Money,
        kind: PayoutKind,
    ) -> PayoutResult<PayoutReceipt> {
        let staff = self.store.get_staff(staff_id)?;
        if staff.is_deleted {
            return Err(PayoutError::Payment(LedgerError::not_found(
                "staff", staff_id,
            )));
        }
        let payment = self.store.insert_payment(NewPayment {
            staff_id: staff_id.to_string(),
            date,
            amount,
            kind,
        })?;
        info!(
            payment_id = %payment.id,
            staff = %staff.name,
            amount = %payment.amount,
            kind = %payment.kind,
            "Payout recorded"
        );
        match self.write_mirror(&staff.name, &payment) {
            Ok(mirrored_expense) => Ok(PayoutReceipt {
                payment,
                mirrored_expense,
            }),
            Err(source) => {
                warn!(
                    payment_id = %payment.id,
                    error = %source,
                    "Expense mirror write failed after payment commit"
                );
                Err(PayoutError::MirrorWrite { payment, source })
            }
        }
    }

    /// Writes the expense mirror for an already committed payment. Used by
    /// the payout path and to repair orphans found by `reconcile_payouts`;
    /// archived staff resolve too, since their payment history stays valid.
    pub fn mirror_payout(&self, payment: &SalaryPayment) -> LedgerResult<ExpenseEntry> {
        let staff = self.store.get_staff(&payment.staff_id)?;
        self.write_mirror(&staff.name, payment)
    }

    fn write_mirror(&self, staff_name: &str, payment: &SalaryPayment) -> LedgerResult<ExpenseEntry> {
        self.store.insert_expense(NewExpense {
            date: payment.date,
            category: ExpenseCategory::Other,
            description: Some(mirror_description(staff_name, payment)),
            amount: payment.amount,
        })
    }

    /// Re-derives the expected expense mirror for every payment and reports
    /// the ones whose mirror is missing. Run after load; repair orphans with
    /// `mirror_payout`.
    pub fn reconcile_payouts(&self) -> LedgerResult<PayoutAudit> {
        let payments = self.store.list_payments(&PaymentFilter::all())?;
        let expenses = self.store.list_expenses(&EntryFilter::all())?;
        let orphans: Vec<SalaryPayment> = payments
            .iter()
            .filter(|payment| {
                let marker = payment_marker(&payment.id);
                !expenses.iter().any(|e| {
                    e.category == ExpenseCategory::Other
                        && e.description.as_deref().is_some_and(|d| d.contains(&marker))
                })
            })
            .cloned()
            .collect();
        let audit = PayoutAudit {
            checked: payments.len(),
            orphans,
        };
        if audit.orphans.is_empty() {
            info!(checked = audit.checked, "Payout reconciliation clean");
        } else {
            warn!(
                checked = audit.checked,
                orphans = audit.orphans.len(),
                "Un-mirrored salary payments found"
            );
        }
        Ok(audit)
    }

    // -----------------------------------------------------------------------
    // Credits
    // -----------------------------------------------------------------------

    /// Marks a pending credit paid. Paid is terminal: settling an
    /// already-paid credit is a no-op returning the stored record. With
    /// `mirror_settled_credit_income` set, settlement also posts an income
    /// entry (source Other) dated `settled_on`.
    pub fn settle_credit(
        &self,
        credit_id: &str,
        settled_on: NaiveDate,
    ) -> LedgerResult<CreditRecord> {
        let credit = self.store.get_credit(credit_id)?;
        if credit.status == CreditState::Paid {
            return Ok(credit);
        }
        let settled = self.store.mark_credit_paid(credit_id)?;
        info!(
            credit_id = %settled.id,
            customer = %settled.customer_name,
            amount = %settled.amount,
            "Credit settled"
        );
        if self.config.mirror_settled_credit_income {
            self.store.insert_income(NewIncome {
                date: settled_on,
                source: IncomeSource::Other,
                description: Some(format!("Credit settled by {}", settled.customer_name)),
                amount: settled.amount,
            })?;
        }
        Ok(settled)
    }
}

/// `"Salary payout to Ravi (payment <id>)"`. The embedded payment id is what
/// `reconcile_payouts` matches on; date and amount alone are ambiguous when
/// two equal payouts land on one day.
fn mirror_description(staff_name: &str, payment: &SalaryPayment) -> String {
    format!(
        "{} payout to {} {}",
        payment.kind,
        staff_name,
        payment_marker(&payment.id)
    )
}

fn payment_marker(payment_id: &str) -> String {
    format!("(payment {payment_id})")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
