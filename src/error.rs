//! Error taxonomy shared by the stores and the engine.

use thiserror::Error;

/// Failures surfaced by store operations and engine operations.
///
/// Aggregation never produces these: empty collections aggregate to zero, not
/// to an error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input rejected before any write: non-positive amount, empty required
    /// field, malformed date, or an unknown enum value.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An id (record, staff, credit) did not resolve to an existing,
    /// non-deleted record.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A write would break a uniqueness rule, e.g. a second attendance record
    /// for the same staff member and date.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed: SQLite error, poisoned lock, corrupt row.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        LedgerError::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        LedgerError::Storage(msg.into())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
