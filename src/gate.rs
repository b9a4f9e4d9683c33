//! The shared-secret access gate.
//!
//! One static secret for the whole business, checked before the books open.
//! Deliberately not a security boundary: no lockout, no rate limiting, no
//! sessions. The secret is kept as a bcrypt hash so it is at least not
//! stored in the clear; the caller persists the hash wherever it keeps its
//! configuration.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GateError {
    /// Wrong secret. Terminal for this attempt; the caller may simply ask
    /// again.
    #[error("access denied")]
    Rejected,

    #[error("secret must not be empty")]
    EmptySecret,

    #[error("secret hashing failed: {0}")]
    Hash(String),
}

/// A configured gate holding the bcrypt hash of the shared secret.
#[derive(Debug, Clone)]
pub struct AccessGate {
    secret_hash: String,
}

impl AccessGate {
    /// Hashes a new shared secret.
    pub fn new(secret: &str) -> Result<Self, GateError> {
        if secret.trim().is_empty() {
            return Err(GateError::EmptySecret);
        }
        let secret_hash = bcrypt::hash(secret, bcrypt::DEFAULT_COST)
            .map_err(|e| GateError::Hash(e.to_string()))?;
        Ok(AccessGate { secret_hash })
    }

    /// Wraps an already stored hash.
    pub fn from_hash(secret_hash: impl Into<String>) -> Self {
        AccessGate {
            secret_hash: secret_hash.into(),
        }
    }

    /// The stored hash, for persisting.
    pub fn hash(&self) -> &str {
        &self.secret_hash
    }

    /// Checks a candidate secret.
    pub fn verify(&self, candidate: &str) -> Result<(), GateError> {
        if bcrypt::verify(candidate, &self.secret_hash).unwrap_or(false) {
            info!("gate opened");
            Ok(())
        } else {
            Err(GateError::Rejected)
        }
    }
}
