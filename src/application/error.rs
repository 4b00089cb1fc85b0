use thiserror::Error;

use crate::domain::Credits;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credit account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient credits for {user_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        user_id: String,
        balance: Credits,
        required: Credits,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Refusals that are part of normal operation rather than failures.
    pub fn is_refusal(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}
