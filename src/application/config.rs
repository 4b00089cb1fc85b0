use crate::domain::{Credits, INITIAL_CREDITS};

/// Tunables for a `CreditLedger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Balance given to an account created on first read
    pub initial_credits: Credits,
}

impl LedgerConfig {
    pub fn with_initial_credits(mut self, initial_credits: Credits) -> Self {
        self.initial_credits = initial_credits;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_credits: INITIAL_CREDITS,
        }
    }
}
