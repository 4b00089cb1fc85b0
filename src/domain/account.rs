use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Credits;

/// One balance-changing event. Entries are never rewritten once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Creation time in epoch milliseconds. Not unique across concurrent writers.
    pub id: String,
    pub date: DateTime<Utc>,
    /// Signed delta: positive credits the account, negative debits it
    pub amount: Credits,
    pub concept: String,
    /// Account balance right after this delta was applied
    pub balance_after: Credits,
}

impl Transaction {
    pub fn new(
        amount: Credits,
        concept: impl Into<String>,
        balance_after: Credits,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: date.timestamp_millis().to_string(),
            date,
            amount,
            concept: concept.into(),
            balance_after,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Per-user credit balance plus its transaction log, newest first.
///
/// Field names on the wire are `credits`, `transactions` and `lastUpdated`.
/// Missing `credits`/`transactions` read as zero/empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAccount {
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CreditAccount {
    /// A brand-new account with the given starting balance and no history.
    pub fn opening(initial_credits: Credits, now: DateTime<Utc>) -> Self {
        Self {
            credits: initial_credits,
            transactions: Vec::new(),
            last_updated: Some(now),
        }
    }

    /// Zero balance returned when there is no account context.
    /// Never persisted.
    pub fn placeholder() -> Self {
        Self {
            credits: 0,
            transactions: Vec::new(),
            last_updated: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.last_updated.is_none()
    }

    /// Newest transaction, if any.
    pub fn latest(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Build the replacement record after applying `amount`.
    /// The new transaction goes in front of the existing ones.
    /// Returns `None` if the balance would overflow.
    pub fn apply(
        &self,
        amount: Credits,
        concept: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let new_balance = self.credits.checked_add(amount)?;
        let transaction = Transaction::new(amount, concept, new_balance, now);

        let mut transactions = Vec::with_capacity(self.transactions.len() + 1);
        transactions.push(transaction);
        transactions.extend(self.transactions.iter().cloned());

        Some(Self {
            credits: new_balance,
            transactions,
            last_updated: Some(now),
        })
    }

    /// True when the newest snapshot matches the balance and every snapshot
    /// follows from the one before it.
    pub fn is_consistent(&self) -> bool {
        let head_matches = self
            .latest()
            .is_none_or(|tx| tx.balance_after == self.credits);

        head_matches
            && self
                .transactions
                .windows(2)
                .all(|pair| {
                    pair[0].balance_after.checked_sub(pair[0].amount)
                        == Some(pair[1].balance_after)
                })
    }
}
