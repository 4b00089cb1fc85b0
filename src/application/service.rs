use chrono::Utc;
use tracing::{debug, error, info};

use crate::domain::{CreditAccount, Credits, Transaction};
use crate::storage::{CreditStore, Repository};

use super::{LedgerConfig, LedgerError};

/// Per-user credit ledger over an injected document store.
///
/// Two flavours of every operation are offered. The `try_*` methods report
/// exactly what happened through [`LedgerError`]. The plain ones collapse
/// every failure into a zero-credit placeholder or `false`, logging the cause.
///
/// Updates are read-modify-write with a full-record overwrite and no locking:
/// two concurrent updates on the same user can lose one of the deltas.
pub struct CreditLedger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: CreditStore> CreditLedger<S> {
    /// Create a ledger with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================
    // Account operations
    // ========================

    /// Get the account for `user_id`, creating it with the initial balance on
    /// first access.
    ///
    /// An empty id yields the zero-credit placeholder without touching the
    /// store. Store failures also yield the placeholder.
    pub async fn get_account(&self, user_id: &str) -> CreditAccount {
        match self.try_get_account(user_id).await {
            Ok(account) => account,
            Err(err) => {
                report("get", user_id, &err);
                CreditAccount::placeholder()
            }
        }
    }

    /// Apply a signed `amount` to the balance and log it. Returns `true` once
    /// the new record is stored.
    ///
    /// A missing account is treated as zero credits and no history; the
    /// initial balance is not granted here. The balance may go negative.
    pub async fn update_account(&self, user_id: &str, amount: Credits, concept: &str) -> bool {
        match self.try_update_account(user_id, amount, concept).await {
            Ok(_) => true,
            Err(err) => {
                report("update", user_id, &err);
                false
            }
        }
    }

    /// Take `amount` credits from an existing account. Returns `false` if
    /// the account does not exist, the balance is too low or the store fails.
    pub async fn deduct_account(&self, user_id: &str, amount: Credits, concept: &str) -> bool {
        match self.try_deduct_account(user_id, amount, concept).await {
            Ok(_) => true,
            Err(err) => {
                report("deduct", user_id, &err);
                false
            }
        }
    }

    /// Strict form of [`get_account`](Self::get_account).
    pub async fn try_get_account(&self, user_id: &str) -> Result<CreditAccount, LedgerError> {
        if user_id.is_empty() {
            return Ok(CreditAccount::placeholder());
        }

        if let Some(account) = self.store.fetch(user_id).await? {
            return Ok(account);
        }

        let opening = CreditAccount::opening(self.config.initial_credits, Utc::now());
        let account = self.store.insert_if_absent(user_id, &opening).await?;
        info!(user_id, credits = account.credits, "created credit account");
        Ok(account)
    }

    /// Strict form of [`update_account`](Self::update_account).
    /// Returns the record as stored.
    pub async fn try_update_account(
        &self,
        user_id: &str,
        amount: Credits,
        concept: &str,
    ) -> Result<CreditAccount, LedgerError> {
        if user_id.is_empty() {
            return Err(LedgerError::InvalidInput("user id is empty".to_string()));
        }

        let current = self
            .store
            .fetch(user_id)
            .await?
            .unwrap_or_else(CreditAccount::placeholder);

        let updated = current.apply(amount, concept, Utc::now()).ok_or_else(|| {
            LedgerError::InvalidInput(format!(
                "applying {} to balance {} overflows",
                amount, current.credits
            ))
        })?;

        self.store.put(user_id, &updated).await?;
        debug!(
            user_id,
            amount,
            balance = updated.credits,
            concept,
            "applied credit update"
        );
        Ok(updated)
    }

    /// Strict form of [`deduct_account`](Self::deduct_account).
    /// `amount` is the positive number of credits to take.
    pub async fn try_deduct_account(
        &self,
        user_id: &str,
        amount: Credits,
        concept: &str,
    ) -> Result<CreditAccount, LedgerError> {
        if user_id.is_empty() {
            return Err(LedgerError::InvalidInput("user id is empty".to_string()));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidInput(
                "deduction must be positive".to_string(),
            ));
        }

        let current = self
            .store
            .fetch(user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;

        if current.credits < amount {
            return Err(LedgerError::InsufficientFunds {
                user_id: user_id.to_string(),
                balance: current.credits,
                required: amount,
            });
        }

        // The update path reads the record again before writing
        self.try_update_account(user_id, -amount, concept).await
    }

    // ========================
    // Queries
    // ========================

    /// Transactions for `user_id`, newest first. Never creates an account.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if user_id.is_empty() {
            return Err(LedgerError::InvalidInput("user id is empty".to_string()));
        }

        let mut transactions = self
            .store
            .fetch(user_id)
            .await?
            .map(|account| account.transactions)
            .unwrap_or_default();

        if let Some(limit) = limit {
            transactions.truncate(limit);
        }
        Ok(transactions)
    }

    /// Every stored account, ordered by user id.
    pub async fn list_accounts(&self) -> Result<Vec<(String, CreditAccount)>, LedgerError> {
        Ok(self.store.list().await?)
    }

    /// User ids whose transaction snapshots do not add up to the stored
    /// balance, e.g. records edited outside the ledger. A lost update leaves
    /// a consistent record behind and is not reported here.
    pub async fn inconsistent_accounts(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|(_, account)| !account.is_consistent())
            .map(|(user_id, _)| user_id)
            .collect())
    }
}

impl CreditLedger<Repository> {
    /// Initialize a SQLite database at the given path, creating it if needed.
    pub async fn init(database_path: &str, config: LedgerConfig) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::with_config(repo, config))
    }

    /// Connect to an existing SQLite database.
    pub async fn connect(database_path: &str, config: LedgerConfig) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::with_config(repo, config))
    }
}

fn report(operation: &str, user_id: &str, err: &LedgerError) {
    if err.is_refusal() {
        debug!(operation, user_id, error = %err, "credit operation refused");
    } else {
        error!(operation, user_id, error = %err, "credit operation failed");
    }
}
