use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::CreditAccount;

use super::CreditStore;

/// In-process credit store, useful for embedding and tests.
/// The lock is held for one call at a time only.
#[derive(Default)]
pub struct MemoryRepository {
    accounts: Mutex<BTreeMap<String, CreditAccount>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (String, CreditAccount)>,
    {
        Self {
            accounts: Mutex::new(accounts.into_iter().collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }
}

#[async_trait]
impl CreditStore for MemoryRepository {
    async fn fetch(&self, user_id: &str) -> Result<Option<CreditAccount>> {
        Ok(self.accounts.lock().await.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, account: &CreditAccount) -> Result<()> {
        self.accounts
            .lock()
            .await
            .insert(user_id.to_string(), account.clone());
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        user_id: &str,
        account: &CreditAccount,
    ) -> Result<CreditAccount> {
        let mut accounts = self.accounts.lock().await;
        let stored = accounts
            .entry(user_id.to_string())
            .or_insert_with(|| account.clone());
        Ok(stored.clone())
    }

    async fn list(&self) -> Result<Vec<(String, CreditAccount)>> {
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .map(|(id, account)| (id.clone(), account.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_insert_if_absent_only_once() -> Result<()> {
        let repo = MemoryRepository::new();
        assert!(repo.is_empty().await);

        let first = repo
            .insert_if_absent("alice", &CreditAccount::opening(50, Utc::now()))
            .await?;
        let second = repo
            .insert_if_absent("alice", &CreditAccount::opening(1, Utc::now()))
            .await?;

        assert_eq!(first, second);
        assert_eq!(repo.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_seeded_list_is_sorted() -> Result<()> {
        let repo = MemoryRepository::with_accounts([
            ("carol".to_string(), CreditAccount::opening(3, Utc::now())),
            ("alice".to_string(), CreditAccount::opening(1, Utc::now())),
        ]);

        let ids: Vec<String> = repo.list().await?.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["alice", "carol"]);
        assert_eq!(repo.fetch("carol").await?.unwrap().credits, 3);
        Ok(())
    }
}
