mod memory;
mod repository;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::CreditAccount;

pub use memory::*;
pub use repository::*;

/// Logical collection holding one credit document per user id.
pub const COLLECTION: &str = "userCredits";

/// SQL migration for the user_credits table
pub const MIGRATION_001_USER_CREDITS: &str = include_str!("migrations/001_user_credits.sql");

/// Document-store client the ledger is constructed with.
///
/// Every method is a single round trip. Nothing here locks across calls, so a
/// read followed by a `put` is not atomic.
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Read the account stored for `user_id`.
    async fn fetch(&self, user_id: &str) -> Result<Option<CreditAccount>>;

    /// Overwrite the whole record for `user_id`, creating it if needed.
    async fn put(&self, user_id: &str, account: &CreditAccount) -> Result<()>;

    /// Store `account` only if `user_id` has no record yet.
    /// Returns the record that is stored afterwards.
    async fn insert_if_absent(
        &self,
        user_id: &str,
        account: &CreditAccount,
    ) -> Result<CreditAccount>;

    /// All stored accounts, ordered by user id.
    async fn list(&self) -> Result<Vec<(String, CreditAccount)>>;
}
