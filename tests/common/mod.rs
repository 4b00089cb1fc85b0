// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use credit_ledger::application::{CreditLedger, LedgerConfig};
use credit_ledger::domain::CreditAccount;
use credit_ledger::storage::{CreditStore, Repository};
use tempfile::TempDir;

/// Helper to create a test ledger with a temporary SQLite database
pub async fn test_ledger() -> Result<(CreditLedger<Repository>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let ledger = CreditLedger::init(db_path.to_str().unwrap(), LedgerConfig::default()).await?;
    Ok((ledger, temp_dir))
}

/// Store wrapper whose reads and writes can be switched to fail,
/// counting every call that reaches it.
pub struct FlakyStore<S> {
    inner: S,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl<S: CreditStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated read failure");
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        Ok(())
    }
}

#[async_trait]
impl<S: CreditStore> CreditStore for FlakyStore<S> {
    async fn fetch(&self, user_id: &str) -> Result<Option<CreditAccount>> {
        self.read()?;
        self.inner.fetch(user_id).await
    }

    async fn put(&self, user_id: &str, account: &CreditAccount) -> Result<()> {
        self.write()?;
        self.inner.put(user_id, account).await
    }

    async fn insert_if_absent(
        &self,
        user_id: &str,
        account: &CreditAccount,
    ) -> Result<CreditAccount> {
        self.write()?;
        self.inner.insert_if_absent(user_id, account).await
    }

    async fn list(&self) -> Result<Vec<(String, CreditAccount)>> {
        self.read()?;
        self.inner.list().await
    }
}

/// Store wrapper that suspends after every read, so concurrent callers
/// interleave their read-modify-write sequences.
pub struct YieldingStore<S> {
    inner: S,
}

impl<S: CreditStore> YieldingStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: CreditStore> CreditStore for YieldingStore<S> {
    async fn fetch(&self, user_id: &str) -> Result<Option<CreditAccount>> {
        let snapshot = self.inner.fetch(user_id).await?;
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn put(&self, user_id: &str, account: &CreditAccount) -> Result<()> {
        self.inner.put(user_id, account).await
    }

    async fn insert_if_absent(
        &self,
        user_id: &str,
        account: &CreditAccount,
    ) -> Result<CreditAccount> {
        self.inner.insert_if_absent(user_id, account).await
    }

    async fn list(&self) -> Result<Vec<(String, CreditAccount)>> {
        self.inner.list().await
    }
}
