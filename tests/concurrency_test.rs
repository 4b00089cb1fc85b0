mod common;

use anyhow::Result;
use common::YieldingStore;
use credit_ledger::application::CreditLedger;
use credit_ledger::storage::{CreditStore, MemoryRepository};

fn interleaving_ledger() -> CreditLedger<YieldingStore<MemoryRepository>> {
    CreditLedger::new(YieldingStore::new(MemoryRepository::new()))
}

#[tokio::test]
async fn test_concurrent_updates_lose_one_delta() -> Result<()> {
    let ledger = interleaving_ledger();
    ledger.get_account("alice").await;

    // Both updates read 50 before either writes; the later overwrite wins
    let (first, second) = futures::join!(
        ledger.update_account("alice", 10, "bonus"),
        ledger.update_account("alice", 5, "referral"),
    );
    assert!(first);
    assert!(second);

    let account = ledger.store().fetch("alice").await?.unwrap();
    assert_ne!(account.credits, 65);
    assert!(account.credits == 55 || account.credits == 60);
    assert_eq!(account.transactions.len(), 1);
    // The surviving record is still internally consistent
    assert!(account.is_consistent());
    Ok(())
}

#[tokio::test]
async fn test_sequential_updates_are_not_lost() -> Result<()> {
    let ledger = interleaving_ledger();
    ledger.get_account("alice").await;

    assert!(ledger.update_account("alice", 10, "bonus").await);
    assert!(ledger.update_account("alice", 5, "referral").await);

    let account = ledger.store().fetch("alice").await?.unwrap();
    assert_eq!(account.credits, 65);
    assert_eq!(account.transactions.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_first_reads_create_one_account() -> Result<()> {
    let ledger = interleaving_ledger();

    let (first, second) = futures::join!(ledger.get_account("alice"), ledger.get_account("alice"));

    assert_eq!(first, second);
    assert_eq!(first.credits, 50);
    assert_eq!(ledger.store().list().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_updates_on_different_users() -> Result<()> {
    let ledger = interleaving_ledger();
    ledger.get_account("alice").await;
    ledger.get_account("bob").await;

    let (a, b) = futures::join!(
        ledger.update_account("alice", 10, "bonus"),
        ledger.update_account("bob", -5, "fee"),
    );
    assert!(a && b);

    assert_eq!(ledger.get_account("alice").await.credits, 60);
    assert_eq!(ledger.get_account("bob").await.credits, 45);
    Ok(())
}
