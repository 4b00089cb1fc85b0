use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::CreditLedger;
use crate::domain::CreditAccount;
use crate::storage::{COLLECTION, CreditStore};

/// Every credit document, keyed by user id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub collection: String,
    pub accounts: BTreeMap<String, CreditAccount>,
}

/// Exporter for writing ledger data as CSV or JSON
pub struct Exporter<'a, S> {
    ledger: &'a CreditLedger<S>,
}

impl<'a, S: CreditStore> Exporter<'a, S> {
    pub fn new(ledger: &'a CreditLedger<S>) -> Self {
        Self { ledger }
    }

    /// Export one user's transactions, newest first, to CSV
    pub async fn export_history_csv<W: Write>(
        &self,
        user_id: &str,
        limit: Option<usize>,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.ledger.history(user_id, limit).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "date", "amount", "concept", "balance_after"])?;

        for tx in &transactions {
            csv_writer.write_record([
                tx.id.clone(),
                tx.date.to_rfc3339(),
                tx.amount.to_string(),
                tx.concept.clone(),
                tx.balance_after.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export one user's transactions as a JSON array
    pub async fn export_history_json<W: Write>(
        &self,
        user_id: &str,
        limit: Option<usize>,
        mut writer: W,
    ) -> Result<usize> {
        let transactions = self.ledger.history(user_id, limit).await?;

        let json = serde_json::to_string_pretty(&transactions)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(transactions.len())
    }

    /// Export every account's balance to CSV
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.ledger.list_accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["user_id", "credits", "transactions", "last_updated"])?;

        for (user_id, account) in &accounts {
            csv_writer.write_record([
                user_id.clone(),
                account.credits.to_string(),
                account.transactions.len().to_string(),
                account
                    .last_updated
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export the whole collection as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<CreditSnapshot> {
        let accounts = self.ledger.list_accounts().await?;

        let snapshot = CreditSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            collection: COLLECTION.to_string(),
            accounts: accounts.into_iter().collect(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}
