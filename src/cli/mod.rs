use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::{CreditLedger, LedgerConfig};
use crate::domain::{Credits, INITIAL_CREDITS, format_credits, format_delta, parse_credits};
use crate::storage::Repository;

/// Credits - per-user credit ledger
#[derive(Parser)]
#[command(name = "credits")]
#[command(about = "Per-user credit balances with a transaction log")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CREDITS_DATABASE", default_value = "credits.db")]
    pub database: String,

    /// Balance granted to an account on first read
    #[arg(long, env = "CREDITS_INITIAL", default_value_t = INITIAL_CREDITS)]
    pub initial_credits: Credits,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Show a user's balance, opening the account if it does not exist
    Balance {
        /// User id
        user: String,
    },

    /// Add (or, with a negative amount, subtract) credits without a balance check
    Add {
        /// User id
        user: String,

        /// Signed amount (e.g. "10", "+10", "-5")
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// What the credits are for
        #[arg(short, long, default_value = "manual adjustment")]
        concept: String,
    },

    /// Take credits from an existing account if the balance covers it
    Deduct {
        /// User id
        user: String,

        /// Amount to take (positive)
        amount: String,

        /// What the credits are spent on
        #[arg(short, long, default_value = "manual deduction")]
        concept: String,
    },

    /// Show a user's transactions, newest first
    History {
        /// User id
        user: String,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: table, csv, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List every account and its balance
    Accounts,

    /// Verify every transaction log adds up to its balance
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: balances, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    /// Install the global tracing subscriber. `RUST_LOG` takes precedence.
    pub fn init_tracing(&self) {
        let level = if self.verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("credit_ledger={level},warn")));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    fn config(&self) -> LedgerConfig {
        LedgerConfig::default().with_initial_credits(self.initial_credits)
    }

    async fn open(&self) -> Result<CreditLedger<Repository>> {
        CreditLedger::connect(&self.database, self.config())
            .await
            .with_context(|| format!("Cannot open {}. Run `credits init` first", self.database))
    }

    pub async fn run(self) -> Result<()> {
        let ledger = match self.command {
            Commands::Init => {
                CreditLedger::init(&self.database, self.config()).await?;
                println!("Database initialized: {}", self.database);
                return Ok(());
            }
            _ => self.open().await?,
        };

        match self.command {
            Commands::Init => {}

            Commands::Balance { user } => {
                let account = ledger.try_get_account(&user).await?;
                println!("{}: {} credits", user, format_credits(account.credits));
            }

            Commands::Add {
                user,
                amount,
                concept,
            } => {
                let amount = parse_credits(&amount)
                    .with_context(|| format!("Invalid amount '{}'. Use a whole number", amount))?;
                let account = ledger.try_update_account(&user, amount, &concept).await?;
                println!(
                    "{} {} ({}). New balance: {}",
                    user,
                    format_delta(amount),
                    concept,
                    format_credits(account.credits)
                );
            }

            Commands::Deduct {
                user,
                amount,
                concept,
            } => {
                let amount = parse_credits(&amount)
                    .with_context(|| format!("Invalid amount '{}'. Use a whole number", amount))?;
                let account = ledger.try_deduct_account(&user, amount, &concept).await?;
                println!(
                    "{} {} ({}). New balance: {}",
                    user,
                    format_delta(-amount),
                    concept,
                    format_credits(account.credits)
                );
            }

            Commands::History {
                user,
                limit,
                format,
            } => run_history_command(&ledger, &user, limit, &format).await?,

            Commands::Accounts => run_accounts_command(&ledger).await?,

            Commands::Check => run_check_command(&ledger).await?,

            Commands::Export {
                export_type,
                output,
            } => run_export_command(&ledger, &export_type, output.as_deref()).await?,
        }

        Ok(())
    }
}

async fn run_history_command(
    ledger: &CreditLedger<Repository>,
    user: &str,
    limit: Option<usize>,
    format: &str,
) -> Result<()> {
    use crate::io::Exporter;
    use std::io::stdout;

    match format {
        "table" => {}
        "csv" => {
            Exporter::new(ledger)
                .export_history_csv(user, limit, stdout())
                .await?;
            return Ok(());
        }
        "json" => {
            Exporter::new(ledger)
                .export_history_json(user, limit, stdout())
                .await?;
            return Ok(());
        }
        _ => anyhow::bail!("Invalid format '{}'. Valid formats: table, csv, json", format),
    }

    let transactions = ledger.history(user, limit).await?;
    if transactions.is_empty() {
        println!("No transactions found for {}.", user);
        return Ok(());
    }

    println!(
        "{:<20} {:>10} {:>10}  CONCEPT",
        "DATE", "AMOUNT", "BALANCE"
    );
    println!("{}", "-".repeat(70));
    for tx in &transactions {
        println!(
            "{:<20} {:>10} {:>10}  {}",
            tx.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_delta(tx.amount),
            format_credits(tx.balance_after),
            truncate(&tx.concept, 30)
        );
    }
    Ok(())
}

async fn run_accounts_command(ledger: &CreditLedger<Repository>) -> Result<()> {
    let accounts = ledger.list_accounts().await?;
    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!("{:<30} {:>12} {:>6}  LAST UPDATED", "USER", "CREDITS", "TXS");
    println!("{}", "-".repeat(70));
    for (user_id, account) in &accounts {
        println!(
            "{:<30} {:>12} {:>6}  {}",
            truncate(user_id, 30),
            format_credits(account.credits),
            account.transactions.len(),
            account
                .last_updated
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        );
    }
    Ok(())
}

async fn run_check_command(ledger: &CreditLedger<Repository>) -> Result<()> {
    println!("Checking credit accounts...\n");

    let accounts = ledger.list_accounts().await?;
    let inconsistent = ledger.inconsistent_accounts().await?;

    println!("Accounts: {}", accounts.len());
    println!(
        "Transactions: {}",
        accounts
            .iter()
            .map(|(_, account)| account.transactions.len())
            .sum::<usize>()
    );
    println!();

    if inconsistent.is_empty() {
        println!("All transaction logs match their balances.");
    } else {
        println!("Issues found:");
        for user_id in &inconsistent {
            println!("  - {}: transaction log does not add up to balance", user_id);
        }
        anyhow::bail!("Credit ledger check failed");
    }

    Ok(())
}

async fn run_export_command(
    ledger: &CreditLedger<Repository>,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(ledger);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "balances" => {
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} accounts", snapshot.accounts.len());
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: balances, full",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_negative_amount() {
        let cli = Cli::try_parse_from(["credits", "add", "alice", "-5", "-c", "refund"]).unwrap();
        match cli.command {
            Commands::Add {
                user,
                amount,
                concept,
            } => {
                assert_eq!(user, "alice");
                assert_eq!(amount, "-5");
                assert_eq!(concept, "refund");
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_default_options() {
        let cli = Cli::try_parse_from(["credits", "balance", "alice"]).unwrap();
        assert_eq!(cli.initial_credits, 50);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long concept label", 10), "a long ...");
        assert_eq!(truncate("créditos añadidos", 8), "crédi...");
    }
}
