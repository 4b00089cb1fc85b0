// Application layer: the credit ledger and its error/config types.
// Clients (the CLI, an HTTP handler, tests) talk to `CreditLedger` only.

pub mod config;
pub mod error;
pub mod service;

pub use config::*;
pub use error::*;
pub use service::*;
