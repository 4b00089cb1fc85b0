pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod storage;

pub use application::{CreditLedger, LedgerConfig, LedgerError};
pub use domain::*;
pub use storage::{CreditStore, MemoryRepository, Repository};
