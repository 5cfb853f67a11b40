//! Splitbook Core Library
//!
//! Shared functionality for the splitbook bookkeeping tool:
//! - Database access and migrations (accounts, transactions, splits,
//!   categories, recurrences, import sessions)
//! - Bank statement CSV importers behind a keyed registry
//! - Duplicate detection against existing ledger entries
//! - Double-entry transaction construction at confirmation time
//! - Ledger CSV export

pub mod builder;
pub mod db;
pub mod dedup;
pub mod error;
pub mod export;
pub mod import;
pub mod models;

pub use builder::{confirm_rows, ConfirmSummary};
pub use db::Database;
pub use error::{Error, Result};
pub use export::ExportOptions;
pub use import::{ImporterKind, TransactionImporter};
