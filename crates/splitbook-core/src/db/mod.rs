//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Account CRUD and IBAN resolution
//! - `transactions` - Transactions with their balanced split pairs
//! - `sessions` - Import sessions and their cached rows
//! - `categories` - Categories projected into the export
//! - `recurrences` - Recurring transaction templates

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod accounts;
mod categories;
mod recurrences;
mod sessions;
mod transactions;

pub use transactions::{ExistingTransaction, NewSplitTransaction};

/// Parse a stored ISO date column
pub(crate) fn parse_date(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool at the given path
    pub fn new(path: &str) -> Result<Self> {
        // foreign_keys is per connection, so it goes through with_init
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/splitbook_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the confirmation writer
            PRAGMA journal_mode = WAL;

            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Accounts (personal, foreign counterparties, system)
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                iban TEXT,
                account_type TEXT NOT NULL DEFAULT 'personal',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, account_type)
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_iban ON accounts(iban);
            CREATE INDEX IF NOT EXISTS idx_accounts_type ON accounts(account_type);

            -- Categories (projected into the export)
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Recurring transaction templates
            CREATE TABLE IF NOT EXISTS recurrences (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                disabled BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_recurrences_disabled ON recurrences(disabled);

            -- Transaction headers; the movement itself lives in splits
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                date DATE NOT NULL,
                amount REAL NOT NULL,
                recurrence_id INTEGER REFERENCES recurrences(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_kind ON transactions(kind);

            -- Splits: exactly two per transaction, summing to zero
            CREATE TABLE IF NOT EXISTS splits (
                id INTEGER PRIMARY KEY,
                transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                opposing_account_id INTEGER NOT NULL REFERENCES accounts(id),
                title TEXT NOT NULL,
                amount REAL NOT NULL,
                date DATE NOT NULL,
                category_id INTEGER REFERENCES categories(id)
            );

            CREATE INDEX IF NOT EXISTS idx_splits_transaction ON splits(transaction_id);
            CREATE INDEX IF NOT EXISTS idx_splits_account_date ON splits(account_id, date);

            -- Import sessions: one uploaded statement under review
            CREATE TABLE IF NOT EXISTS import_sessions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                importer TEXT NOT NULL,
                filename TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_import_sessions_account ON import_sessions(account_id);

            -- Cached parse of a session, annotated during review.
            -- Confirmation reads these rows back instead of re-parsing the file.
            CREATE TABLE IF NOT EXISTS import_rows (
                session_id INTEGER NOT NULL REFERENCES import_sessions(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                book_date DATE NOT NULL,
                transaction_date DATE NOT NULL,
                amount REAL NOT NULL,
                title TEXT NOT NULL,
                iban TEXT,
                matched_account_id INTEGER REFERENCES accounts(id),
                suggested_ignore BOOLEAN NOT NULL DEFAULT 0,
                PRIMARY KEY (session_id, position)
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
