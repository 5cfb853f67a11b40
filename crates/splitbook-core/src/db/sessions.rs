//! Import session operations
//!
//! A session caches the parsed statement so confirmation works from the
//! stored rows instead of re-parsing the uploaded file. Row positions
//! are the contract between review and confirmation.

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::{ImportRow, ImportSession};

impl Database {
    /// Store a session together with its annotated rows atomically
    pub fn create_import_session(
        &self,
        account_id: i64,
        importer: &str,
        filename: Option<&str>,
        rows: &[ImportRow],
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            conn.execute(
                "INSERT INTO import_sessions (account_id, importer, filename) VALUES (?, ?, ?)",
                params![account_id, importer, filename],
            )?;
            let session_id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(
                "INSERT INTO import_rows
                 (session_id, position, book_date, transaction_date, amount, title, iban,
                  matched_account_id, suggested_ignore)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (position, row) in rows.iter().enumerate() {
                stmt.execute(params![
                    session_id,
                    position as i64,
                    row.book_date.to_string(),
                    row.transaction_date.to_string(),
                    row.amount,
                    row.title,
                    row.iban,
                    row.matched_account_id,
                    row.suggested_ignore
                ])?;
            }

            Ok(session_id)
        })();

        match result {
            Ok(id) => {
                conn.execute("COMMIT", [])?;
                Ok(id)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Get an import session by ID
    pub fn get_import_session(&self, id: i64) -> Result<Option<ImportSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, account_id, importer, filename FROM import_sessions WHERE id = ?",
                params![id],
                |row| {
                    Ok(ImportSession {
                        id: row.get(0)?,
                        account_id: row.get(1)?,
                        importer: row.get(2)?,
                        filename: row.get(3)?,
                    })
                },
            )
            .ok();

        Ok(session)
    }

    /// The cached rows of a session, in original parse order
    pub fn list_session_rows(&self, session_id: i64) -> Result<Vec<ImportRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, position, book_date, transaction_date, amount, title, iban,
                    matched_account_id, suggested_ignore
             FROM import_rows WHERE session_id = ? ORDER BY position",
        )?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                let book_date: String = row.get(2)?;
                let transaction_date: String = row.get(3)?;
                Ok(ImportRow {
                    session_id: row.get(0)?,
                    position: row.get(1)?,
                    book_date: super::parse_date(&book_date),
                    transaction_date: super::parse_date(&transaction_date),
                    amount: row.get(4)?,
                    title: row.get(5)?,
                    iban: row.get(6)?,
                    matched_account_id: row.get(7)?,
                    suggested_ignore: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
