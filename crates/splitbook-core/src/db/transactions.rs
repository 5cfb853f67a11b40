//! Transaction operations
//!
//! Every transaction is written together with its two splits in one
//! database transaction. A header without both legs never becomes
//! visible to readers.

use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::{Split, Transaction, TransactionKind};

/// A transaction to be created, expressed from the imported account's side
#[derive(Debug, Clone)]
pub struct NewSplitTransaction {
    pub title: String,
    pub kind: TransactionKind,
    /// The personal account the statement belongs to
    pub account_id: i64,
    pub opposing_account_id: i64,
    /// Signed as seen from `account_id`; negative = outflow
    pub amount: f64,
    /// Date the bank booked the movement on `account_id`
    pub book_date: NaiveDate,
    pub transaction_date: NaiveDate,
    pub recurrence_id: Option<i64>,
}

/// An existing transaction with its legs resolved, as needed for
/// duplicate fingerprinting
#[derive(Debug, Clone)]
pub struct ExistingTransaction {
    pub id: i64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    /// Positive magnitude from the header
    pub amount: f64,
    /// Account of the negative split
    pub src_account_id: i64,
    /// Account of the positive split
    pub dst_account_id: i64,
}

impl Database {
    /// Create a transaction and its two balancing splits atomically
    ///
    /// The split on the imported account carries the signed row amount at
    /// the book date; the opposing split negates it at the transaction
    /// date. The header stores the positive magnitude.
    pub fn create_transaction_with_splits(&self, new: &NewSplitTransaction) -> Result<i64> {
        let conn = self.conn()?;

        // Use explicit transaction for atomicity
        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            conn.execute(
                "INSERT INTO transactions (title, kind, date, amount, recurrence_id)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    new.title,
                    new.kind.as_str(),
                    new.transaction_date.to_string(),
                    new.amount.abs(),
                    new.recurrence_id
                ],
            )?;
            let transaction_id = conn.last_insert_rowid();

            conn.execute(
                "INSERT INTO splits (transaction_id, account_id, opposing_account_id, title, amount, date)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    transaction_id,
                    new.account_id,
                    new.opposing_account_id,
                    new.title,
                    new.amount,
                    new.book_date.to_string()
                ],
            )?;
            conn.execute(
                "INSERT INTO splits (transaction_id, account_id, opposing_account_id, title, amount, date)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    transaction_id,
                    new.opposing_account_id,
                    new.account_id,
                    new.title,
                    -new.amount,
                    new.transaction_date.to_string()
                ],
            )?;

            Ok(transaction_id)
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

    /// Get a transaction header by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let transaction = conn
            .query_row(
                "SELECT id, title, kind, date, amount, recurrence_id
                 FROM transactions WHERE id = ?",
                params![id],
                |row| {
                    let kind_str: String = row.get(2)?;
                    let date_str: String = row.get(3)?;
                    Ok(Transaction {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        kind: kind_str.parse().unwrap_or(TransactionKind::Withdraw),
                        date: super::parse_date(&date_str),
                        amount: row.get(4)?,
                        recurrence_id: row.get(5)?,
                    })
                },
            )
            .ok();

        Ok(transaction)
    }

    /// List the splits of a transaction
    pub fn list_splits(&self, transaction_id: i64) -> Result<Vec<Split>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, transaction_id, account_id, opposing_account_id, title, amount, date, category_id
             FROM splits WHERE transaction_id = ? ORDER BY id",
        )?;

        let splits = stmt
            .query_map(params![transaction_id], |row| {
                let date_str: String = row.get(6)?;
                Ok(Split {
                    id: row.get(0)?,
                    transaction_id: row.get(1)?,
                    account_id: row.get(2)?,
                    opposing_account_id: row.get(3)?,
                    title: row.get(4)?,
                    amount: row.get(5)?,
                    date: super::parse_date(&date_str),
                    category_id: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(splits)
    }

    /// Existing transactions in a date range with their legs resolved
    ///
    /// Used to seed the duplicate fingerprint set for an import batch.
    /// The source leg is the negative split, the destination leg the
    /// positive one.
    pub fn transactions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExistingTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.kind, t.date, t.amount,
                    (SELECT account_id FROM splits WHERE transaction_id = t.id AND amount < 0),
                    (SELECT account_id FROM splits WHERE transaction_id = t.id AND amount >= 0)
             FROM transactions t
             WHERE t.date >= ? AND t.date <= ?",
        )?;

        let transactions = stmt
            .query_map(params![start.to_string(), end.to_string()], |row| {
                let kind_str: String = row.get(1)?;
                let date_str: String = row.get(2)?;
                Ok(ExistingTransaction {
                    id: row.get(0)?,
                    kind: kind_str.parse().unwrap_or(TransactionKind::Withdraw),
                    date: super::parse_date(&date_str),
                    amount: row.get(3)?,
                    src_account_id: row.get(4)?,
                    dst_account_id: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }
}
