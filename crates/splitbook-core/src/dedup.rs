//! Duplicate detection for import batches
//!
//! Existing transactions in the batch's date range are reduced to a set
//! of (account, date, cents) fingerprints. A transfer touches both of
//! its accounts, a deposit only its source, a withdraw only its
//! destination. An incoming row is keyed by the account its IBAN
//! matched, its book date, and its unsigned amount; a hit pre-checks
//! the row's ignore flag for review. The user has the final say.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::db::{Database, ExistingTransaction};
use crate::error::Result;
use crate::models::{ImportRecord, TransactionKind};

/// One fingerprint: account, date, unsigned amount in cents
pub type Fingerprint = (i64, NaiveDate, i64);

/// Quantize an amount to cents so fingerprints are hashable
fn cents(amount: f64) -> i64 {
    (amount.abs() * 100.0).round() as i64
}

/// Build the fingerprint set for a slice of existing transactions
pub fn fingerprint_set(existing: &[ExistingTransaction]) -> HashSet<Fingerprint> {
    let mut set = HashSet::new();

    for tx in existing {
        let amount = cents(tx.amount);
        match tx.kind {
            TransactionKind::Transfer => {
                set.insert((tx.src_account_id, tx.date, amount));
                set.insert((tx.dst_account_id, tx.date, amount));
            }
            TransactionKind::Deposit => {
                set.insert((tx.src_account_id, tx.date, amount));
            }
            TransactionKind::Withdraw => {
                set.insert((tx.dst_account_id, tx.date, amount));
            }
        }
    }

    set
}

/// Flag likely duplicates in a parsed batch
///
/// `matches` holds the account each row's IBAN resolved to, aligned with
/// `records`. Rows without a match are never flagged. Returns one flag
/// per record, in order.
pub fn detect_duplicates(
    db: &Database,
    records: &[ImportRecord],
    matches: &[Option<i64>],
) -> Result<Vec<bool>> {
    let Some(start) = records.iter().map(|r| r.book_date).min() else {
        return Ok(Vec::new());
    };
    let end = records.iter().map(|r| r.book_date).max().unwrap_or(start);

    let existing = db.transactions_in_range(start, end)?;
    let set = fingerprint_set(&existing);
    debug!(
        existing = existing.len(),
        fingerprints = set.len(),
        "Built duplicate fingerprint set"
    );

    let flags = records
        .iter()
        .zip(matches)
        .map(|(record, matched)| match matched {
            Some(account_id) => set.contains(&(*account_id, record.book_date, cents(record.amount))),
            None => false,
        })
        .collect();

    Ok(flags)
}
