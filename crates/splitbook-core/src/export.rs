//! CSV export of ledger splits
//!
//! One row per qualifying split, semicolon-delimited. Transfers appear
//! once: the positive leg is dropped so a transfer shows up only as the
//! outflow from its source account. Re-importing an export therefore
//! needs two-sided entry to reconstruct transfers, which is accepted.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;

pub const EXPORT_HEADER: &str = "account;opposing_account;date;amount;category";

/// Filters for a split export
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Start date filter (inclusive)
    pub start: Option<NaiveDate>,
    /// End date filter (inclusive)
    pub end: Option<NaiveDate>,
    /// Restrict to splits on these accounts
    pub account_ids: Option<Vec<i64>>,
}

/// One export row with names resolved
#[derive(Debug, Clone, Serialize)]
pub struct ExportSplit {
    pub account: String,
    pub opposing_account: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub category: Option<String>,
}

impl Database {
    /// Splits qualifying for export, transfers collapsed to one leg
    pub fn export_splits(&self, opts: &ExportOptions) -> Result<Vec<ExportSplit>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            r#"
            SELECT a.name, o.name, s.date, s.amount, c.name
            FROM splits s
            JOIN transactions t ON t.id = s.transaction_id
            JOIN accounts a ON a.id = s.account_id
            JOIN accounts o ON o.id = s.opposing_account_id
            LEFT JOIN categories c ON c.id = s.category_id
            WHERE NOT (t.kind = 'transfer' AND s.amount > 0)
            "#,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(start) = &opts.start {
            sql.push_str(&format!(" AND s.date >= ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(start.to_string()));
        }

        if let Some(end) = &opts.end {
            sql.push_str(&format!(" AND s.date <= ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(end.to_string()));
        }

        if let Some(account_ids) = &opts.account_ids {
            if !account_ids.is_empty() {
                let placeholders: Vec<String> = (0..account_ids.len())
                    .map(|i| format!("?{}", params_vec.len() + i + 1))
                    .collect();
                sql.push_str(&format!(
                    " AND s.account_id IN ({})",
                    placeholders.join(",")
                ));
                for id in account_ids {
                    params_vec.push(Box::new(*id));
                }
            }
        }

        sql.push_str(" ORDER BY s.date, s.id");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let splits = stmt
            .query_map(params_refs.as_slice(), |row| {
                let date_str: String = row.get(2)?;
                Ok(ExportSplit {
                    account: row.get(0)?,
                    opposing_account: row.get(1)?,
                    date: crate::db::parse_date(&date_str),
                    amount: row.get(3)?,
                    category: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(splits)
    }

    /// Export qualifying splits as semicolon-delimited CSV
    pub fn export_splits_csv(&self, opts: &ExportOptions) -> Result<String> {
        let splits = self.export_splits(opts)?;

        let mut csv = String::from(EXPORT_HEADER);
        csv.push('\n');

        for split in splits {
            csv.push_str(&format!(
                "{};{};{};{:.2};{}\n",
                escape_csv_field(&split.account),
                escape_csv_field(&split.opposing_account),
                split.date,
                split.amount,
                escape_csv_field(split.category.as_deref().unwrap_or(""))
            ));
        }

        Ok(csv)
    }

}

/// Escape a field for semicolon-delimited output
fn escape_csv_field(field: &str) -> String {
    if field.contains(';') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewSplitTransaction;
    use crate::models::{AccountType, TransactionKind};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn seeded_db() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let checking = db
            .create_account("Checking", None, AccountType::Personal)
            .unwrap();
        let rewe = db.create_account("REWE", None, AccountType::Foreign).unwrap();
        (db, checking, rewe)
    }

    fn withdraw(db: &Database, checking: i64, rewe: i64, d: u32, amount: f64) -> i64 {
        db.create_transaction_with_splits(&NewSplitTransaction {
            title: "Groceries".to_string(),
            kind: TransactionKind::Withdraw,
            account_id: checking,
            opposing_account_id: rewe,
            amount,
            book_date: date(d),
            transaction_date: date(d),
            recurrence_id: None,
        })
        .unwrap()
    }

    #[test]
    fn test_escape_csv_field() {
        assert_eq!(escape_csv_field("simple"), "simple");
        assert_eq!(escape_csv_field("with;semicolon"), "\"with;semicolon\"");
        assert_eq!(escape_csv_field("with\"quote"), "\"with\"\"quote\"");
        // Commas are fine in a semicolon-delimited file
        assert_eq!(escape_csv_field("with,comma"), "with,comma");
    }

    #[test]
    fn test_export_header_and_rows() {
        let (db, checking, rewe) = seeded_db();
        withdraw(&db, checking, rewe, 5, -54.30);

        let csv = db.export_splits_csv(&ExportOptions::default()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(EXPORT_HEADER));
        assert_eq!(lines.next(), Some("Checking;REWE;2024-03-05;-54.30;"));
        assert_eq!(lines.next(), Some("REWE;Checking;2024-03-05;54.30;"));
    }

    #[test]
    fn test_transfers_exported_once() {
        let (db, checking, _) = seeded_db();
        let savings = db
            .create_account("Savings", None, AccountType::Personal)
            .unwrap();
        db.create_transaction_with_splits(&NewSplitTransaction {
            title: "Monthly savings".to_string(),
            kind: TransactionKind::Transfer,
            account_id: checking,
            opposing_account_id: savings,
            amount: -200.0,
            book_date: date(10),
            transaction_date: date(10),
            recurrence_id: None,
        })
        .unwrap();

        let splits = db.export_splits(&ExportOptions::default()).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].account, "Checking");
        assert_eq!(splits[0].amount, -200.0);
    }

    #[test]
    fn test_date_range_filter() {
        let (db, checking, rewe) = seeded_db();
        withdraw(&db, checking, rewe, 1, -10.0);
        withdraw(&db, checking, rewe, 15, -20.0);
        withdraw(&db, checking, rewe, 28, -30.0);

        let splits = db
            .export_splits(&ExportOptions {
                start: Some(date(10)),
                end: Some(date(20)),
                account_ids: None,
            })
            .unwrap();
        assert_eq!(splits.len(), 2); // both legs of the day-15 withdraw
        assert!(splits.iter().all(|s| s.date == date(15)));
    }

    #[test]
    fn test_account_filter() {
        let (db, checking, rewe) = seeded_db();
        withdraw(&db, checking, rewe, 5, -54.30);

        let splits = db
            .export_splits(&ExportOptions {
                start: None,
                end: None,
                account_ids: Some(vec![checking]),
            })
            .unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].account, "Checking");
    }

    #[test]
    fn test_category_column() {
        let (db, checking, rewe) = seeded_db();
        let tx = withdraw(&db, checking, rewe, 5, -54.30);
        let groceries = db.create_category("Groceries").unwrap();
        db.set_transaction_category(tx, groceries).unwrap();

        let csv = db
            .export_splits_csv(&ExportOptions {
                account_ids: Some(vec![checking]),
                ..Default::default()
            })
            .unwrap();
        assert!(csv.contains("Checking;REWE;2024-03-05;-54.30;Groceries"));
    }

    #[test]
    fn test_export_reimports_through_ledger_dialect() {
        use crate::import::{ImporterKind, TransactionImporter};

        let (db, checking, rewe) = seeded_db();
        withdraw(&db, checking, rewe, 5, -54.30);

        let csv = db
            .export_splits_csv(&ExportOptions {
                account_ids: Some(vec![checking]),
                ..Default::default()
            })
            .unwrap();

        let records = ImporterKind::Ledger
            .importer()
            .import_transactions(csv.as_bytes())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "REWE");
        assert_eq!(records[0].amount, -54.30);
        assert_eq!(records[0].book_date, date(5));
    }
}
