//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        let accounts = db.list_accounts().unwrap();
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_on_disk_db_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splitbook.db").display().to_string();

        let db = Database::new(&path).unwrap();
        db.create_account("Checking", None, AccountType::Personal)
            .unwrap();
        drop(db);

        let reopened = Database::new(&path).unwrap();
        let accounts = reopened.list_accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Checking");
    }

    #[test]
    fn test_account_crud() {
        let db = Database::in_memory().unwrap();

        let id = db
            .create_account("Checking", Some("DE02120300000000202051"), AccountType::Personal)
            .unwrap();
        assert!(id > 0);

        let accounts = db.list_accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Checking");
        assert_eq!(accounts[0].account_type, AccountType::Personal);

        let fetched = db.get_account(id).unwrap().unwrap();
        assert_eq!(fetched.iban.as_deref(), Some("DE02120300000000202051"));
        assert!(db.get_account(9999).unwrap().is_none());
    }

    #[test]
    fn test_iban_account_map() {
        let db = Database::in_memory().unwrap();
        let a = db
            .create_account("Checking", Some("DE02120300000000202051"), AccountType::Personal)
            .unwrap();
        db.create_account("Cash", None, AccountType::Personal).unwrap();
        db.create_account("Empty IBAN", Some(""), AccountType::Foreign)
            .unwrap();

        let map = db.iban_account_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("DE02120300000000202051"), Some(&a));
    }

    #[test]
    fn test_resolve_opposing_prefers_personal() {
        let db = Database::in_memory().unwrap();
        let personal = db
            .create_account("Shared Name", None, AccountType::Personal)
            .unwrap();
        db.create_account("Shared Name", None, AccountType::Foreign)
            .unwrap();

        let resolved = db.resolve_opposing_account("Shared Name", None).unwrap();
        assert_eq!(resolved.id, personal);
        assert_eq!(resolved.account_type, AccountType::Personal);
    }

    #[test]
    fn test_resolve_opposing_backfills_iban_on_personal_account() {
        let db = Database::in_memory().unwrap();
        let savings = db
            .create_account("Savings", None, AccountType::Personal)
            .unwrap();

        let resolved = db
            .resolve_opposing_account("Savings", Some("DE02120300000000202051"))
            .unwrap();
        assert_eq!(resolved.id, savings);
        assert_eq!(resolved.iban.as_deref(), Some("DE02120300000000202051"));

        // The update is persisted, so the next import matches by IBAN
        let stored = db.get_account(savings).unwrap().unwrap();
        assert_eq!(stored.iban.as_deref(), Some("DE02120300000000202051"));
    }

    #[test]
    fn test_resolve_opposing_does_not_overwrite_iban() {
        let db = Database::in_memory().unwrap();
        db.create_account("REWE", Some("DE89370400440532013000"), AccountType::Foreign)
            .unwrap();

        let resolved = db
            .resolve_opposing_account("REWE", Some("DE00000000000000000000"))
            .unwrap();
        assert_eq!(resolved.iban.as_deref(), Some("DE89370400440532013000"));
    }

    #[test]
    fn test_transaction_write_is_atomic_pair() {
        let db = Database::in_memory().unwrap();
        let checking = db
            .create_account("Checking", None, AccountType::Personal)
            .unwrap();
        let rewe = db.create_account("REWE", None, AccountType::Foreign).unwrap();

        let tx_id = db
            .create_transaction_with_splits(&NewSplitTransaction {
                title: "Groceries".to_string(),
                kind: TransactionKind::Withdraw,
                account_id: checking,
                opposing_account_id: rewe,
                amount: -54.30,
                book_date: date(5),
                transaction_date: date(4),
                recurrence_id: None,
            })
            .unwrap();

        let splits = db.list_splits(tx_id).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].amount + splits[1].amount, 0.0);
        // Book date on the imported account's leg, transaction date opposite
        assert_eq!(splits[0].date, date(5));
        assert_eq!(splits[1].date, date(4));
        assert_eq!(splits[0].title, splits[1].title);
    }

    #[test]
    fn test_failed_split_insert_leaves_no_header() {
        let db = Database::in_memory().unwrap();
        let checking = db
            .create_account("Checking", None, AccountType::Personal)
            .unwrap();

        // Nonexistent opposing account violates the foreign key on splits
        let result = db.create_transaction_with_splits(&NewSplitTransaction {
            title: "Broken".to_string(),
            kind: TransactionKind::Withdraw,
            account_id: checking,
            opposing_account_id: 9999,
            amount: -10.0,
            book_date: date(5),
            transaction_date: date(5),
            recurrence_id: None,
        });

        assert!(result.is_err());
        assert!(db.transactions_in_range(date(1), date(31)).unwrap().is_empty());
    }

    #[test]
    fn test_transactions_in_range_resolves_legs() {
        let db = Database::in_memory().unwrap();
        let checking = db
            .create_account("Checking", None, AccountType::Personal)
            .unwrap();
        let rewe = db.create_account("REWE", None, AccountType::Foreign).unwrap();

        db.create_transaction_with_splits(&NewSplitTransaction {
            title: "Groceries".to_string(),
            kind: TransactionKind::Withdraw,
            account_id: checking,
            opposing_account_id: rewe,
            amount: -54.30,
            book_date: date(5),
            transaction_date: date(5),
            recurrence_id: None,
        })
        .unwrap();

        let existing = db.transactions_in_range(date(1), date(31)).unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].kind, TransactionKind::Withdraw);
        assert_eq!(existing[0].amount, 54.30);
        assert_eq!(existing[0].src_account_id, checking);
        assert_eq!(existing[0].dst_account_id, rewe);

        assert!(db.transactions_in_range(date(6), date(31)).unwrap().is_empty());
    }

    #[test]
    fn test_import_session_round_trip() {
        let db = Database::in_memory().unwrap();
        let checking = db
            .create_account("Checking", None, AccountType::Personal)
            .unwrap();

        let rows = vec![
            ImportRow {
                session_id: 0,
                position: 0,
                book_date: date(5),
                transaction_date: date(4),
                amount: -54.30,
                title: "REWE SAGT DANKE".to_string(),
                iban: Some("DE89370400440532013000".to_string()),
                matched_account_id: None,
                suggested_ignore: true,
            },
            ImportRow {
                session_id: 0,
                position: 1,
                book_date: date(6),
                transaction_date: date(6),
                amount: 2500.0,
                title: "GEHALT".to_string(),
                iban: None,
                matched_account_id: Some(checking),
                suggested_ignore: false,
            },
        ];

        let session_id = db
            .create_import_session(checking, "dkb", Some("statement.csv"), &rows)
            .unwrap();

        let session = db.get_import_session(session_id).unwrap().unwrap();
        assert_eq!(session.account_id, checking);
        assert_eq!(session.importer, "dkb");
        assert_eq!(session.filename.as_deref(), Some("statement.csv"));

        let stored = db.list_session_rows(session_id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].position, 0);
        assert_eq!(stored[0].title, "REWE SAGT DANKE");
        assert!(stored[0].suggested_ignore);
        assert_eq!(stored[1].matched_account_id, Some(checking));
        assert_eq!(stored[1].amount, 2500.0);

        assert!(db.get_import_session(9999).unwrap().is_none());
    }

    #[test]
    fn test_recurrences() {
        let db = Database::in_memory().unwrap();
        let rent = db.create_recurrence("Rent").unwrap();
        let gym = db.create_recurrence("Gym").unwrap();
        db.disable_recurrence(gym).unwrap();

        let active = db.list_active_recurrences().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, rent);
    }

    #[test]
    fn test_categories() {
        let db = Database::in_memory().unwrap();
        db.create_category("Groceries").unwrap();
        db.create_category("Rent").unwrap();

        let categories = db.list_categories().unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Groceries");
    }
}
