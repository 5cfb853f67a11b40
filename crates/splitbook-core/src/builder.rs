//! Confirmation pass: turn reviewed import rows into transactions
//!
//! Each confirmed row either becomes one transaction with its two
//! splits, or is skipped with a recorded reason. A skipped row never
//! aborts the batch; a database failure does.

use serde::Serialize;
use tracing::info;

use crate::db::{Database, NewSplitTransaction};
use crate::error::{Error, Result};
use crate::models::{
    AccountType, ConfirmRow, ImportRow, ImportSession, RowOutcome, SkipReason, TransactionKind,
};

/// What happened to each row of a confirmed session
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmSummary {
    pub created: usize,
    pub skipped: usize,
    pub outcomes: Vec<RowOutcome>,
}

/// Process one confirmation submission against a session's cached rows
///
/// `confirms` is aligned positionally with `rows`; a length mismatch is
/// rejected before any write happens. Rows are processed in order, each
/// write atomic on its own, so one bad row late in the batch does not
/// undo earlier transactions.
pub fn confirm_rows(
    db: &Database,
    session: &ImportSession,
    rows: &[ImportRow],
    confirms: &[ConfirmRow],
) -> Result<ConfirmSummary> {
    if rows.len() != confirms.len() {
        return Err(Error::InvalidData(format!(
            "Expected {} confirmation rows, got {}",
            rows.len(),
            confirms.len()
        )));
    }

    let mut outcomes = Vec::with_capacity(rows.len());
    let mut created = 0;

    for (row, confirm) in rows.iter().zip(confirms) {
        match confirm_row(db, session, row, confirm)? {
            RowOutcome::Created { transaction_id } => {
                created += 1;
                outcomes.push(RowOutcome::Created { transaction_id });
            }
            skipped => outcomes.push(skipped),
        }
    }

    let skipped = outcomes.len() - created;
    info!(
        session_id = session.id,
        created, skipped, "Import session confirmed"
    );

    Ok(ConfirmSummary {
        created,
        skipped,
        outcomes,
    })
}

fn confirm_row(
    db: &Database,
    session: &ImportSession,
    row: &ImportRow,
    confirm: &ConfirmRow,
) -> Result<RowOutcome> {
    if confirm.ignore {
        return Ok(RowOutcome::Skipped {
            reason: SkipReason::Ignored,
        });
    }

    let title = confirm.title.trim();
    if title.is_empty() {
        return Ok(RowOutcome::Skipped {
            reason: SkipReason::MissingTitle,
        });
    }

    let account_name = confirm.account.trim();
    if account_name.is_empty() {
        return Ok(RowOutcome::Skipped {
            reason: SkipReason::MissingAccount,
        });
    }

    if row.amount == 0.0 {
        return Ok(RowOutcome::Skipped {
            reason: SkipReason::ZeroAmount,
        });
    }

    let opposing = db.resolve_opposing_account(account_name, row.iban.as_deref())?;

    let kind = if opposing.account_type == AccountType::Personal {
        TransactionKind::Transfer
    } else if row.amount < 0.0 {
        TransactionKind::Withdraw
    } else {
        TransactionKind::Deposit
    };

    let recurrence_id = (confirm.recurrence > 0).then_some(confirm.recurrence);

    let transaction_id = db.create_transaction_with_splits(&NewSplitTransaction {
        title: title.to_string(),
        kind,
        account_id: session.account_id,
        opposing_account_id: opposing.id,
        amount: row.amount,
        book_date: row.book_date,
        transaction_date: row.transaction_date,
        recurrence_id,
    })?;

    Ok(RowOutcome::Created { transaction_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup() -> (Database, ImportSession) {
        let db = Database::in_memory().unwrap();
        let account_id = db
            .create_account("Checking", Some("DE02120300000000202051"), AccountType::Personal)
            .unwrap();
        let session = ImportSession {
            id: 1,
            account_id,
            importer: "dkb".to_string(),
            filename: None,
        };
        (db, session)
    }

    fn row(amount: f64) -> ImportRow {
        ImportRow {
            session_id: 1,
            position: 0,
            book_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            amount,
            title: "REWE SAGT DANKE".to_string(),
            iban: Some("DE89370400440532013000".to_string()),
            matched_account_id: None,
            suggested_ignore: false,
        }
    }

    fn confirm(title: &str, account: &str) -> ConfirmRow {
        ConfirmRow {
            title: title.to_string(),
            account: account.to_string(),
            recurrence: -1,
            ignore: false,
        }
    }

    #[test]
    fn test_withdraw_creates_balanced_splits() {
        let (db, session) = setup();

        let summary = confirm_rows(
            &db,
            &session,
            &[row(-54.30)],
            &[confirm("Groceries", "REWE")],
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 0);
        let RowOutcome::Created { transaction_id } = summary.outcomes[0] else {
            panic!("expected a created row");
        };

        let tx = db.get_transaction(transaction_id).unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Withdraw);
        assert_eq!(tx.amount, 54.30);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

        let splits = db.list_splits(transaction_id).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].amount + splits[1].amount, 0.0);
        assert_eq!(splits[0].account_id, session.account_id);
        assert_eq!(splits[0].amount, -54.30);
        assert_eq!(splits[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(splits[0].opposing_account_id, splits[1].account_id);
        assert_eq!(splits[1].opposing_account_id, session.account_id);
    }

    #[test]
    fn test_deposit_classification() {
        let (db, session) = setup();

        let summary = confirm_rows(
            &db,
            &session,
            &[row(2500.0)],
            &[confirm("Salary", "ACME GmbH")],
        )
        .unwrap();

        let RowOutcome::Created { transaction_id } = summary.outcomes[0] else {
            panic!("expected a created row");
        };
        let tx = db.get_transaction(transaction_id).unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Deposit);
    }

    #[test]
    fn test_transfer_when_opposing_is_personal() {
        let (db, session) = setup();
        db.create_account("Savings", None, AccountType::Personal)
            .unwrap();

        let summary = confirm_rows(
            &db,
            &session,
            &[row(-200.0)],
            &[confirm("Monthly savings", "Savings")],
        )
        .unwrap();

        let RowOutcome::Created { transaction_id } = summary.outcomes[0] else {
            panic!("expected a created row");
        };
        let tx = db.get_transaction(transaction_id).unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Transfer);
        // No new foreign account was created for the counterparty
        assert_eq!(db.list_accounts().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_account_created_foreign_with_iban() {
        let (db, session) = setup();

        confirm_rows(&db, &session, &[row(-54.30)], &[confirm("Groceries", "REWE")]).unwrap();

        let accounts = db.list_accounts().unwrap();
        let rewe = accounts.iter().find(|a| a.name == "REWE").unwrap();
        assert_eq!(rewe.account_type, AccountType::Foreign);
        assert_eq!(rewe.iban.as_deref(), Some("DE89370400440532013000"));
    }

    #[test]
    fn test_iban_backfill_on_existing_foreign_account() {
        let (db, session) = setup();
        db.create_account("REWE", None, AccountType::Foreign).unwrap();

        confirm_rows(&db, &session, &[row(-54.30)], &[confirm("Groceries", "REWE")]).unwrap();

        let accounts = db.list_accounts().unwrap();
        let rewe = accounts.iter().find(|a| a.name == "REWE").unwrap();
        assert_eq!(rewe.iban.as_deref(), Some("DE89370400440532013000"));
    }

    #[test]
    fn test_skip_reasons() {
        let (db, session) = setup();

        let mut zero = row(0.0);
        zero.iban = None;

        let summary = confirm_rows(
            &db,
            &session,
            &[row(-10.0), row(-10.0), row(-10.0), zero],
            &[
                ConfirmRow {
                    ignore: true,
                    ..confirm("Anything", "REWE")
                },
                confirm("", "REWE"),
                confirm("Groceries", ""),
                confirm("Zero", "REWE"),
            ],
        )
        .unwrap();

        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 4);
        let reasons: Vec<_> = summary
            .outcomes
            .iter()
            .map(|o| match o {
                RowOutcome::Skipped { reason } => *reason,
                _ => panic!("expected skips"),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::Ignored,
                SkipReason::MissingTitle,
                SkipReason::MissingAccount,
                SkipReason::ZeroAmount
            ]
        );
    }

    #[test]
    fn test_length_mismatch_rejected_before_writes() {
        let (db, session) = setup();

        let err = confirm_rows(&db, &session, &[row(-10.0), row(-20.0)], &[confirm("A", "B")]);
        assert!(err.is_err());
        assert!(db.transactions_in_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        )
        .unwrap()
        .is_empty());
    }

    #[test]
    fn test_recurrence_linked_when_selected() {
        let (db, session) = setup();
        let recurrence_id = db.create_recurrence("Rent").unwrap();

        let summary = confirm_rows(
            &db,
            &session,
            &[row(-800.0)],
            &[ConfirmRow {
                recurrence: recurrence_id,
                ..confirm("Rent March", "Landlord")
            }],
        )
        .unwrap();

        let RowOutcome::Created { transaction_id } = summary.outcomes[0] else {
            panic!("expected a created row");
        };
        let tx = db.get_transaction(transaction_id).unwrap().unwrap();
        assert_eq!(tx.recurrence_id, Some(recurrence_id));
    }
}
