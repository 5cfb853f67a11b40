//! Account operations

use rusqlite::params;
use std::collections::HashMap;
use tracing::debug;

use super::Database;
use crate::error::Result;
use crate::models::{Account, AccountType};

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let type_str: String = row.get(3)?;

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        iban: row.get(2)?,
        account_type: type_str.parse().unwrap_or(AccountType::Foreign),
    })
}

impl Database {
    /// Create an account, returning its id
    pub fn create_account(
        &self,
        name: &str,
        iban: Option<&str>,
        account_type: AccountType,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (name, iban, account_type) VALUES (?, ?, ?)",
            params![name, iban, account_type.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, iban, account_type FROM accounts ORDER BY name")?;

        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, name, iban, account_type FROM accounts WHERE id = ?",
                params![id],
                row_to_account,
            )
            .ok();

        Ok(account)
    }

    /// Map every known IBAN to its account id
    ///
    /// Built once per import batch so row matching is a hash lookup
    /// instead of a query per row.
    pub fn iban_account_map(&self) -> Result<HashMap<String, i64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT iban, id FROM accounts WHERE iban IS NOT NULL AND iban != ''")?;

        let map = stmt
            .query_map([], |row| {
                let iban: String = row.get(0)?;
                let id: i64 = row.get(1)?;
                Ok((iban, id))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(map)
    }

    /// Resolve the opposing account for a confirmed row by name
    ///
    /// An existing account of any type wins, preferring personal over
    /// foreign when a name exists as both. Unknown names become new
    /// foreign accounts. When the matched account carries no IBAN but
    /// the statement row supplied one, the IBAN is backfilled so future
    /// imports match this account by IBAN directly.
    pub fn resolve_opposing_account(&self, name: &str, iban: Option<&str>) -> Result<Account> {
        let conn = self.conn()?;
        let iban = iban.filter(|s| !s.is_empty());

        let existing: Option<Account> = conn
            .query_row(
                "SELECT id, name, iban, account_type FROM accounts WHERE name = ?
                 ORDER BY CASE account_type
                     WHEN 'personal' THEN 0
                     WHEN 'foreign' THEN 1
                     ELSE 2
                 END
                 LIMIT 1",
                params![name],
                row_to_account,
            )
            .ok();

        if let Some(mut account) = existing {
            if account.iban.as_deref().unwrap_or("").is_empty() {
                if let Some(iban) = iban {
                    conn.execute(
                        "UPDATE accounts SET iban = ? WHERE id = ?",
                        params![iban, account.id],
                    )?;
                    account.iban = Some(iban.to_string());
                    debug!(account_id = account.id, "Backfilled IBAN on matched account");
                }
            }
            return Ok(account);
        }

        conn.execute(
            "INSERT INTO accounts (name, iban, account_type) VALUES (?, ?, ?)",
            params![name, iban, AccountType::Foreign.as_str()],
        )?;

        Ok(Account {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            iban: iban.map(|s| s.to_string()),
            account_type: AccountType::Foreign,
        })
    }
}
