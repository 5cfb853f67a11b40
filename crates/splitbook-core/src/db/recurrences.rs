//! Recurrence template operations

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::Recurrence;

impl Database {
    pub fn create_recurrence(&self, title: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO recurrences (title) VALUES (?)",
            params![title],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Templates offered during import review
    pub fn list_active_recurrences(&self) -> Result<Vec<Recurrence>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, title, disabled FROM recurrences WHERE disabled = 0 ORDER BY title")?;

        let recurrences = stmt
            .query_map([], |row| {
                Ok(Recurrence {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    disabled: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(recurrences)
    }

    pub fn disable_recurrence(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE recurrences SET disabled = 1 WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }
}
