//! Category operations

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::Category;

impl Database {
    pub fn create_category(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO categories (name) VALUES (?)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Attach a category to every split of a transaction
    pub fn set_transaction_category(&self, transaction_id: i64, category_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE splits SET category_id = ? WHERE transaction_id = ?",
            params![category_id, transaction_id],
        )?;
        Ok(())
    }
}
