pub mod migrations;
pub mod schema;

use rusqlite::{Connection, Result};
use std::path::Path;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Store and usage log hold separate connections to one file.
        conn.busy_timeout(std::time::Duration::from_secs(2))?;
        Ok(Self { conn })
    }

    /// Open and bring the schema up to date.
    pub fn open_migrated(path: &Path) -> Result<Self> {
        let db = Self::open(path)?;
        migrations::run(db.connection())?;
        Ok(db)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_database_opens() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let _db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_all_tables_created() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open_migrated(&db_path).unwrap();

        let expected_tables = ["kv", "usage_events"];
        for table in &expected_tables {
            let count: i32 = db.connection()
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0)
                ).unwrap();
            assert_eq!(count, 1, "Table {table} should exist");
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();

        migrations::run(db.connection()).unwrap();
        db.connection()
            .execute("INSERT INTO kv (key, value) VALUES ('k', 'v')", [])
            .unwrap();
        migrations::run(db.connection()).unwrap();

        let count: i32 = db.connection()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1, "Running migrations twice should keep existing rows");
    }

    #[test]
    fn test_two_connections_share_one_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let writer = Database::open_migrated(&db_path).unwrap();
        let reader = Database::open_migrated(&db_path).unwrap();

        writer.connection()
            .execute("INSERT INTO kv (key, value) VALUES ('shared', '1')", [])
            .unwrap();

        let value: String = reader.connection()
            .query_row("SELECT value FROM kv WHERE key = 'shared'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "1");
    }
}
