// keygate — SQLite Database Management
//
// Opens the item database and runs schema migrations. Secret columns hold
// ciphertext sealed by the enclave, so the file itself is not encrypted.

use rusqlite::Connection;

use super::StoreError;

/// Wrapper around the SQLite connection backing the item store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self { conn };
        db.run_migrations()?;

        Ok(db)
    }

    /// Open an existing database, failing if the file has not been created yet.
    pub fn open_existing(path: &std::path::Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotInitialized);
        }
        Self::open(path)
    }

    /// Open an in-memory database (for testing only).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run schema migrations to create or update tables.
    fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS items (
                id              TEXT PRIMARY KEY,
                class           TEXT NOT NULL,
                account         TEXT NOT NULL,
                server          TEXT NOT NULL,
                sealed_secret   BLOB NOT NULL,
                access_control  TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                UNIQUE (class, account, server)
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id     TEXT,
                server      TEXT NOT NULL,
                action      TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                details     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_items_server
                ON items(class, server);

            CREATE INDEX IF NOT EXISTS idx_audit_server
                ON audit_log(server);
            ",
        )?;

        tracing::debug!("Database migrations completed successfully");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
