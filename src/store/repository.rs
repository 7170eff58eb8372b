// keygate — Item Repository
//
// CRUD over the `items` table plus the audit trail. Secrets arrive and leave
// sealed; this layer never sees plaintext.

use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode};
use uuid::Uuid;

use super::db::Database;
use super::models::{ItemClass, ItemFilter, ItemRecord, ItemSummary, NewItem};
use super::StoreError;
use crate::access::AccessControl;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over item persistence.
pub trait ItemRepository {
    /// Insert a new item. Fails with `Duplicate` if (class, account, server) exists.
    fn insert(&self, item: NewItem) -> Result<Uuid, StoreError>;

    /// Get a single item by ID.
    fn get(&self, id: &Uuid) -> Result<Option<ItemRecord>, StoreError>;

    /// Items matching the filter, oldest first.
    fn find(&self, filter: &ItemFilter) -> Result<Vec<ItemRecord>, StoreError>;

    /// All items, attributes only.
    fn list(&self) -> Result<Vec<ItemSummary>, StoreError>;

    /// Delete every matching item. Returns the ids removed.
    fn delete_matching(&self, filter: &ItemFilter) -> Result<Vec<Uuid>, StoreError>;

    /// Audit trail for a server, formatted for display.
    fn audit_log(&self, server: &str) -> Result<Vec<String>, StoreError>;

    /// Write an entry to the audit log.
    fn log_access(
        &self,
        item_id: Option<&Uuid>,
        server: &str,
        action: &str,
        details: Option<&str>,
    ) -> Result<(), StoreError>;
}

// ─── SQLite Implementation ──────────────────────────────────────────────────

pub struct SqliteItemRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteItemRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_time(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    column,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    }

    /// Parse an item row from the database.
    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRecord> {
        let id_str: String = row.get(0)?;
        let class_str: String = row.get(1)?;
        let account: String = row.get(2)?;
        let server: String = row.get(3)?;
        let sealed_secret: Vec<u8> = row.get(4)?;
        let access_json: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        let id = Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let class = ItemClass::parse(&class_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown item class '{}'", class_str).into(),
            )
        })?;

        // A record whose policy cannot be read must not fall back to a weaker default.
        let access: AccessControl = serde_json::from_str(&access_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let created_at = Self::parse_time(6, &created_at_str)?;
        let updated_at = Self::parse_time(7, &updated_at_str)?;

        Ok(ItemRecord::new(
            id,
            class,
            account,
            server,
            sealed_secret,
            access,
            created_at,
            updated_at,
        ))
    }

    fn map_insert_error(err: rusqlite::Error, item: &NewItem) -> StoreError {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
                StoreError::Duplicate(format!("{} @ {}", item.account, item.server))
            }
            other => StoreError::Database(other),
        }
    }
}

impl<'a> ItemRepository for SqliteItemRepository<'a> {
    fn insert(&self, item: NewItem) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let access_json = serde_json::to_string(&item.access)?;

        self.db
            .conn()
            .execute(
                "INSERT INTO items
                    (id, class, account, server, sealed_secret, access_control,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    item.class.as_str(),
                    item.account,
                    item.server,
                    item.sealed_secret,
                    access_json,
                    now,
                    now,
                ],
            )
            .map_err(|e| Self::map_insert_error(e, &item))?;

        tracing::debug!(item_id = %id, server = %item.server, "Item row inserted");
        Ok(id)
    }

    fn get(&self, id: &Uuid) -> Result<Option<ItemRecord>, StoreError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, class, account, server, sealed_secret, access_control,
                    created_at, updated_at
             FROM items WHERE id = ?1",
        )?;

        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_record)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn find(&self, filter: &ItemFilter) -> Result<Vec<ItemRecord>, StoreError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, class, account, server, sealed_secret, access_control,
                    created_at, updated_at
             FROM items
             WHERE class = ?1 AND server = ?2 AND (?3 IS NULL OR account = ?3)
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(
            params![filter.class.as_str(), filter.server, filter.account],
            Self::row_to_record,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn list(&self) -> Result<Vec<ItemSummary>, StoreError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, class, account, server, sealed_secret, access_control,
                    created_at, updated_at
             FROM items ORDER BY server ASC, account ASC",
        )?;

        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?.summary());
        }
        Ok(summaries)
    }

    fn delete_matching(&self, filter: &ItemFilter) -> Result<Vec<Uuid>, StoreError> {
        let tx = self.db.conn().unchecked_transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM items
                 WHERE class = ?1 AND server = ?2 AND (?3 IS NULL OR account = ?3)
                 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(
                params![filter.class.as_str(), filter.server, filter.account],
                |row| row.get::<_, String>(0),
            )?;
            let mut ids = Vec::new();
            for row in rows {
                let raw = row?;
                let id = Uuid::parse_str(&raw)
                    .map_err(|e| StoreError::Corrupted(format!("item id '{}': {}", raw, e)))?;
                ids.push(id);
            }
            ids
        };

        tx.execute(
            "DELETE FROM items
             WHERE class = ?1 AND server = ?2 AND (?3 IS NULL OR account = ?3)",
            params![filter.class.as_str(), filter.server, filter.account],
        )?;
        tx.commit()?;

        if !ids.is_empty() {
            tracing::info!(server = %filter.server, count = ids.len(), "Items deleted");
        }
        Ok(ids)
    }

    fn audit_log(&self, server: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT action, item_id, timestamp, details FROM audit_log
             WHERE server = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![server], |row| {
            let action: String = row.get(0)?;
            let item_id: Option<String> = row.get(1)?;
            let timestamp_str: String = row.get(2)?;
            let details: Option<String> = row.get(3)?;

            let dt = Self::parse_time(2, &timestamp_str)?;

            let mut formatted = format!("[{}] {}", dt.format("%Y-%m-%d %H:%M:%S"), action);
            if let Some(id) = item_id {
                formatted.push_str(&format!(" item={}", id));
            }
            if let Some(d) = details {
                formatted.push_str(&format!(" ({})", d));
            }
            Ok(formatted)
        })?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    fn log_access(
        &self,
        item_id: Option<&Uuid>,
        server: &str,
        action: &str,
        details: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.conn().execute(
            "INSERT INTO audit_log (item_id, server, action, timestamp, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![item_id.map(|id| id.to_string()), server, action, now, details],
        )?;

        tracing::debug!(
            server = %server,
            action = %action,
            "Audit log entry recorded"
        );
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
