use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use duckdb::params;

use super::connection::DbPool;
use super::StoreError;

/// Named-slot storage for serialized collections.
pub trait BlobStore: Send {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Slots kept in the `blobs` table of a DuckDB database.
pub struct DuckDbBlobStore {
    pool: DbPool,
}

impl DuckDbBlobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl BlobStore for DuckDbBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self
            .pool
            .lock()
            .map_err(|_| StoreError::Storage("connection lock poisoned".to_string()))?;
        let mut stmt = conn.prepare("SELECT value FROM blobs WHERE key = ?")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        let value = rows.next().transpose()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self
            .pool
            .lock()
            .map_err(|_| StoreError::Storage("connection lock poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO blobs (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process slots. Clones share the same map, so a second store built
/// from a clone sees everything the first one flushed.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
