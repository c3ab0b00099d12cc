//! Session & document store.
//!
//! [`ChatStore`] owns the in-memory collections and writes them through a
//! [`BlobStore`] after every mutation.

pub mod blob;
pub mod connection;
pub mod models;
pub mod service;

pub use blob::{BlobStore, DuckDbBlobStore, MemoryBlobStore};
pub use connection::{get_connection, DbPool};
pub use models::*;
pub use service::{ChatStore, SharedStore};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation Error: {0}")]
    Validation(String),
    #[error("Invalid Session: {0}")]
    InvalidSession(Uuid),
    #[error("Permission Denied: {0}")]
    PermissionDenied(String),
    #[error("Storage Error: {0}")]
    Storage(String),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<duckdb::Error> for StoreError {
    fn from(e: duckdb::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}
