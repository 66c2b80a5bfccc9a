//! Failure modes for the redb-backed store. Kept separate from
//! `sidereal_consensus::ErrorCode` per that crate's own note: "store/channel
//! failures live in the node crate's own error type and must never be
//! folded into this one."

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(String),
    #[error("serialization error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("manifest io error: {0}")]
    ManifestIo(#[from] std::io::Error),
}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::Redb(e.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Redb(e.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::Redb(e.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::Redb(e.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::Redb(e.to_string())
    }
}
