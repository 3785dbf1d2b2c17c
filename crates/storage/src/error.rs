use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid storage settings: {0}")]
    InvalidSettings(String),
    #[error("corrupt queue entry {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}
