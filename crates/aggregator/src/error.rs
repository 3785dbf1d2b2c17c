use storage::StorageError;
use thiserror::Error;

/// Failure to fold one trade into its account. The trade stays queued.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("trade {0} is already processed or no longer queued")]
    AlreadyProcessed(i64),
    #[error("commit of trade {id} failed: {source}")]
    Commit {
        id: i64,
        #[source]
        source: StorageError,
    },
}
