pub mod memory;
pub mod sqlite;

pub use memory::MemorySaver;
pub use sqlite::SqliteSaver;

use async_trait::async_trait;

use crate::models::Message;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for CheckpointError {
    fn from(err: serde_json::Error) -> Self {
        CheckpointError::Serialization(err.to_string())
    }
}

/// Saves and loads conversation transcripts keyed by thread id.
///
/// One thread id maps to the full message transcript of that conversation.
/// `put` overwrites; `get` returns `None` for threads never saved.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn put(&self, thread_id: &str, transcript: &[Message]) -> Result<(), CheckpointError>;

    async fn get(&self, thread_id: &str) -> Result<Option<Vec<Message>>, CheckpointError>;

    async fn delete(&self, thread_id: &str) -> Result<(), CheckpointError>;

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError>;
}
