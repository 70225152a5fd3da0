use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{CheckpointError, Checkpointer};
use crate::models::Message;

/// In-memory checkpointer. Transcripts live for the life of the process.
#[derive(Clone, Default)]
pub struct MemorySaver {
    threads: Arc<Mutex<HashMap<String, Vec<Message>>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemorySaver {
    async fn put(&self, thread_id: &str, transcript: &[Message]) -> Result<(), CheckpointError> {
        let mut threads = self
            .threads
            .lock()
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        threads.insert(thread_id.to_string(), transcript.to_vec());
        Ok(())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Vec<Message>>, CheckpointError> {
        let threads = self
            .threads
            .lock()
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(threads.get(thread_id).cloned())
    }

    async fn delete(&self, thread_id: &str) -> Result<(), CheckpointError> {
        let mut threads = self
            .threads
            .lock()
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        threads.remove(thread_id);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let threads = self
            .threads
            .lock()
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(threads.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcripts_round_trip_per_thread() {
        let saver = MemorySaver::new();

        saver
            .put("1", &[Message::user("what is the weather in Chicago")])
            .await
            .unwrap();
        saver
            .put("2", &[Message::user("unrelated thread")])
            .await
            .unwrap();

        let restored = saver.get("1").await.unwrap().unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].text(), Some("what is the weather in Chicago"));

        assert!(saver.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_transcript() {
        let saver = MemorySaver::new();
        saver.put("1", &[Message::user("a")]).await.unwrap();
        saver
            .put("1", &[Message::user("a"), Message::assistant("b")])
            .await
            .unwrap();

        assert_eq!(saver.get("1").await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_the_thread() {
        let saver = MemorySaver::new();
        saver.put("1", &[Message::user("a")]).await.unwrap();
        saver.delete("1").await.unwrap();
        assert!(saver.get("1").await.unwrap().is_none());
        assert!(saver.list_threads().await.unwrap().is_empty());
    }
}
