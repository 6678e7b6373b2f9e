//! Conversation persistence across runs.
//!
//! A [`Session`] stores non-system conversation messages between runs so a
//! follow-up run can pick up where the last one ended. The runner loads the
//! stored history before the first turn and appends the run's new messages
//! after a successful finish.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Result;
use crate::items::Message;

#[async_trait]
pub trait Session: Send + Sync {
    fn session_id(&self) -> &str;

    /// Stored messages, oldest first. `limit` returns the most recent N.
    async fn get_messages(&self, limit: Option<usize>) -> Result<Vec<Message>>;

    async fn add_messages(&self, messages: Vec<Message>) -> Result<()>;

    /// Remove and return the most recent message, for undo-style corrections.
    async fn pop_message(&self) -> Result<Option<Message>>;

    async fn clear(&self) -> Result<()>;
}

/// Process-local session backed by a `Vec`. Useful for tests and short-lived
/// programs; nothing survives the process.
pub struct InMemorySession {
    id: String,
    messages: Mutex<Vec<Message>>,
}

impl InMemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Session for InMemorySession {
    fn session_id(&self) -> &str {
        &self.id
    }

    async fn get_messages(&self, limit: Option<usize>) -> Result<Vec<Message>> {
        let messages = self.messages.lock().unwrap();
        let messages = match limit {
            Some(n) if n < messages.len() => messages[messages.len() - n..].to_vec(),
            _ => messages.clone(),
        };
        Ok(messages)
    }

    async fn add_messages(&self, new: Vec<Message>) -> Result<()> {
        self.messages.lock().unwrap().extend(new);
        Ok(())
    }

    async fn pop_message(&self) -> Result<Option<Message>> {
        Ok(self.messages.lock().unwrap().pop())
    }

    async fn clear(&self) -> Result<()> {
        self.messages.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_in_memory_session_roundtrip() {
        let session = InMemorySession::new("s1");
        assert_eq!(session.session_id(), "s1");

        session
            .add_messages(vec![Message::user("hi"), Message::assistant("hello")])
            .await
            .unwrap();

        let all = session.get_messages(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let last = session.get_messages(Some(1)).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].content, "hello");

        let popped = session.pop_message().await.unwrap().unwrap();
        assert_eq!(popped.content, "hello");
        assert_eq!(session.get_messages(None).await.unwrap().len(), 1);

        session.clear().await.unwrap();
        assert!(session.get_messages(None).await.unwrap().is_empty());
    }
}
