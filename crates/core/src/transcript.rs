use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::intent::WELCOME_MESSAGE;
use crate::models::{ChatMessage, ChatRole};

/// Append-only chat history.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Transcript {
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    pub fn with_welcome(at: DateTime<Utc>) -> Self {
        let mut transcript = Self::empty();
        transcript.append(ChatRole::Assistant, WELCOME_MESSAGE, at);
        transcript
    }

    pub fn append(
        &mut self,
        role: ChatRole,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            role,
            text: text.into(),
            timestamp: at,
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::with_welcome(Utc::now())
    }
}
