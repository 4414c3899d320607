use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Agent,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Agent => "agent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only chat transcript shown to the user.
///
/// Entries are never edited or removed individually. Ids come from a counter
/// that survives [`MessageLog::reset_with_user`], so an id is never reused
/// within one log.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
    next_seq: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, content: impl Into<String>) -> ChatMessage {
        self.append(ChatRole::User, content.into())
    }

    pub fn append_agent(&mut self, content: impl Into<String>) -> ChatMessage {
        self.append(ChatRole::Agent, content.into())
    }

    /// Drop every entry and seed the log with one user message.
    pub fn reset_with_user(&mut self, content: impl Into<String>) -> ChatMessage {
        self.entries.clear();
        self.append_user(content)
    }

    fn append(&mut self, role: ChatRole, content: String) -> ChatMessage {
        self.next_seq += 1;
        let msg = ChatMessage {
            id: format!("msg-{}-{}", role.as_str(), self.next_seq),
            role,
            content,
            timestamp: Utc::now(),
        };
        self.entries.push(msg.clone());
        msg
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last()
    }

    pub fn agent_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter(|m| m.role == ChatRole::Agent)
    }
}
