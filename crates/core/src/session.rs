//! The per-session store.
//!
//! A [`SessionState`] is owned by whoever drives the interaction (the HTTP
//! gateway or the terminal chat) and passed explicitly to the assembler.
//! It holds the transcript, the uploaded attachments and the selected topic.
//! The system instruction is never stored in `messages`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment::Attachment;
use crate::message::{Message, Role};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation transcript plus uploaded context for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Session ID
    pub id: SessionId,

    /// User/assistant turns in chronological order
    pub messages: Vec<Message>,

    /// Uploaded files in upload order
    pub attachments: Vec<Attachment>,

    /// Selected topic that parameterises the system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the session was last mutated
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create an empty session with a known ID.
    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            attachments: Vec::new(),
            topic: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a user turn. Empty input is ignored and `false` is returned;
    /// whitespace-only text is a real turn.
    pub fn append_user_message(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.push(Message::user(text));
        true
    }

    /// Append an assistant turn.
    pub fn append_assistant_message(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text.into()));
    }

    /// Store an uploaded file. Uploads are never deduplicated or capped.
    pub fn add_attachment(&mut self, name: impl Into<String>, bytes: &[u8]) -> &Attachment {
        let attachment = Attachment::from_upload(name, bytes);
        tracing::debug!(
            session = %self.id,
            name = %attachment.name,
            kind = ?attachment.kind,
            payload_len = attachment.payload_len(),
            "Attachment added"
        );
        self.attachments.push(attachment);
        self.touch();
        &self.attachments[self.attachments.len() - 1]
    }

    /// Drop both transcript and attachments.
    pub fn clear_conversation(&mut self) {
        self.messages.clear();
        self.attachments.clear();
        self.touch();
    }

    /// Drop attachments, keep the transcript ("new context").
    pub fn clear_attachments_only(&mut self) {
        self.attachments.clear();
        self.touch();
    }

    /// Select a topic. Blank values clear the selection.
    pub fn set_topic(&mut self, topic: Option<String>) {
        self.topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.touch();
    }

    /// Number of completed user turns (user messages in the transcript).
    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
