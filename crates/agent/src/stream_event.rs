//! Turn-level streaming events.
//!
//! `TurnEvent` wraps provider-level stream chunks into the events the
//! gateway forwards to the browser over SSE:
//! - `chunk` — partial reply text
//! - `error` — the completion call failed; `message` is the stored reply
//! - `done`  — the turn is over; `reply` is what the transcript now holds

use filechat_core::provider::Usage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Partial text from the model.
    Chunk { content: String },

    /// The completion call failed.
    Error { message: String },

    /// The assistant turn has been stored.
    Done {
        session_id: String,
        reply: String,
        usage: Option<Usage>,
    },
}

impl TurnEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_chunk() {
        let event = TurnEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_done() {
        let event = TurnEvent::Done {
            session_id: "abc".into(),
            reply: "Hi".into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            }),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""total_tokens":30"#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(TurnEvent::Chunk { content: "x".into() }.event_type(), "chunk");
        assert_eq!(TurnEvent::Error { message: "x".into() }.event_type(), "error");
        assert_eq!(
            TurnEvent::Done {
                session_id: "s".into(),
                reply: "r".into(),
                usage: None
            }
            .event_type(),
            "done"
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"error","message":"Error: boom"}"#;
        let event: TurnEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            TurnEvent::Error {
                message: "Error: boom".into()
            }
        );
    }
}
