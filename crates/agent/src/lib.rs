//! The chat turn cycle for FileChat.
//!
//! Each user submission is one turn:
//!
//! 1. **Receive** the user text (empty input is ignored)
//! 2. **Assemble** the request: system instruction, attachments, transcript
//! 3. **Send to the LLM** via the configured provider
//! 4. **Store** the reply, or the error text when the call fails
//!
//! There is no tool use and no retry. A turn always ends with exactly one
//! assistant message in the session.

pub mod context;
pub mod stream_event;
pub mod turn;

#[cfg(test)]
mod test_helpers;

pub use context::{IMAGE_MEDIA_TYPE, PromptAssembler, SystemInstruction, attachment_message};
pub use stream_event::TurnEvent;
pub use turn::{ERROR_REPLY_PREFIX, TurnOutcome, TurnRunner, error_reply};
