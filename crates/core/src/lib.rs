//! # FileChat Core
//!
//! Domain types, traits, and error definitions for FileChat.
//! This crate has **no HTTP or UI dependencies** — it defines the session
//! store and message model that the assembler, providers and gateway share.
//!
//! ## Design Philosophy
//!
//! Session state is an explicitly owned value, never ambient. Whoever hosts
//! the interaction (web gateway, terminal) owns a [`SessionState`] and hands
//! it to the assembler, so everything here is testable without a UI.

pub mod attachment;
pub mod error;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use attachment::{Attachment, AttachmentKind};
pub use error::{ProviderError, SessionError};
pub use message::{ContentPart, Message, MessageContent, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use session::{SessionId, SessionState};
