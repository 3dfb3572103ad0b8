//! Prompt assembly.
//!
//! Builds the ordered message list sent to the completion API:
//!
//! 1. **System** — the instruction, parameterised by the session topic
//! 2. **Attachments** — one user message per upload, in upload order
//! 3. **Transcript** — every stored turn, in original order
//!
//! Assembly is a pure function of the session: no clock, no randomness, no
//! hidden state. Attachment content is re-sent in full on every turn, so the
//! request grows with every upload until the session is cleared.

use filechat_core::attachment::{Attachment, AttachmentKind};
use filechat_core::message::{ContentPart, Message};
use filechat_core::session::SessionState;

use crate::context::instruction::SystemInstruction;

/// Media type announced for every uploaded image, whatever its extension.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// Turns a session into the messages of one completion request.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    instruction: SystemInstruction,
}

impl PromptAssembler {
    pub fn new(instruction: SystemInstruction) -> Self {
        Self { instruction }
    }

    /// Assemble the request messages for `session`.
    pub fn build_request(&self, session: &SessionState) -> Vec<Message> {
        let mut messages = Vec::with_capacity(1 + session.attachments.len() + session.messages.len());

        messages.push(Message::system(
            self.instruction.render(session.topic.as_deref()),
        ));
        messages.extend(session.attachments.iter().map(attachment_message));
        messages.extend(session.messages.iter().cloned());

        messages
    }
}

/// The context message injected for one attachment.
pub fn attachment_message(attachment: &Attachment) -> Message {
    match attachment.kind {
        AttachmentKind::Image => Message::user_parts(vec![
            ContentPart::text(format!("Uploaded image: {}", attachment.name)),
            ContentPart::image(&attachment.payload, IMAGE_MEDIA_TYPE),
        ]),
        AttachmentKind::Text => Message::user(format!(
            "Uploaded file {} content: {}",
            attachment.name, attachment.payload
        )),
    }
}
