//! Request context: the system instruction and the prompt assembler.

pub mod assembler;
pub mod instruction;

pub use assembler::{IMAGE_MEDIA_TYPE, PromptAssembler, attachment_message};
pub use instruction::SystemInstruction;
