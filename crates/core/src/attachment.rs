//! Uploaded file records.
//!
//! An [`Attachment`] is created once per upload and never changes afterwards.
//! Classification is by file extension only: `png`, `jpg` and `jpeg` are
//! images and are kept as base64; everything else is decoded as UTF-8 with
//! invalid sequences replaced, so an upload can never fail on content.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions classified as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Extensions the uploader accepts. `pdf` has no binary handling and goes
/// through the text path like any other non-image file.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "txt", "pdf"];

/// What kind of context an attachment contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Text,
}

/// A file uploaded into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name as given by the uploader
    pub name: String,

    /// Image or text
    pub kind: AttachmentKind,

    /// Base64 bytes for images, decoded text otherwise
    pub payload: String,

    /// When the upload happened
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    /// Build an attachment from raw upload bytes.
    pub fn from_upload(name: impl Into<String>, bytes: &[u8]) -> Self {
        let name = name.into();
        let kind = classify(&name);
        let payload = match kind {
            AttachmentKind::Image => BASE64_STANDARD.encode(bytes),
            AttachmentKind::Text => String::from_utf8_lossy(bytes).into_owned(),
        };

        Self {
            name,
            kind,
            payload,
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }

    /// Size of the stored payload in bytes (base64 length for images).
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Lowercased extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Decide the attachment kind for a file name.
pub fn classify(name: &str) -> AttachmentKind {
    match extension_of(name) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => AttachmentKind::Image,
        _ => AttachmentKind::Text,
    }
}

/// Whether the uploader should let this file through.
pub fn is_accepted_upload(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}
