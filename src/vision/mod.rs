//! 视觉内联模块：将消息附件编码为各厂商格式的内联图片
//!
//! Vision inlining. Resolves a message's attachments through an
//! [`UploadEncoder`] and turns them into provider-specific image parts.
//! Attachments that cannot be encoded are skipped; the text part is always
//! kept.

use base64::Engine as _;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{ContentPart, Message, MessageContent, UploadRef};

/// Upload resolved to inline bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedUpload {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedUpload {
    pub fn new(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Resolves upload references to `{mime_type, base64}`.
///
/// `encode` may perform I/O. Returning `None` means the upload is missing or
/// unreadable; callers skip it.
pub trait UploadEncoder: Send + Sync {
    fn encode(&self, upload: &UploadRef) -> Option<EncodedUpload>;
}

/// Encoder for callers that never attach files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUploads;

impl UploadEncoder for NoUploads {
    fn encode(&self, _upload: &UploadRef) -> Option<EncodedUpload> {
        None
    }
}

/// Uploads held in memory, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUploads {
    uploads: HashMap<UploadRef, EncodedUpload>,
}

impl InMemoryUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, upload: impl Into<UploadRef>, encoded: EncodedUpload) {
        self.uploads.insert(upload.into(), encoded);
    }

    pub fn with_upload(mut self, upload: impl Into<UploadRef>, encoded: EncodedUpload) -> Self {
        self.insert(upload, encoded);
        self
    }

    pub fn with_bytes(
        self,
        upload: impl Into<UploadRef>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        self.with_upload(upload, EncodedUpload::from_bytes(mime_type, bytes))
    }
}

impl UploadEncoder for InMemoryUploads {
    fn encode(&self, upload: &UploadRef) -> Option<EncodedUpload> {
        self.uploads.get(upload).cloned()
    }
}

/// Reads uploads from a directory; the reference is the relative file path.
#[derive(Debug, Clone)]
pub struct FileUploadEncoder {
    root: PathBuf,
}

impl FileUploadEncoder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl UploadEncoder for FileUploadEncoder {
    fn encode(&self, upload: &UploadRef) -> Option<EncodedUpload> {
        let relative = Path::new(upload.as_str());
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            debug!(upload = %upload, "upload reference escapes the upload root");
            return None;
        }
        let path = self.root.join(relative);
        let media_type = guess_media_type(&path)?;
        match std::fs::read(&path) {
            Ok(bytes) => Some(EncodedUpload::from_bytes(media_type, &bytes)),
            Err(e) => {
                debug!(upload = %upload, error = %e, "failed to read upload");
                None
            }
        }
    }
}

fn guess_media_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mt = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mt)
}

/// How a provider expects inline images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStyle {
    /// `{"type": "image_url", "image_url": {"url": "data:<mime>;base64,<data>"}}`
    DataUrl,
    /// `{"type": "image", "source": {"type": "base64", "media_type", "data"}}`
    Base64Source,
}

impl ImageStyle {
    pub fn part(&self, upload: &EncodedUpload) -> ContentPart {
        match self {
            ImageStyle::DataUrl => ContentPart::image_data_url(&upload.mime_type, &upload.base64),
            ImageStyle::Base64Source => {
                ContentPart::image_base64(upload.mime_type.clone(), upload.base64.clone())
            }
        }
    }
}

/// Encoded image attachments of a message, in attachment order.
pub fn encoded_uploads(message: &Message, encoder: &dyn UploadEncoder) -> Vec<EncodedUpload> {
    message
        .attachments
        .iter()
        .filter_map(|upload| match encoder.encode(upload) {
            Some(encoded) if encoded.is_image() => Some(encoded),
            Some(encoded) => {
                debug!(upload = %upload, mime_type = %encoded.mime_type, "skipping non-image upload");
                None
            }
            None => {
                debug!(upload = %upload, "skipping unresolvable upload");
                None
            }
        })
        .collect()
}

/// Inline a message's images ahead of `content`.
///
/// Without encodable attachments the content is returned as plain text.
/// Otherwise the result is every image part in attachment order followed by
/// a single text part carrying `content`.
pub fn inline_images(
    content: String,
    message: &Message,
    encoder: &dyn UploadEncoder,
    style: ImageStyle,
) -> MessageContent {
    let uploads = encoded_uploads(message, encoder);
    if uploads.is_empty() {
        return MessageContent::Text(content);
    }

    let mut parts: Vec<ContentPart> = uploads.iter().map(|u| style.part(u)).collect();
    parts.push(ContentPart::text(content));
    MessageContent::Parts(parts)
}
