//! Provider-shaped output of a dialect

use serde::{Deserialize, Serialize};

/// Role as accepted by chat-completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadRole {
    System,
    User,
    Assistant,
}

/// One entry of the provider `messages` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedMessage {
    pub role: PayloadRole,
    pub content: MessageContent,
}

impl TranslatedMessage {
    pub fn new(role: PayloadRole, content: MessageContent) -> Self {
        Self { role, content }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(PayloadRole::System, MessageContent::text(text))
    }

    pub fn user(content: MessageContent) -> Self {
        Self::new(PayloadRole::User, content)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(PayloadRole::Assistant, MessageContent::text(text))
    }
}

/// Message content: a plain string, or typed parts for mixed text/image turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn parts(parts: Vec<ContentPart>) -> Self {
        MessageContent::Parts(parts)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(_) => None,
        }
    }

    /// All text carried by the content, parts joined with newlines.
    pub fn text_content(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn image_count(&self) -> usize {
        match self {
            MessageContent::Text(_) => 0,
            MessageContent::Parts(parts) => parts.iter().filter(|p| p.is_image()).count(),
        }
    }

    /// Put `prefix` and `sep` in front of the text. For part lists the
    /// prefix goes into the trailing text part, keeping images first.
    pub fn prepend_text(self, prefix: &str, sep: &str) -> Self {
        match self {
            MessageContent::Text(s) => MessageContent::Text(format!("{prefix}{sep}{s}")),
            MessageContent::Parts(mut parts) => {
                let last_text = parts
                    .iter()
                    .rposition(|p| matches!(p, ContentPart::Text { .. }));
                match last_text {
                    Some(i) => {
                        if let ContentPart::Text { text } = &mut parts[i] {
                            *text = format!("{prefix}{sep}{text}");
                        }
                    }
                    None => parts.push(ContentPart::text(prefix)),
                }
                MessageContent::Parts(parts)
            }
        }
    }

    /// Join two contents. Two strings stay a string. Otherwise the images
    /// of both sides come first, in order, followed by one text part that
    /// joins the non-empty texts with `sep`.
    pub fn concat(self, other: MessageContent, sep: &str) -> Self {
        match (self, other) {
            (MessageContent::Text(a), MessageContent::Text(b)) => {
                MessageContent::Text(format!("{a}{sep}{b}"))
            }
            (a, b) => {
                let mut images = Vec::new();
                let mut texts = Vec::new();
                for part in a.into_parts().into_iter().chain(b.into_parts()) {
                    match part {
                        ContentPart::Text { text } if text.is_empty() => {}
                        ContentPart::Text { text } => texts.push(text),
                        image => images.push(image),
                    }
                }
                images.push(ContentPart::text(texts.join(sep)));
                MessageContent::Parts(images)
            }
        }
    }

    pub fn into_parts(self) -> Vec<ContentPart> {
        match self {
            MessageContent::Text(s) => vec![ContentPart::text(s)],
            MessageContent::Parts(parts) => parts,
        }
    }
}

/// Typed content part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    /// OpenAI-style image reference carrying a data URI.
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    /// Base64 source block used by the Messages API family.
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String, // base64 encoded
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_data_url(mime_type: &str, base64: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime_type, base64),
            },
        }
    }

    pub fn image_base64(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        ContentPart::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type: mime_type.into(),
                data: base64.into(),
            },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::ImageUrl { .. } | ContentPart::Image { .. })
    }
}

/// Ordered provider messages, ready to be placed in a request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslatedPayload {
    messages: Vec<TranslatedMessage>,
}

impl TranslatedPayload {
    pub fn new(messages: Vec<TranslatedMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[TranslatedMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<TranslatedMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranslatedMessage> {
        self.messages.iter()
    }

    /// Extract system messages and the remaining turns separately, for APIs
    /// that take the system prompt as a top-level parameter.
    pub fn split_system(&self) -> (Option<String>, Vec<TranslatedMessage>) {
        let mut system_parts: Vec<String> = Vec::new();
        let mut turns: Vec<TranslatedMessage> = Vec::new();

        for m in &self.messages {
            match m.role {
                PayloadRole::System => system_parts.push(m.content.text_content()),
                _ => turns.push(m.clone()),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, turns)
    }

    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl<'a> IntoIterator for &'a TranslatedPayload {
    type Item = &'a TranslatedMessage;
    type IntoIter = std::slice::Iter<'a, TranslatedMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
