//! Provider-agnostic conversation messages

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tool::{ToolCall, ToolResult};

/// Abstract message as built by the conversation layer.
///
/// The `role` tag decides which of the optional fields are meaningful:
/// `tool_calls` for [`MessageRole::ToolCall`], `tool_result` for
/// [`MessageRole::Tool`], `id` and `attachments` for [`MessageRole::User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    /// Sender identity in multi-user threads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<UploadRef>,
}

impl Message {
    fn with_role(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content,
            id: None,
            tool_calls: Vec::new(),
            tool_result: None,
            attachments: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, text.into())
    }

    /// Assistant turn that invokes one or more tools.
    pub fn tool_call(calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::with_role(MessageRole::ToolCall, String::new());
        msg.tool_calls = calls;
        msg
    }

    /// Output of a previously invoked tool.
    pub fn tool_result(result: ToolResult) -> Self {
        let mut msg = Self::with_role(MessageRole::Tool, String::new());
        msg.tool_result = Some(result);
        msg
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attachment(mut self, upload: impl Into<UploadRef>) -> Self {
        self.attachments.push(upload.into());
        self
    }

    pub fn with_attachments<I, U>(mut self, uploads: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UploadRef>,
    {
        self.attachments.extend(uploads.into_iter().map(Into::into));
        self
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// Message role tag.
///
/// `assistant` is a plain-text assistant turn, `tool_call` an assistant turn
/// invoking tools and `tool` the result handed back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    ToolCall,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolCall => "tool_call",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to an uploaded file, resolved by an
/// [`UploadEncoder`](crate::vision::UploadEncoder).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadRef(String);

impl UploadRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UploadRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UploadRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UploadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tags_use_snake_case() {
        let msg = Message::tool_call(vec![ToolCall::new(
            "call_1",
            "search",
            serde_json::json!({"query": "rust"}),
        )]);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "tool_call");
        assert_eq!(v["tool_calls"][0]["name"], "search");
        assert!(v.get("attachments").is_none());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let raw = r#"{"role": "narrator", "content": "Once upon a time"}"#;
        assert!(serde_json::from_str::<Message>(raw).is_err());
    }

    #[test]
    fn test_user_builder() {
        let msg = Message::user("look at these")
            .with_id("sam")
            .with_attachments(["upload-1", "upload-2"]);
        assert_eq!(msg.id.as_deref(), Some("sam"));
        assert_eq!(
            msg.attachments,
            vec![UploadRef::new("upload-1"), UploadRef::new("upload-2")]
        );
        assert!(msg.has_attachments());
    }
}
