//! 类型系统模块：定义方言转换的输入与输出数据类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of both sides of a dialect translation:
//! the provider-agnostic prompt a caller builds, and the provider-shaped
//! payload a dialect produces.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Prompt`] | Ordered messages, tool definitions and optional system instruction |
//! | [`Message`] | Abstract message tagged by [`MessageRole`] |
//! | [`ToolDefinition`] | Tool the model may call, with its parameters |
//! | [`ToolCall`] / [`ToolResult`] | Recorded tool invocations and their outputs |
//! | [`TranslatedPayload`] | Provider-shaped `messages` array |
//! | [`MessageContent`] | Plain string or typed content parts |
//!
//! ## Example
//!
//! ```rust
//! use ai_dialects::types::{Message, Prompt, ToolDefinition, ToolParameter};
//!
//! let prompt = Prompt::new(vec![
//!     Message::system("You are a helpful assistant"),
//!     Message::user("What's the weather?").with_id("sam"),
//! ])
//! .with_tools(vec![ToolDefinition::new("get_weather", "Current weather for a location")
//!     .with_parameter(ToolParameter::new("location", "string", "City name").required())]);
//!
//! assert!(prompt.validate().is_ok());
//! ```

pub mod message;
pub mod payload;
pub mod prompt;
pub mod tool;

pub use message::{Message, MessageRole, UploadRef};
pub use payload::{
    ContentPart, ImageSource, ImageUrl, MessageContent, PayloadRole, TranslatedMessage,
    TranslatedPayload,
};
pub use prompt::Prompt;
pub use tool::{ToolCall, ToolDefinition, ToolParameter, ToolResult};
