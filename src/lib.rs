//! # ai-dialects
//!
//! 这是 AI-Protocol 的方言转换层，将与厂商无关的对话转换为各厂商聊天接口所需的请求消息。
//!
//! Provider dialects for AI-Protocol. Converts a provider-agnostic
//! conversation (system, user, assistant and tool messages, attached images,
//! tool definitions) into the exact `messages` array a provider's
//! chat-completions API expects, and parses provider tool-call output back
//! into the abstract form.
//!
//! ## Core Philosophy
//!
//! - **Pure translation**: the prompt is borrowed, never mutated; output is a new payload
//! - **Provider-agnostic input**: one [`Prompt`] shape for every provider
//! - **Budget-aware**: conversations are trimmed to the model's prompt token budget
//! - **Type-Safe**: role tags and content shapes are enums, not strings
//!
//! ## Quick Start
//!
//! ```rust
//! use ai_dialects::{translate, Message, ModelConfig, Prompt};
//! use ai_dialects::vision::NoUploads;
//!
//! let prompt = Prompt::new(vec![
//!     Message::system("You are terse."),
//!     Message::user("hi").with_id("42"),
//! ]);
//! let config = ModelConfig::new("gpt-4o");
//!
//! let payload = translate(&prompt, &config, &NoUploads)?;
//! assert_eq!(payload.len(), 2);
//! println!("{}", payload.to_json()?);
//! # Ok::<(), ai_dialects::Error>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Prompt, message, tool and payload types |
//! | [`dialects`] | The `Dialect` contract, provider variants and selection |
//! | [`tools`] | Tool declarations, tool call rendering and parsing |
//! | [`vision`] | Upload encoding and image inlining |
//! | [`tokens`] | Token counting and truncation |
//! | [`config`] | Model configuration and the model registry |
//! | [`batch`] | Many independent translations on worker tasks |

pub mod batch;
pub mod config;
pub mod dialects;
pub mod tokens;
pub mod tools;
pub mod types;
pub mod vision;

// Re-export main types for convenience
pub use config::{ModelConfig, ModelRegistry};
pub use dialects::{translate, Claude, Dialect, DialectRegistry, OpenAiCompatible};
pub use tools::ToolsDialect;
pub use types::{
    ContentPart, Message, MessageContent, MessageRole, Prompt, ToolCall, ToolDefinition,
    ToolParameter, ToolResult, TranslatedMessage, TranslatedPayload,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
