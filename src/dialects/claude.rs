//! Anthropic 方言：Claude 模型的消息格式转换
//!
//! Claude dialect. Handles the key differences from the OpenAI format:
//! - Images use `{"type": "image", "source": {"type": "base64", ...}}` blocks.
//! - Native tools are declared with `input_schema`.
//! - Roles must alternate, so consecutive same-role turns are merged.
//! - The system prompt is sent as a top-level parameter; callers use
//!   [`TranslatedPayload::split_system`] to lift it out.

use std::sync::Arc;

use super::{Dialect, DialectBase};
use crate::config::ModelConfig;
use crate::tokens::{AnthropicEstimator, TokenCounter};
use crate::tools::FunctionStyle;
use crate::types::{MessageContent, PayloadRole, Prompt, TranslatedMessage, TranslatedPayload};
use crate::vision::{ImageStyle, UploadEncoder};

#[derive(Debug)]
pub struct Claude<'a> {
    base: DialectBase<'a>,
}

impl<'a> Claude<'a> {
    pub const NAME: &'static str = "claude";

    pub fn can_translate(model_id: &str) -> bool {
        let id = model_id.to_ascii_lowercase();
        id.starts_with("claude") || id.starts_with("anthropic/") || id.contains("/claude")
    }

    pub fn new(
        prompt: &'a Prompt,
        config: &'a ModelConfig,
        uploads: &'a dyn UploadEncoder,
    ) -> Self {
        Self {
            base: DialectBase::new(prompt, config, uploads, FunctionStyle::Anthropic),
        }
    }
}

impl Dialect for Claude<'_> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn base(&self) -> &DialectBase<'_> {
        &self.base
    }

    fn default_tokenizer(&self) -> Arc<dyn TokenCounter> {
        Arc::new(AnthropicEstimator::new())
    }

    fn image_style(&self) -> ImageStyle {
        ImageStyle::Base64Source
    }

    fn translate(&self) -> crate::Result<TranslatedPayload> {
        let translated = self.translate_conversation()?;
        Ok(TranslatedPayload::new(merge_consecutive_turns(translated)))
    }
}

fn merge_consecutive_turns(messages: Vec<TranslatedMessage>) -> Vec<TranslatedMessage> {
    let mut merged: Vec<TranslatedMessage> = Vec::with_capacity(messages.len());
    for message in messages {
        match merged.last_mut() {
            Some(prev) if prev.role == message.role && message.role != PayloadRole::System => {
                let content =
                    std::mem::replace(&mut prev.content, MessageContent::Text(String::new()));
                prev.content = content.concat(message.content, "\n\n");
            }
            _ => merged.push(message),
        }
    }
    merged
}
