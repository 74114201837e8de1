//! 方言抽象层 — 将与厂商无关的对话转换为各厂商的请求消息格式
//!
//! Dialect abstraction layer. A dialect turns a provider-agnostic
//! [`Prompt`] into the `messages` array one provider family expects.
//!
//! The shared algorithm lives in the provided methods of [`Dialect`]:
//! trim the conversation to the token budget, then dispatch every message
//! on its role tag to a per-role handler. Concrete dialects override
//! handlers and add post-processing in [`Dialect::translate`].
//!
//! One dialect instance serves one translation. The translated tool
//! declarations are cached inside the instance and never shared.

pub mod claude;
pub mod open_ai_compatible;
pub mod registry;

use once_cell::unsync::OnceCell;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::ModelConfig;
use crate::tokens::{LlamaEstimator, TokenCounter, IMAGE_TOKEN_COST};
use crate::tools::{self, FunctionStyle, ToolsDialect};
use crate::types::{
    Message, MessageContent, MessageRole, Prompt, TranslatedMessage, TranslatedPayload,
};
use crate::vision::{self, ImageStyle, UploadEncoder};

pub use claude::Claude;
pub use open_ai_compatible::OpenAiCompatible;
pub use registry::{translate, DialectEntry, DialectRegistry};

/// Share of the budget, in percent, a leading system message may take.
const SYSTEM_BUDGET_PERCENT: usize = 60;

/// State shared by every dialect: the borrowed inputs of one translation,
/// the tool translator and the once-computed tool declarations.
pub struct DialectBase<'a> {
    prompt: &'a Prompt,
    config: &'a ModelConfig,
    uploads: &'a dyn UploadEncoder,
    tools_dialect: Box<dyn ToolsDialect>,
    translated_tools: OnceCell<Value>,
}

impl<'a> DialectBase<'a> {
    pub fn new(
        prompt: &'a Prompt,
        config: &'a ModelConfig,
        uploads: &'a dyn UploadEncoder,
        style: FunctionStyle,
    ) -> Self {
        let tools_dialect =
            tools::create_tools_dialect(&prompt.tools, config.native_tools_enabled(), style);
        Self {
            prompt,
            config,
            uploads,
            tools_dialect,
            translated_tools: OnceCell::new(),
        }
    }

    pub fn prompt(&self) -> &Prompt {
        self.prompt
    }

    pub fn config(&self) -> &ModelConfig {
        self.config
    }

    pub fn uploads(&self) -> &dyn UploadEncoder {
        self.uploads
    }

    pub fn tools_dialect(&self) -> &dyn ToolsDialect {
        self.tools_dialect.as_ref()
    }

    /// Tool declarations, translated on first access.
    pub fn tools(&self) -> crate::Result<&Value> {
        self.translated_tools
            .get_or_try_init(|| self.tools_dialect.translated_tools())
    }
}

impl std::fmt::Debug for DialectBase<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectBase")
            .field("model", &self.config.name)
            .field("messages", &self.prompt.messages.len())
            .field("tools_dialect", &self.tools_dialect)
            .finish_non_exhaustive()
    }
}

/// Per-provider translation strategy.
pub trait Dialect {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn base(&self) -> &DialectBase<'_>;

    fn default_tokenizer(&self) -> Arc<dyn TokenCounter> {
        Arc::new(LlamaEstimator::new())
    }

    /// Tokenizer from the model config, else [`Dialect::default_tokenizer`].
    fn tokenizer(&self) -> Arc<dyn TokenCounter> {
        self.base()
            .config()
            .token_counter()
            .unwrap_or_else(|| self.default_tokenizer())
    }

    fn max_prompt_tokens(&self) -> usize {
        self.base().config().prompt_token_budget()
    }

    fn vision_support(&self) -> bool {
        self.base().config().vision_support
    }

    fn image_style(&self) -> ImageStyle {
        ImageStyle::DataUrl
    }

    /// Tokens a provider adds around every message.
    fn per_message_overhead(&self) -> usize {
        0
    }

    fn tools_dialect(&self) -> &dyn ToolsDialect {
        self.base().tools_dialect()
    }

    fn tools(&self) -> crate::Result<&Value> {
        self.base().tools()
    }

    fn translate(&self) -> crate::Result<TranslatedPayload> {
        Ok(TranslatedPayload::new(self.translate_conversation()?))
    }

    /// Validate, trim to budget and translate message by message.
    fn translate_conversation(&self) -> crate::Result<Vec<TranslatedMessage>> {
        let prompt = self.base().prompt();
        prompt.validate()?;
        self.tools()?;

        let conversation = prompt.conversation();
        let messages = self.trim_messages(&conversation)?;
        debug!(
            dialect = self.name(),
            model = %self.base().config().name,
            messages = messages.len(),
            "translating conversation"
        );
        messages.iter().map(|m| self.translate_message(m)).collect()
    }

    fn translate_message(&self, message: &Message) -> crate::Result<TranslatedMessage> {
        match message.role {
            MessageRole::System => self.system_msg(message),
            MessageRole::User => Ok(self.user_msg(message)),
            MessageRole::Assistant => Ok(self.model_msg(message)),
            MessageRole::ToolCall => self.tool_call_msg(message),
            MessageRole::Tool => self.tool_msg(message),
        }
    }

    fn system_msg(&self, message: &Message) -> crate::Result<TranslatedMessage> {
        let instructions = self.tools_dialect().instructions();
        let content = if instructions.is_empty() {
            message.content.clone()
        } else {
            format!("{}\n\n{}", message.content, instructions)
        };
        Ok(TranslatedMessage::system(content))
    }

    fn model_msg(&self, message: &Message) -> TranslatedMessage {
        TranslatedMessage::assistant(message.content.clone())
    }

    fn tool_call_msg(&self, message: &Message) -> crate::Result<TranslatedMessage> {
        let rendered = self.tools_dialect().from_raw_tool_call(message)?;
        Ok(TranslatedMessage::assistant(rendered))
    }

    fn tool_msg(&self, message: &Message) -> crate::Result<TranslatedMessage> {
        let rendered = self.tools_dialect().from_raw_tool(message)?;
        Ok(TranslatedMessage::user(MessageContent::Text(rendered)))
    }

    fn user_msg(&self, message: &Message) -> TranslatedMessage {
        let content = match &message.id {
            Some(id) => format!("{}: {}", id, message.content),
            None => message.content.clone(),
        };

        if self.vision_support() {
            TranslatedMessage::user(self.inline_images(content, message))
        } else {
            TranslatedMessage::user(MessageContent::Text(content))
        }
    }

    fn inline_images(&self, content: String, message: &Message) -> MessageContent {
        vision::inline_images(content, message, self.base().uploads(), self.image_style())
    }

    /// Tokens consumed by tool declarations and instructions.
    fn tool_token_cost(&self, tokenizer: &dyn TokenCounter) -> crate::Result<usize> {
        let mut cost = tokenizer.count(&self.tools_dialect().instructions());
        if self.tools_dialect().is_native() && !self.base().prompt().tools.is_empty() {
            cost += tokenizer.count(&self.tools()?.to_string());
        }
        Ok(cost)
    }

    /// Tokens a message costs once translated. Images count only when this
    /// dialect inlines them: vision is on, the message is a user turn and
    /// the upload resolves to an image.
    fn message_cost(&self, tokenizer: &dyn TokenCounter, message: &Message) -> usize {
        let text = tokenizer.count_message(message);
        if !self.vision_support()
            || message.role != MessageRole::User
            || message.attachments.is_empty()
        {
            return text;
        }
        text + vision::encoded_uploads(message, self.base().uploads()).len() * IMAGE_TOKEN_COST
    }

    /// Fit the conversation into the prompt budget.
    ///
    /// The leading system message always survives, truncated to at most
    /// 60% of the budget. The rest is walked newest first: messages are
    /// kept while they fit, the first one that does not is truncated to the
    /// remaining budget (tool calls are never truncated) and everything older
    /// is dropped. A tool result left without its call is dropped too.
    fn trim_messages(&self, messages: &[Message]) -> crate::Result<Vec<Message>> {
        let tokenizer = self.tokenizer();
        let overhead = self.per_message_overhead();
        let limit = self
            .max_prompt_tokens()
            .saturating_sub(self.tool_token_cost(tokenizer.as_ref())?);

        let (system, rest) = match messages.split_first() {
            Some((first, rest)) if first.role == MessageRole::System => (Some(first), rest),
            _ => (None, messages),
        };

        let mut used = 0;
        let mut trimmed = Vec::with_capacity(messages.len());
        if let Some(system) = system {
            let max_system = limit * SYSTEM_BUDGET_PERCENT / 100;
            let mut system = system.clone();
            if self.message_cost(tokenizer.as_ref(), &system) > max_system {
                system.content = tokenizer.truncate_to_limit(&system.content, max_system, "");
                debug!(max_tokens = max_system, "truncated system message");
            }
            used += self.message_cost(tokenizer.as_ref(), &system) + overhead;
            trimmed.push(system);
        }

        let mut kept_newest_first: Vec<Message> = Vec::with_capacity(rest.len());
        for message in rest.iter().rev() {
            if used >= limit {
                break;
            }
            let cost = self.message_cost(tokenizer.as_ref(), message) + overhead;
            if used + cost <= limit {
                used += cost;
                kept_newest_first.push(message.clone());
                continue;
            }

            if matches!(message.role, MessageRole::User | MessageRole::Assistant) {
                let mut partial = message.clone();
                partial.content = String::new();
                let fixed = self.message_cost(tokenizer.as_ref(), &partial) + overhead;
                let remaining = limit.saturating_sub(used + fixed);
                partial.content = tokenizer.truncate_to_limit(&message.content, remaining, "");
                if !partial.content.trim().is_empty() {
                    kept_newest_first.push(partial);
                }
            }
            break;
        }

        if kept_newest_first.len() < rest.len() {
            debug!(
                dialect = self.name(),
                dropped = rest.len() - kept_newest_first.len(),
                budget = limit,
                "trimmed conversation to fit token budget"
            );
            while kept_newest_first
                .last()
                .map_or(false, |m| m.role == MessageRole::Tool)
            {
                kept_newest_first.pop();
            }
        }

        trimmed.extend(kept_newest_first.into_iter().rev());
        Ok(trimmed)
    }
}
