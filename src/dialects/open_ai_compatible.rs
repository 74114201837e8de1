//! OpenAI-compatible dialect. Catch-all for every chat-completions API
//! that follows the OpenAI message format (vLLM, Ollama, DeepSeek, Groq, ...).
//!
//! Differences from the shared algorithm:
//! - Images are inlined as `image_url` parts carrying a data URI.
//! - When the model rejects the system role (`disable_system_prompt`), the
//!   system message is folded into the first user turn.

use super::{Dialect, DialectBase};
use crate::config::ModelConfig;
use crate::tools::FunctionStyle;
use crate::types::{PayloadRole, Prompt, TranslatedMessage, TranslatedPayload};
use crate::vision::UploadEncoder;

#[derive(Debug)]
pub struct OpenAiCompatible<'a> {
    base: DialectBase<'a>,
}

impl<'a> OpenAiCompatible<'a> {
    pub const NAME: &'static str = "open_ai_compatible";

    /// Any model can be addressed through the OpenAI format.
    pub fn can_translate(_model_id: &str) -> bool {
        true
    }

    pub fn new(
        prompt: &'a Prompt,
        config: &'a ModelConfig,
        uploads: &'a dyn UploadEncoder,
    ) -> Self {
        Self {
            base: DialectBase::new(prompt, config, uploads, FunctionStyle::OpenAi),
        }
    }
}

impl Dialect for OpenAiCompatible<'_> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn base(&self) -> &DialectBase<'_> {
        &self.base
    }

    fn translate(&self) -> crate::Result<TranslatedPayload> {
        let translated = self.translate_conversation()?;
        if !self.base.config().system_prompt_disabled() {
            return Ok(TranslatedPayload::new(translated));
        }
        Ok(TranslatedPayload::new(merge_system_into_user(translated)))
    }
}

/// Replace a leading `[system, next]` pair with one user message whose
/// content is the system text, a newline, then the next message's content.
fn merge_system_into_user(messages: Vec<TranslatedMessage>) -> Vec<TranslatedMessage> {
    if messages.len() < 2 || messages[0].role != PayloadRole::System {
        return messages;
    }

    let mut rest = messages.into_iter();
    match (rest.next(), rest.next()) {
        (Some(system), Some(next)) => {
            let merged = TranslatedMessage::user(
                next.content
                    .prepend_text(&system.content.text_content(), "\n"),
            );
            std::iter::once(merged).chain(rest).collect()
        }
        (first, second) => first.into_iter().chain(second).chain(rest).collect(),
    }
}
