//! Token counter implementations.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::types::Message;

/// Flat cost charged for an attached image, whatever its size.
pub const IMAGE_TOKEN_COST: usize = 85;

pub trait TokenCounter: Send + Sync + std::fmt::Debug {
    fn count(&self, text: &str) -> usize;

    /// Tokens for the text a message contributes to the prompt: content,
    /// recorded tool calls and tool output. Attached images are priced by
    /// the dialect, which alone knows whether they get inlined.
    fn count_message(&self, message: &Message) -> usize {
        let mut total = self.count(&message.content);
        if let Some(id) = &message.id {
            total += self.count(id);
        }
        for call in &message.tool_calls {
            total += self.count(&call.name);
            total += self.count(&call.arguments.to_string());
        }
        if let Some(result) = &message.tool_result {
            total += self.count(&result.content_text());
        }
        total
    }

    fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum()
    }

    fn truncate_to_limit(&self, text: &str, max_tokens: usize, suffix: &str) -> String {
        let current = self.count(text);
        if current <= max_tokens {
            return text.to_string();
        }
        let suffix_tokens = if suffix.is_empty() {
            0
        } else {
            self.count(suffix)
        };
        let target = max_tokens.saturating_sub(suffix_tokens);
        if target == 0 {
            return suffix.to_string();
        }
        let chars_per_token = text.chars().count() as f64 / current as f64;
        let mut truncated: String = text
            .chars()
            .take((target as f64 * chars_per_token) as usize)
            .collect();
        while self.count(&truncated) > target && !truncated.is_empty() {
            let keep = (truncated.chars().count() as f64 * 0.9) as usize;
            truncated = truncated.chars().take(keep).collect();
        }
        format!("{}{}", truncated, suffix)
    }
}

#[derive(Debug, Clone)]
pub struct CharacterEstimator {
    chars_per_token: f64,
}
impl CharacterEstimator {
    pub fn new() -> Self {
        Self::with_ratio(4.0)
    }
    pub fn with_ratio(r: f64) -> Self {
        Self { chars_per_token: r }
    }
}
impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new()
    }
}
impl TokenCounter for CharacterEstimator {
    fn count(&self, text: &str) -> usize {
        (text.len() as f64 / self.chars_per_token).ceil() as usize
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicEstimator {
    chars_per_token: f64,
}
impl AnthropicEstimator {
    pub fn new() -> Self {
        Self {
            chars_per_token: 3.5,
        }
    }
}
impl Default for AnthropicEstimator {
    fn default() -> Self {
        Self::new()
    }
}
impl TokenCounter for AnthropicEstimator {
    fn count(&self, text: &str) -> usize {
        let base = (text.len() as f64 / self.chars_per_token).ceil() as usize;
        let ws = text.chars().filter(|c| c.is_whitespace()).count();
        base + (ws as f64 * 0.1) as usize
    }
}

/// Approximates the Llama 3 byte-pair tokenizer by walking its
/// pre-tokenization classes: letter runs, digit groups of at most three,
/// punctuation runs and whitespace. Used when a model declares no tokenizer.
#[derive(Debug, Clone)]
pub struct LlamaEstimator {
    letters_per_token: usize,
}
impl LlamaEstimator {
    pub fn new() -> Self {
        Self {
            letters_per_token: 6,
        }
    }
}
impl Default for LlamaEstimator {
    fn default() -> Self {
        Self::new()
    }
}
impl TokenCounter for LlamaEstimator {
    fn count(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c.is_ascii_alphabetic() || c == '\'' {
                let mut len: usize = 1;
                while chars.next_if(|n| n.is_ascii_alphabetic()).is_some() {
                    len += 1;
                }
                tokens += len.div_ceil(self.letters_per_token);
            } else if c.is_ascii_digit() {
                let mut len: usize = 1;
                while chars.next_if(|n| n.is_ascii_digit()).is_some() {
                    len += 1;
                }
                tokens += len.div_ceil(3);
            } else if c.is_whitespace() {
                // a lone space merges into the following word
                let mut run = 1;
                let mut newline = c == '\n';
                while let Some(n) = chars.next_if(|n| n.is_whitespace()) {
                    newline |= n == '\n';
                    run += 1;
                }
                if newline || run > 1 {
                    tokens += 1;
                }
            } else if c.is_ascii() {
                let mut len: usize = 1;
                while chars
                    .next_if(|n| n.is_ascii_punctuation() && *n != '\'')
                    .is_some()
                {
                    len += 1;
                }
                tokens += len.div_ceil(2);
            } else {
                tokens += 1;
            }
        }
        tokens
    }
}

/// Memoizes counts of an inner counter in a bounded LRU cache.
#[derive(Debug)]
pub struct CachingCounter {
    inner: Box<dyn TokenCounter>,
    cache: Mutex<LruCache<String, usize>>,
}
impl CachingCounter {
    pub fn new(inner: Box<dyn TokenCounter>, max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
    pub fn clear_cache(&self) {
        if let Ok(mut c) = self.cache.lock() {
            c.clear();
        }
    }
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}
impl TokenCounter for CachingCounter {
    fn count(&self, text: &str) -> usize {
        if let Ok(mut c) = self.cache.lock() {
            if let Some(&n) = c.get(text) {
                return n;
            }
        }
        let n = self.inner.count(text);
        if let Ok(mut c) = self.cache.lock() {
            c.put(text.to_string(), n);
        }
        n
    }
}

/// Tokenizer family a model declares in its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenizerKind {
    #[serde(rename = "llama3")]
    Llama3,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "character")]
    Character,
}

impl TokenizerKind {
    pub fn counter(&self) -> Arc<dyn TokenCounter> {
        match self {
            Self::Llama3 => Arc::new(LlamaEstimator::new()),
            Self::OpenAi | Self::Character => Arc::new(CharacterEstimator::new()),
            Self::Anthropic => Arc::new(AnthropicEstimator::new()),
        }
    }
}
