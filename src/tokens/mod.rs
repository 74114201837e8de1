//! Token 计数模块：为方言提供 token 预算统计与截断能力。
//!
//! # Token Counting Module
//!
//! Token counting is the injected capability a dialect uses to keep a
//! prompt inside the model's budget. Counters are cheap local estimators;
//! models may declare which family they follow through [`TokenizerKind`].
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TokenCounter`] | Trait for token counting and truncation |
//! | [`LlamaEstimator`] | Llama 3 family approximation, the default for unconfigured models |
//! | [`CharacterEstimator`] | Fast character-based approximation (4 chars ≈ 1 token) |
//! | [`AnthropicEstimator`] | Anthropic-specific token estimation |
//! | [`CachingCounter`] | LRU wrapper that caches token counts |
//!
//! ## Example
//!
//! ```rust
//! use ai_dialects::tokens::{LlamaEstimator, TokenCounter};
//!
//! let counter = LlamaEstimator::new();
//! let tokens = counter.count("Hello, how are you?");
//! let clipped = counter.truncate_to_limit("a very long text", 2, "");
//! assert!(counter.count(&clipped) <= 2);
//! # let _ = tokens;
//! ```

mod counter;

pub use counter::{
    AnthropicEstimator, CachingCounter, CharacterEstimator, LlamaEstimator, TokenCounter,
    TokenizerKind, IMAGE_TOKEN_COST,
};
