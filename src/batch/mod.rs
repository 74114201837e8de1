//! 批量转换模块：在工作线程上并发执行多个相互独立的转换。
//!
//! # Batch Translation Module
//!
//! Translation itself is synchronous. This module runs many independent
//! translations on `tokio` blocking workers with bounded concurrency and
//! collects the outcomes by job index.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TranslationJob`] | A prompt and the model config to translate it for |
//! | [`BatchTranslator`] | Runs jobs with a configurable strategy |
//! | [`BatchResult`] | Successes and failures keyed by job index |
//!
//! ## Example
//!
//! ```rust,no_run
//! use ai_dialects::batch::{BatchTranslator, TranslationJob};
//! use ai_dialects::{Message, ModelConfig, Prompt};
//!
//! # async fn run() {
//! let jobs = vec![
//!     TranslationJob::new(Prompt::new(vec![Message::user("hi")]), ModelConfig::new("gpt-4o")),
//!     TranslationJob::new(Prompt::new(vec![Message::user("hey")]), ModelConfig::new("claude-3-haiku")),
//! ];
//! let result = BatchTranslator::new().translate_all(jobs).await;
//! assert!(result.all_succeeded());
//! # }
//! ```
//!
//! ## Strategies
//!
//! - **Sequential**: one job at a time, in order
//! - **Parallel**: every job at once
//! - **Concurrent**: up to N jobs at once

mod executor;

pub use executor::{
    translate_all, BatchError, BatchExecutorConfig, BatchResult, BatchStrategy, BatchTranslator,
    TranslationJob,
};
