//! Batch executor.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ModelConfig;
use crate::dialects::DialectRegistry;
use crate::types::{Prompt, TranslatedPayload};
use crate::vision::{NoUploads, UploadEncoder};

/// One independent translation.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub prompt: Prompt,
    pub config: ModelConfig,
}

impl TranslationJob {
    pub fn new(prompt: Prompt, config: ModelConfig) -> Self {
        Self { prompt, config }
    }
}

#[derive(Debug, Clone)]
pub struct BatchResult<T, E> {
    pub successes: Vec<(usize, T)>,
    pub failures: Vec<(usize, E)>,
    pub execution_time: Duration,
    pub total_processed: usize,
}

impl<T, E> BatchResult<T, E> {
    pub fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            execution_time: Duration::ZERO,
            total_processed: 0,
        }
    }
    pub fn add_success(&mut self, i: usize, r: T) {
        self.successes.push((i, r));
    }
    pub fn add_failure(&mut self, i: usize, e: E) {
        self.failures.push((i, e));
    }
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            self.successes.len() as f64 / self.total_processed as f64
        }
    }

    /// Result for the job at `index`, if it succeeded.
    pub fn success(&self, index: usize) -> Option<&T> {
        self.successes
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, r)| r)
    }

    fn sort_by_index(&mut self) {
        self.successes.sort_by_key(|(i, _)| *i);
        self.failures.sort_by_key(|(i, _)| *i);
    }
}
impl<T, E> Default for BatchResult<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct BatchError {
    pub message: String,
    pub index: usize,
    /// Whether the failure came from the prompt itself rather than the worker.
    pub validation: bool,
}
impl BatchError {
    pub fn new(msg: impl Into<String>, idx: usize) -> Self {
        Self {
            message: msg.into(),
            index: idx,
            validation: false,
        }
    }
    fn from_translation(err: crate::Error, idx: usize) -> Self {
        Self {
            message: err.to_string(),
            index: idx,
            validation: err.is_validation(),
        }
    }
}
impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Batch error at {}: {}", self.index, self.message)
    }
}
impl std::error::Error for BatchError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStrategy {
    Parallel,
    Sequential,
    Concurrent { max_concurrency: usize },
}
impl Default for BatchStrategy {
    fn default() -> Self {
        BatchStrategy::Concurrent { max_concurrency: 5 }
    }
}

#[derive(Debug, Clone)]
pub struct BatchExecutorConfig {
    pub strategy: BatchStrategy,
    pub continue_on_error: bool,
}
impl Default for BatchExecutorConfig {
    fn default() -> Self {
        Self {
            strategy: BatchStrategy::default(),
            continue_on_error: true,
        }
    }
}
impl BatchExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_strategy(mut self, s: BatchStrategy) -> Self {
        self.strategy = s;
        self
    }
    pub fn with_continue_on_error(mut self, c: bool) -> Self {
        self.continue_on_error = c;
        self
    }
}

/// Runs translations on blocking worker tasks. Each worker builds its own
/// dialect, so nothing but the registry and the upload encoder is shared.
pub struct BatchTranslator {
    registry: Arc<DialectRegistry>,
    uploads: Arc<dyn UploadEncoder>,
    config: BatchExecutorConfig,
}
impl BatchTranslator {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(DialectRegistry::new()),
            uploads: Arc::new(NoUploads),
            config: BatchExecutorConfig::default(),
        }
    }
    pub fn with_config(mut self, config: BatchExecutorConfig) -> Self {
        self.config = config;
        self
    }
    pub fn with_registry(mut self, registry: Arc<DialectRegistry>) -> Self {
        self.registry = registry;
        self
    }
    pub fn with_uploads(mut self, uploads: Arc<dyn UploadEncoder>) -> Self {
        self.uploads = uploads;
        self
    }
    pub fn config(&self) -> &BatchExecutorConfig {
        &self.config
    }

    pub async fn translate_all(
        &self,
        jobs: Vec<TranslationJob>,
    ) -> BatchResult<TranslatedPayload, BatchError> {
        let start = Instant::now();
        let total = jobs.len();
        let mut result = match self.config.strategy {
            BatchStrategy::Sequential => self.execute_sequential(jobs).await,
            BatchStrategy::Parallel => self.execute_concurrent(jobs, total.max(1)).await,
            BatchStrategy::Concurrent { max_concurrency } => {
                self.execute_concurrent(jobs, max_concurrency.max(1)).await
            }
        };
        result.sort_by_index();
        result.execution_time = start.elapsed();
        result.total_processed = total;
        debug!(
            total,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            elapsed_ms = result.execution_time.as_millis() as u64,
            "batch translation finished"
        );
        result
    }

    async fn execute_sequential(
        &self,
        jobs: Vec<TranslationJob>,
    ) -> BatchResult<TranslatedPayload, BatchError> {
        let mut result = BatchResult::new();
        for (i, job) in jobs.into_iter().enumerate() {
            match self.run_job(i, job).await {
                Ok(payload) => result.add_success(i, payload),
                Err(e) => {
                    result.add_failure(i, e);
                    if !self.config.continue_on_error {
                        break;
                    }
                }
            }
        }
        result
    }

    async fn execute_concurrent(
        &self,
        jobs: Vec<TranslationJob>,
        limit: usize,
    ) -> BatchResult<TranslatedPayload, BatchError> {
        let mut result = BatchResult::new();
        let mut outcomes = stream::iter(jobs.into_iter().enumerate())
            .map(|(i, job)| async move { (i, self.run_job(i, job).await) })
            .buffer_unordered(limit);
        while let Some((i, outcome)) = outcomes.next().await {
            match outcome {
                Ok(payload) => result.add_success(i, payload),
                Err(e) => {
                    result.add_failure(i, e);
                    if !self.config.continue_on_error {
                        break;
                    }
                }
            }
        }
        result
    }

    async fn run_job(
        &self,
        index: usize,
        job: TranslationJob,
    ) -> std::result::Result<TranslatedPayload, BatchError> {
        let registry = Arc::clone(&self.registry);
        let uploads = Arc::clone(&self.uploads);
        let joined = tokio::task::spawn_blocking(move || {
            registry.translate(&job.prompt, &job.config, uploads.as_ref())
        })
        .await;
        match joined {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(e)) => Err(BatchError::from_translation(e, index)),
            Err(e) => Err(BatchError::new(format!("translation worker failed: {}", e), index)),
        }
    }
}
impl Default for BatchTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate every job with the built-in dialects and default settings.
pub async fn translate_all(
    jobs: Vec<TranslationJob>,
    uploads: Arc<dyn UploadEncoder>,
) -> BatchResult<TranslatedPayload, BatchError> {
    BatchTranslator::new()
        .with_uploads(uploads)
        .translate_all(jobs)
        .await
}
