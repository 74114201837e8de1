//! Dialect selection.
//!
//! Entries are tried in registration order and the first whose
//! `can_translate` accepts the model id wins. [`OpenAiCompatible`] is held
//! apart as the fallback, so it is always consulted last.

use tracing::debug;

use super::{Claude, Dialect, OpenAiCompatible};
use crate::config::ModelConfig;
use crate::types::{Prompt, TranslatedPayload};
use crate::vision::UploadEncoder;

/// Constructor shared by every dialect variant.
pub type BuildDialect = for<'a> fn(
    &'a Prompt,
    &'a ModelConfig,
    &'a dyn UploadEncoder,
) -> Box<dyn Dialect + 'a>;

/// One registered dialect variant.
#[derive(Clone, Copy)]
pub struct DialectEntry {
    pub name: &'static str,
    pub can_translate: fn(&str) -> bool,
    pub build: BuildDialect,
}

impl DialectEntry {
    pub fn new(name: &'static str, can_translate: fn(&str) -> bool, build: BuildDialect) -> Self {
        Self {
            name,
            can_translate,
            build,
        }
    }

    pub fn claude() -> Self {
        Self::new(Claude::NAME, Claude::can_translate, build_claude)
    }

    pub fn open_ai_compatible() -> Self {
        Self::new(
            OpenAiCompatible::NAME,
            OpenAiCompatible::can_translate,
            build_open_ai_compatible,
        )
    }
}

fn build_claude<'a>(
    prompt: &'a Prompt,
    config: &'a ModelConfig,
    uploads: &'a dyn UploadEncoder,
) -> Box<dyn Dialect + 'a> {
    Box::new(Claude::new(prompt, config, uploads))
}

fn build_open_ai_compatible<'a>(
    prompt: &'a Prompt,
    config: &'a ModelConfig,
    uploads: &'a dyn UploadEncoder,
) -> Box<dyn Dialect + 'a> {
    Box::new(OpenAiCompatible::new(prompt, config, uploads))
}

impl std::fmt::Debug for DialectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectEntry").field("name", &self.name).finish()
    }
}

/// Ordered dialect variants plus the catch-all.
#[derive(Debug, Clone)]
pub struct DialectRegistry {
    entries: Vec<DialectEntry>,
    fallback: DialectEntry,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![DialectEntry::claude()],
            fallback: DialectEntry::open_ai_compatible(),
        }
    }

    /// Add a variant. It takes priority over the catch-all but not over
    /// variants registered before it.
    pub fn register(&mut self, entry: DialectEntry) {
        self.entries.push(entry);
    }

    pub fn with_entry(mut self, entry: DialectEntry) -> Self {
        self.register(entry);
        self
    }

    /// First entry claiming the model, else the catch-all.
    pub fn select(&self, model_id: &str) -> &DialectEntry {
        let entry = self
            .entries
            .iter()
            .find(|e| (e.can_translate)(model_id))
            .unwrap_or(&self.fallback);
        debug!(model = model_id, dialect = entry.name, "selected dialect");
        entry
    }

    /// Build the dialect for `config.name`.
    pub fn dialect_for<'a>(
        &self,
        prompt: &'a Prompt,
        config: &'a ModelConfig,
        uploads: &'a dyn UploadEncoder,
    ) -> Box<dyn Dialect + 'a> {
        (self.select(&config.name).build)(prompt, config, uploads)
    }

    pub fn translate(
        &self,
        prompt: &Prompt,
        config: &ModelConfig,
        uploads: &dyn UploadEncoder,
    ) -> crate::Result<TranslatedPayload> {
        self.dialect_for(prompt, config, uploads).translate()
    }

    /// Names in selection order, the catch-all last.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|e| e.name)
            .collect()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate `prompt` for the model described by `config` with the
/// built-in dialects.
pub fn translate(
    prompt: &Prompt,
    config: &ModelConfig,
    uploads: &dyn UploadEncoder,
) -> crate::Result<TranslatedPayload> {
    DialectRegistry::new().translate(prompt, config, uploads)
}
