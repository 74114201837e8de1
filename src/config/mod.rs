//! 模型配置模块：按模型标识解析 token 预算、视觉能力与系统提示开关。
//!
//! # Model Configuration
//!
//! [`ModelConfig`] carries the per-model capability flags a dialect consumes.
//! [`ModelRegistry`] resolves a model identifier (`"model"` or
//! `"provider/model"`) to its configuration and is usually loaded from a
//! YAML or JSON file:
//!
//! ```yaml
//! models:
//!   - name: llama-3.1-70b
//!     provider: vllm
//!     max_prompt_tokens: 8000
//!     vision_support: false
//!     custom_params:
//!       disable_system_prompt: true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, ErrorContext};
use crate::tokens::{TokenCounter, TokenizerKind};

/// Prompt budget used when a model does not declare one.
pub const DEFAULT_MAX_PROMPT_TOKENS: usize = 32_000;

/// Per-model capability flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_prompt_tokens: Option<usize>,
    #[serde(default)]
    pub vision_support: bool,
    #[serde(default)]
    pub disable_system_prompt: bool,
    #[serde(default)]
    pub native_tool_support: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<TokenizerKind>,
    /// Provider-specific switches, e.g. `disable_system_prompt` or `enable_native_tool`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_params: Map<String, Value>,
    #[serde(skip)]
    token_counter: Option<Arc<dyn TokenCounter>>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_max_prompt_tokens(mut self, tokens: usize) -> Self {
        self.max_prompt_tokens = Some(tokens);
        self
    }

    pub fn with_vision_support(mut self, enabled: bool) -> Self {
        self.vision_support = enabled;
        self
    }

    pub fn with_disable_system_prompt(mut self, disabled: bool) -> Self {
        self.disable_system_prompt = disabled;
        self
    }

    pub fn with_native_tool_support(mut self, enabled: bool) -> Self {
        self.native_tool_support = enabled;
        self
    }

    pub fn with_tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.tokenizer = Some(kind);
        self
    }

    /// Inject a concrete counter; takes precedence over `tokenizer`.
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn with_custom_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_params.insert(key.into(), value);
        self
    }

    pub fn lookup_custom_param(&self, key: &str) -> Option<&Value> {
        self.custom_params.get(key)
    }

    /// Effective budget, [`DEFAULT_MAX_PROMPT_TOKENS`] when unset.
    pub fn prompt_token_budget(&self) -> usize {
        self.max_prompt_tokens.unwrap_or(DEFAULT_MAX_PROMPT_TOKENS)
    }

    pub fn system_prompt_disabled(&self) -> bool {
        self.disable_system_prompt || self.custom_flag("disable_system_prompt")
    }

    pub fn native_tools_enabled(&self) -> bool {
        self.native_tool_support || self.custom_flag("enable_native_tool")
    }

    /// Configured counter, if the model declares one.
    pub fn token_counter(&self) -> Option<Arc<dyn TokenCounter>> {
        self.token_counter
            .clone()
            .or_else(|| self.tokenizer.map(|kind| kind.counter()))
    }

    fn custom_flag(&self, key: &str) -> bool {
        match self.lookup_custom_param(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim(), "true" | "1" | "yes"),
            Some(Value::Number(n)) => n.as_i64().map_or(false, |n| n != 0),
            _ => false,
        }
    }
}

/// Known models, resolvable by identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    #[serde(default)]
    models: Vec<ModelConfig>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.register(model);
        self
    }

    /// Add a model, replacing an earlier entry with the same name and provider.
    pub fn register(&mut self, model: ModelConfig) {
        self.models
            .retain(|m| !(m.name == model.name && m.provider == model.provider));
        self.models.push(model);
    }

    pub fn from_yaml_str(raw: &str) -> crate::Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                "invalid model registry",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("model_registry"),
            )
        })
    }

    pub fn from_json_str(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("json"));
        let registry = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_yaml_str(&raw)?
        };
        debug!(path = %path.display(), models = registry.len(), "loaded model registry");
        Ok(registry)
    }

    /// Resolve `"model"` or `"provider/model"`.
    pub fn resolve(&self, model_id: &str) -> crate::Result<&ModelConfig> {
        if let Some(found) = self.models.iter().find(|m| m.name == model_id) {
            return Ok(found);
        }

        if let Some((provider, name)) = model_id.split_once('/') {
            let found = self.models.iter().find(|m| {
                m.name == name && m.provider.as_deref().map_or(true, |p| p == provider)
            });
            if let Some(found) = found {
                return Ok(found);
            }
        }

        Err(Error::configuration_with_context(
            format!("unknown model '{}'", model_id),
            ErrorContext::new()
                .with_field_path("model")
                .with_details("register the model or use 'provider/model' matching a registered entry")
                .with_source("model_registry"),
        ))
    }

    /// Resolve, falling back to a default configuration for unknown models.
    pub fn resolve_or_default(&self, model_id: &str) -> ModelConfig {
        match self.resolve(model_id) {
            Ok(config) => config.clone(),
            Err(_) => {
                debug!(model = model_id, "model not registered, using defaults");
                ModelConfig::new(model_id)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter()
    }
}
