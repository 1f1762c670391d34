//! Configuration loading and backend factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use viva_core::gateway::GatewayConfig;
use viva_core::session::ExamConfig;
use viva_core::traits::ModelInvoker;
use viva_core::ThresholdPolicy;

use crate::offline::OfflineInvoker;
use crate::together::TogetherProvider;

/// Configuration for a single model backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Together {
        api_key: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    Offline {},
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Together {
                api_key: _,
                model,
                base_url,
            } => f
                .debug_struct("Together")
                .field("api_key", &"***")
                .field("model", model)
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Offline {} => f.debug_struct("Offline").finish(),
        }
    }
}

/// Per-exam settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSettings {
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_passing_threshold")]
    pub passing_threshold: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            passing_threshold: default_passing_threshold(),
            max_attempts: default_max_attempts(),
            topic: default_topic(),
            difficulty: default_difficulty(),
        }
    }
}

/// Top-level viva configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VivaConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default backend to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Max tokens per model call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retries after the first failed model call.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Transport deadline per model call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Exam-level settings.
    #[serde(default)]
    pub exam: ExamSettings,
    /// Optional directory of prompt template overrides.
    #[serde(default)]
    pub prompt_dir: Option<PathBuf>,
    /// Directory where session files are stored.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_provider() -> String {
    "together".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    500
}
fn default_request_timeout() -> u64 {
    60
}
fn default_question_count() -> usize {
    3
}
fn default_passing_threshold() -> f64 {
    60.0
}
fn default_max_attempts() -> u32 {
    2
}
fn default_topic() -> String {
    "Computer Science".to_string()
}
fn default_difficulty() -> String {
    "Intermediate".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./viva-sessions")
}

impl Default for VivaConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            request_timeout_secs: default_request_timeout(),
            exam: ExamSettings::default(),
            prompt_dir: None,
            data_dir: default_data_dir(),
        }
    }
}

impl VivaConfig {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn exam_config(&self) -> ExamConfig {
        ExamConfig {
            question_count: self.exam.question_count,
            topic: self.exam.topic.clone(),
            difficulty: self.exam.difficulty.clone(),
        }
    }

    pub fn policy(&self) -> ThresholdPolicy {
        ThresholdPolicy {
            passing_threshold: self.exam.passing_threshold,
            max_attempts: self.exam.max_attempts,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Together {
            api_key,
            model,
            base_url,
        } => ProviderConfig::Together {
            api_key: resolve_env_vars(api_key),
            model: model.clone(),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Offline {} => ProviderConfig::Offline {},
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `viva.toml` in the current directory
/// 2. `~/.config/viva/config.toml`
///
/// Environment variable override: `VIVA_TOGETHER_KEY`.
pub fn load_config() -> Result<VivaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VivaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("viva.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<VivaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => VivaConfig::default(),
    };

    if let Ok(key) = std::env::var("VIVA_TOGETHER_KEY") {
        config
            .providers
            .entry("together".into())
            .or_insert(ProviderConfig::Together {
                api_key: String::new(),
                model: None,
                base_url: None,
            });
        if let Some(ProviderConfig::Together { api_key, .. }) =
            config.providers.get_mut("together")
        {
            *api_key = key;
        }
    }

    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("viva"))
}

/// Create the model backend the config selects. Falls back to the offline
/// backend when no usable key is configured, so the system always starts.
pub fn create_invoker(config: &VivaConfig) -> Arc<dyn ModelInvoker> {
    match config.providers.get(&config.default_provider) {
        Some(ProviderConfig::Together {
            api_key,
            model,
            base_url,
        }) if !api_key.trim().is_empty() => Arc::new(TogetherProvider::new(
            api_key,
            model.clone(),
            base_url.clone(),
        )),
        Some(ProviderConfig::Offline {}) => Arc::new(OfflineInvoker),
        _ => {
            tracing::warn!(
                provider = %config.default_provider,
                "no usable backend configured, running in offline demo mode"
            );
            Arc::new(OfflineInvoker)
        }
    }
}
