//! Assessor configuration and factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use viva_core::traits::Assessor;

use crate::openai::OpenAiAssessor;

/// Configuration for the assessment backend.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssessorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AssessorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessorConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Default, Deserialize)]
struct VivaConfigFile {
    #[serde(default)]
    assessor: Option<AssessorConfig>,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load assessor configuration.
///
/// Search order:
/// 1. The explicit path, if given
/// 2. `viva.toml` in the current directory
/// 3. Built-in defaults
///
/// Environment variable overrides: `VIVA_AI_API_KEY`, `VIVA_AI_BASE_URL`,
/// `VIVA_AI_MODEL`.
pub fn load_config(path: Option<&Path>) -> Result<AssessorConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("viva.toml");
            local.exists().then_some(local)
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let file: VivaConfigFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            file.assessor.unwrap_or_default()
        }
        None => AssessorConfig::default(),
    };

    if let Ok(key) = std::env::var("VIVA_AI_API_KEY") {
        config.api_key = key;
    }
    if let Ok(url) = std::env::var("VIVA_AI_BASE_URL") {
        config.base_url = url;
    }
    if let Ok(model) = std::env::var("VIVA_AI_MODEL") {
        config.model = Some(model);
    }

    config.api_key = resolve_env_vars(&config.api_key);
    config.base_url = resolve_env_vars(&config.base_url);

    Ok(config)
}

/// Create an assessor instance from its configuration.
pub fn create_assessor(config: &AssessorConfig) -> Result<Box<dyn Assessor>> {
    if config.api_key.is_empty() {
        anyhow::bail!(
            "no assessment API key configured (set VIVA_AI_API_KEY or [assessor] api_key)"
        );
    }
    Ok(Box::new(OpenAiAssessor::with_timeout(
        &config.api_key,
        &config.base_url,
        config.model.clone(),
        config.timeout_secs,
    )))
}
