use crate::error::{GitWiseError, Result};
use crate::openai::DEFAULT_API_BASE;
use crate::planner::{DEFAULT_MAX_CHUNKS, DEFAULT_TOKEN_BUDGET};
use crate::prompt::DetailLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub detail_level: Option<DetailLevel>,
    pub api_base: Option<String>,
    #[serde(default)]
    pub provider: Provider,
    pub token_budget: Option<usize>,
    pub max_chunks: Option<usize>,
}

impl Config {
    pub fn default_model() -> &'static str {
        "gpt-4o-mini"
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| Self::default_model())
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level.unwrap_or_default()
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget.unwrap_or(DEFAULT_TOKEN_BUDGET)
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks.unwrap_or(DEFAULT_MAX_CHUNKS)
    }

    /// Keys `doctor` expects a finished `init` to have written.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.language.is_none() {
            missing.push("language");
        }
        if self.api_key.is_none() {
            missing.push("api_key");
        }
        if self.model.is_none() {
            missing.push("model");
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_budget == Some(0) {
            return Err(GitWiseError::Configuration(
                "token_budget must be greater than zero".to_string(),
            ));
        }
        if matches!(self.max_chunks, Some(n) if n < 1) {
            return Err(GitWiseError::Configuration(
                "max_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        GitWiseError::Configuration("Could not locate config directory".to_string())
    })?;
    Ok(base.join("git-wise"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load() -> Result<Config> {
    load_from(&config_path()?)
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&text)?;
    config.validate()?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path()?)
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(config).map_err(|e| {
        GitWiseError::Configuration(format!("Failed to serialize config: {}", e))
    })?;
    fs::write(path, text)?;
    Ok(())
}

pub fn get_effective_api_key(config: &Config) -> Option<String> {
    if let Ok(env_key) = std::env::var(OPENAI_API_KEY_ENV)
        && !env_key.is_empty()
    {
        return Some(env_key);
    }
    config.api_key.clone().filter(|k| !k.is_empty())
}

pub fn require_api_key(config: &Config) -> Result<String> {
    get_effective_api_key(config).ok_or_else(|| {
        GitWiseError::Configuration(format!(
            "OpenAI API key not set. Run 'git-wise init' or set {OPENAI_API_KEY_ENV}."
        ))
    })
}
