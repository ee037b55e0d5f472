//! Configuration system (layered: code > env > config file > defaults).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MedicError, Result};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_WEB_SEARCH_URL: &str = "https://api.duckduckgo.com/";

/// Run-scoped configuration. A run takes a snapshot when it is constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MedicConfig {
    pub agent: AgentSection,
    pub tools: ToolSection,
    pub security: SecuritySection,
}

/// Model collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentSection {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// Overrides the built-in directive. Supports `{project_dir}`,
    /// `{command_history}` and `{error}` placeholders.
    pub system_prompt: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

/// Limits applied by the built-in tools and the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolSection {
    pub max_output_chars: usize,
    pub default_timeout_ms: u64,
    pub max_list_items: usize,
    pub max_find_results: usize,
    pub read_line_limit: usize,
    pub max_search_matches: usize,
    pub web_search_url: String,
    pub web_timeout_ms: u64,
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            max_output_chars: 5000,
            default_timeout_ms: 30_000,
            max_list_items: 50,
            max_find_results: 20,
            read_line_limit: 500,
            max_search_matches: 10,
            web_search_url: DEFAULT_WEB_SEARCH_URL.to_string(),
            web_timeout_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecuritySection {
    /// Tool identifiers that require approval before execution.
    pub privileged_tools: BTreeSet<String>,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            privileged_tools: BTreeSet::from(["shell".to_string()]),
        }
    }
}

impl MedicConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. A missing file is an error here; see [`Self::discover`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Load `config.toml` from the platform config directory, falling back
    /// to defaults when it does not exist.
    pub fn discover() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Layer environment overrides on top (`.env` is loaded first if present).
    pub fn apply_env(mut self) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    pub(crate) fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MEDIC_API_URL") {
            self.agent.api_url = url;
        }
        if let Some(key) = lookup("MEDIC_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.agent.api_key = Some(key);
        }
        if let Some(model) = lookup("MEDIC_MODEL") {
            self.agent.model = model;
        }
        if let Some(raw) = lookup("MEDIC_TEMPERATURE") {
            self.agent.temperature = raw.trim().parse().map_err(|_| {
                MedicError::Configuration(format!("MEDIC_TEMPERATURE is not a number: {raw}"))
            })?;
        }
        if let Some(raw) = lookup("MEDIC_PRIVILEGED_TOOLS") {
            self.security.privileged_tools = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.tools.max_output_chars == 0 {
            return Err(MedicError::Configuration(
                "tools.max_output_chars must be greater than zero".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(MedicError::Configuration(format!(
                "agent.temperature must be within 0.0..=2.0, got {}",
                self.agent.temperature
            )));
        }
        if self.agent.api_url.trim().is_empty() {
            return Err(MedicError::Configuration("agent.api_url is empty".into()));
        }
        Ok(())
    }
}

/// `<platform config dir>/medic/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "medic", "medic")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
