//! `.tabex.toml` configuration
//!
//! Configuration files can be placed in:
//! - User home directory: `~/.tabex.toml` (user defaults)
//! - Project directory: `./.tabex.toml` (project defaults)
//! - Custom location via `--config` (replaces the project file)
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments and `TABEX_API_KEY`
//! 2. Project config
//! 3. User config
//! 4. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tabex_llm::gateway::DEFAULT_GATEWAY_URL;
use tabex_llm::{GatewayConfig, LlmOptions};

pub const CONFIG_FILE_NAME: &str = ".tabex.toml";
pub const API_KEY_ENV: &str = "TABEX_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// AI gateway connection and model selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewaySection>,

    /// Defaults for the extract and records commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model for PDF to CSV conversion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_model: Option<String>,

    /// Model for record extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    /// Context hint passed to the AI stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Output format (json or text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl GatewaySection {
    fn overlay(self, over: Self) -> Self {
        Self {
            url: over.url.or(self.url),
            api_key: over.api_key.or(self.api_key),
            table_model: over.table_model.or(self.table_model),
            record_model: over.record_model.or(self.record_model),
            max_tokens: over.max_tokens.or(self.max_tokens),
        }
    }
}

impl ExtractSection {
    fn overlay(self, over: Self) -> Self {
        Self {
            hint: over.hint.or(self.hint),
            format: over.format.or(self.format),
        }
    }
}

fn overlay_section<T: Default>(base: Option<T>, over: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (base, over) {
        (None, None) => None,
        (base, over) => Some(f(base.unwrap_or_default(), over.unwrap_or_default())),
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Find and load the user and project configuration.
    ///
    /// A file that fails to load is reported and skipped.
    pub fn discover(custom: Option<&Path>) -> Self {
        let user = dirs::home_dir().and_then(|home| Self::load_optional(&home.join(CONFIG_FILE_NAME)));
        let project = match custom {
            Some(path) => Self::load_optional(path),
            None => Self::load_optional(&PathBuf::from(CONFIG_FILE_NAME)),
        };
        Self::merge(user, project)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring config {}: {e:#}", path.display());
                None
            }
        }
    }

    /// Merge configs field by field; `project` wins over `user`.
    pub fn merge(user: Option<Self>, project: Option<Self>) -> Self {
        let user = user.unwrap_or_default();
        let project = project.unwrap_or_default();
        Self {
            gateway: overlay_section(user.gateway, project.gateway, GatewaySection::overlay),
            extract: overlay_section(user.extract, project.extract, ExtractSection::overlay),
        }
    }

    /// Apply command-line values, which take precedence over every file.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        let cli_gateway = GatewaySection {
            api_key: overrides.api_key,
            ..GatewaySection::default()
        };
        let cli_extract = ExtractSection {
            hint: overrides.hint,
            format: overrides.format,
        };
        self.gateway = overlay_section(self.gateway, Some(cli_gateway), GatewaySection::overlay);
        self.extract = overlay_section(self.extract, Some(cli_extract), ExtractSection::overlay);
        self
    }

    fn gateway_section(&self) -> GatewaySection {
        self.gateway.clone().unwrap_or_default()
    }

    pub fn hint(&self) -> Option<&str> {
        self.extract.as_ref().and_then(|e| e.hint.as_deref())
    }

    pub fn format(&self) -> Option<&str> {
        self.extract.as_ref().and_then(|e| e.format.as_deref())
    }

    /// Model ids and limits, falling back to the library defaults.
    pub fn llm_options(&self) -> LlmOptions {
        let gateway = self.gateway_section();
        let defaults = LlmOptions::default();
        LlmOptions {
            table_model: gateway.table_model.unwrap_or(defaults.table_model),
            record_model: gateway.record_model.unwrap_or(defaults.record_model),
            max_tokens: gateway.max_tokens.unwrap_or(defaults.max_tokens),
            ..defaults
        }
    }

    /// Gateway settings, or `None` when no API key is configured.
    pub fn gateway_config(&self) -> Option<GatewayConfig> {
        let gateway = self.gateway_section();
        let api_key = gateway.api_key.filter(|key| !key.trim().is_empty())?;
        Some(
            GatewayConfig::new(api_key)
                .with_url(gateway.url.unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())),
        )
    }

    /// Copy with the API key masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if let Some(key) = shown.gateway.as_mut().and_then(|g| g.api_key.as_mut()) {
            *key = "********".to_string();
        }
        shown
    }
}

/// Values taken from the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub hint: Option<String>,
    pub format: Option<String>,
}

impl Overrides {
    /// The flag wins over `TABEX_API_KEY`.
    pub fn resolve_api_key(flag: Option<String>, env: Option<String>) -> Option<String> {
        flag.or(env).filter(|key| !key.trim().is_empty())
    }
}
