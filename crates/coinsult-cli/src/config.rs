//! Configuration file support

use anyhow::{Context, bail};
use coinsult_ai::{ModelConfig, Provider, client::ClientSettings, providers::gigachat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use coinsult_agent::service::DEFAULT_TIMEOUT_SECS;

/// Configuration for coinsult
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider (gigachat, openai, openrouter, ollama, custom)
    pub provider: Option<String>,
    /// Model id
    pub model: Option<String>,
    /// Chat-completions base URL override
    pub base_url: Option<String>,
    /// End-to-end deadline per question, in seconds
    pub timeout_seconds: Option<f64>,
    /// Log every graph step
    pub debug_nodes: Option<bool>,
    pub gigachat: GigaChatSection,
    /// API keys (alternative to environment variables)
    pub api_keys: ApiKeys,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GigaChatSection {
    pub credentials: Option<String>,
    pub scope: Option<String>,
    pub verify_ssl_certs: Option<bool>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub openrouter: Option<String>,
    pub custom: Option<String>,
    pub news: Option<String>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<f64>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientSettings,
    pub news_api_key: Option<String>,
    pub timeout: Duration,
    pub debug_nodes: bool,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coinsult")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("COINSULT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            provider: Some("gigachat".to_string()),
            model: Some(Provider::GigaChat.default_model().to_string()),
            timeout_seconds: Some(DEFAULT_TIMEOUT_SECS as f64),
            debug_nodes: Some(false),
            gigachat: GigaChatSection {
                credentials: None,
                scope: Some(gigachat::DEFAULT_SCOPE.to_string()),
                verify_ssl_certs: Some(true),
            },
            ..Config::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// Merge file values with the environment and command line.
    ///
    /// Precedence: command line, then environment, then file, then defaults.
    pub fn resolve(
        &self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Settings> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider_name = overrides
            .provider
            .clone()
            .or_else(|| self.provider.clone())
            .unwrap_or_else(|| "gigachat".to_string());
        let Some(provider) = Provider::parse(&provider_name) else {
            bail!(
                "unknown provider '{}' (expected gigachat, openai, openrouter, ollama or custom)",
                provider_name
            );
        };

        let mut model = ModelConfig::for_provider(provider);
        let env_model = match provider {
            Provider::GigaChat => env("GIGACHAT_MODEL"),
            _ => None,
        };
        if let Some(id) = overrides.model.clone().or(env_model).or_else(|| self.model.clone()) {
            model.id = id;
        }
        if let Some(url) = overrides.base_url.clone().or_else(|| self.base_url.clone()) {
            model.base_url = url;
        }
        if model.id.trim().is_empty() {
            bail!("no model configured for provider {}", provider.name());
        }
        if model.base_url.trim().is_empty() {
            bail!("no base URL configured for provider {}", provider.name());
        }

        let file_key = match provider {
            Provider::GigaChat => self.gigachat.credentials.clone(),
            Provider::OpenAI => self.api_keys.openai.clone(),
            Provider::OpenRouter => self.api_keys.openrouter.clone(),
            Provider::Ollama | Provider::Custom => self.api_keys.custom.clone(),
        };
        let api_key = provider.api_key_env_var().and_then(&env).or(file_key);

        let scope = env("GIGACHAT_SCOPE")
            .or_else(|| self.gigachat.scope.clone())
            .unwrap_or_else(|| gigachat::DEFAULT_SCOPE.to_string());
        let verify_ssl = match env("GIGACHAT_VERIFY_SSL_CERTS") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("invalid GIGACHAT_VERIFY_SSL_CERTS value '{raw}'"))?,
            None => self.gigachat.verify_ssl_certs.unwrap_or(true),
        };

        let timeout_seconds = match overrides.timeout_seconds {
            Some(secs) => secs,
            None => match env("GRAPH_TIMEOUT_SECONDS") {
                Some(raw) => raw
                    .parse::<f64>()
                    .with_context(|| format!("invalid GRAPH_TIMEOUT_SECONDS value '{raw}'"))?,
                None => self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS as f64),
            },
        };
        if !timeout_seconds.is_finite() || timeout_seconds <= 0.0 {
            bail!("timeout must be a positive number of seconds, got {timeout_seconds}");
        }
        let timeout = Duration::try_from_secs_f64(timeout_seconds)
            .with_context(|| format!("timeout of {timeout_seconds} seconds is too large"))?;

        let debug_nodes = match env("GRAPH_DEBUG_NODES") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("invalid GRAPH_DEBUG_NODES value '{raw}'"))?,
            None => self.debug_nodes.unwrap_or(false),
        };

        Ok(Settings {
            client: ClientSettings {
                model,
                api_key,
                scope,
                verify_ssl,
            },
            news_api_key: env("NEWS_API_KEY").or_else(|| self.api_keys.news.clone()),
            timeout,
            debug_nodes,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# coinsult configuration file
# Place at ~/.config/coinsult/config.toml (Linux/Mac) or %APPDATA%\coinsult\config.toml (Windows)

# Provider (gigachat, openai, openrouter, ollama, custom)
provider = "gigachat"

# Model id
model = "GigaChat-2-Max"

# Chat-completions base URL (required for the custom provider)
# base_url = "http://localhost:8000/v1"

# End-to-end deadline per question, in seconds
timeout_seconds = 30

# Log every graph step
debug_nodes = false

[gigachat]
# Authorization key; prefer the GIGACHAT_CREDENTIALS environment variable
# credentials = "..."
scope = "GIGACHAT_API_B2B"
verify_ssl_certs = true

# API keys (optional - can also use environment variables)
[api_keys]
# openai = "sk-..."
# openrouter = "sk-or-..."
# news = "..."
"#
}
