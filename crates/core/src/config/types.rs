use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub distiller: DistillerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("alembic.db")
}

/// Available AI providers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistillerProvider {
    Anthropic,
    Ollama,
}

/// AI provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistillerConfig {
    /// Which provider to use
    pub provider: DistillerProvider,
    /// Model name (e.g. "claude-3-haiku-20240307", "llama3")
    pub model: String,
    /// API key (required for anthropic, unused for ollama)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override the provider base URL (e.g. a local Ollama on another host)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Cap on input characters sent to the provider
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_max_input_chars() -> usize {
    5000
}

/// Extractor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_extractor_timeout")]
    pub timeout_secs: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extractor_timeout(),
        }
    }
}

fn default_extractor_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub distiller: SanitizedDistillerConfig,
    pub extractor: ExtractorConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized distiller config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDistillerConfig {
    pub provider: DistillerProvider,
    pub model: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub max_input_chars: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            distiller: SanitizedDistillerConfig {
                provider: config.distiller.provider,
                model: config.distiller.model.clone(),
                api_key_configured: config.distiller.api_key.is_some(),
                api_base: config.distiller.api_base.clone(),
                max_input_chars: config.distiller.max_input_chars,
            },
            extractor: config.extractor.clone(),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
