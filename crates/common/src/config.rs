//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Base URL of the GitHub Models inference endpoint.
pub const GITHUB_MODELS_BASE_URL: &str = "https://models.inference.ai.azure.com";

/// Base URL of the `OpenAI` API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Text generation provider configuration.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
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

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Chat-completion provider used by the AI writing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// API key. When absent, `GITHUB_TOKEN` and then `OPENAI_API_KEY` are used.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
        }
    }
}

impl GenerationConfig {
    /// Resolve the API key and base URL to use.
    ///
    /// An explicit key wins. Otherwise `GITHUB_TOKEN` selects the GitHub Models
    /// endpoint and `OPENAI_API_KEY` the `OpenAI` one. Returns `None` when no
    /// credential is available.
    #[must_use]
    pub fn resolve_credentials(&self) -> Option<(String, String)> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            let base = self
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
            return Some((key.clone(), base));
        }

        if let Some(token) = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()) {
            let base = self
                .base_url
                .clone()
                .unwrap_or_else(|| GITHUB_MODELS_BASE_URL.to_string());
            return Some((token, base));
        }

        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(|key| {
                let base = self
                    .base_url
                    .clone()
                    .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
                (key, base)
            })
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `NOVELHUB_ENV`)
    /// 4. Environment variables with `NOVELHUB_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("NOVELHUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NOVELHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("NOVELHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_explicit_key_uses_openai_base() {
        let config = GenerationConfig {
            api_key: Some("sk-test".to_string()),
            base_url: None,
            model: default_model(),
        };

        let (key, base) = config.resolve_credentials().unwrap();
        assert_eq!(key, "sk-test");
        assert_eq!(base, OPENAI_BASE_URL);
    }

    #[test]
    fn test_generation_explicit_base_url_wins() {
        let config = GenerationConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:11434/v1".to_string()),
            model: default_model(),
        };

        let (_, base) = config.resolve_credentials().unwrap();
        assert_eq!(base, "http://localhost:11434/v1");
    }

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = config::Config::builder()
            .set_override("database.url", "postgres://localhost/novelhub")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.generation.model, "gpt-4o-mini");
    }
}
