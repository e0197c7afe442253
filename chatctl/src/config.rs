//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CHATCTL_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CHATCTL_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CHATCTL_FILES__STORAGE_DIR=/srv/files` sets the `files.storage_dir` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! CHATCTL_PORT=8080
//!
//! # Set the OpenAI provider key
//! CHATCTL_PROVIDERS__OPENAI__API_KEY="sk-..."
//!
//! # Route the plugins endpoint through Azure
//! CHATCTL_PROVIDERS__USE_AZURE_PLUGINS=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CHATCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Secret key for session JWT signing (required)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// File staging and storage configuration
    pub files: FilesConfig,
    /// Model provider configuration for the catalog aggregator and the
    /// foreign-file passthrough
    pub providers: ProvidersConfig,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session token expiry duration
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,
    /// Cookie name for the session token
    pub cookie_name: String,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(24 * 60 * 60), // 24 hours
            cookie_name: "chatctl_session".to_string(),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("http://localhost:3080").unwrap()), // Development frontend
            ],
            allow_credentials: true,
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// File staging and storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Directory where multipart uploads are staged before a storage strategy
    /// takes them over
    pub staging_dir: PathBuf,
    /// Durable storage root for the `local` strategy
    pub storage_dir: PathBuf,
    /// Keep the staged copy after a remote strategy stores the file elsewhere.
    /// Off by default; the staged copy is removed once the remote store succeeds.
    pub retain_staged: bool,
    /// Maximum accepted upload size in bytes.
    /// Set to 0 for unlimited (not recommended for production).
    /// Default: 50MB
    pub max_file_size: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("./uploads/staging"),
            storage_dir: PathBuf::from("./uploads/files"),
            retain_staged: false,
            max_file_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Model provider configuration.
///
/// The HTTP-backed catalog endpoints (`openAI`, `azureOpenAI`, `gptPlugins`)
/// and the foreign-file passthrough all resolve their base URL and API key
/// from here. The static endpoints (`google`, `anthropic`, `chatGPTBrowser`)
/// list their models directly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    /// OpenAI-compatible API used for model listing and file passthrough
    pub openai: ProviderEndpointConfig,
    /// Azure OpenAI-compatible API for the `azureOpenAI` catalog endpoint.
    /// Falls back to `openai` when not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_openai: Option<ProviderEndpointConfig>,
    /// Route the `gptPlugins` catalog fetch through Azure.
    /// Read once at startup and injected into the aggregator.
    pub use_azure_plugins: bool,
    /// Static model list for the `google` catalog endpoint
    pub google_models: Vec<String>,
    /// Static model list for the `anthropic` catalog endpoint
    pub anthropic_models: Vec<String>,
    /// Static model list for the `chatGPTBrowser` catalog endpoint
    pub chatgpt_browser_models: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderEndpointConfig::default(),
            azure_openai: None,
            use_azure_plugins: false,
            google_models: vec!["chat-bison".to_string(), "text-bison".to_string(), "codechat-bison".to_string()],
            anthropic_models: vec![
                "claude-1".to_string(),
                "claude-1-100k".to_string(),
                "claude-instant-1".to_string(),
                "claude-instant-1-100k".to_string(),
                "claude-2".to_string(),
            ],
            chatgpt_browser_models: vec!["text-davinci-002-render-sha".to_string()],
        }
    }
}

/// Connection details for one upstream provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderEndpointConfig {
    /// Base URL of the provider API
    pub base_url: Url,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Request timeout for provider calls
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProviderEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1").unwrap(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3080,
            secret_key: None,
            auth: AuthConfig::default(),
            files: FilesConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                     Please set CHATCTL_SECRET_KEY environment variable or add secret_key to config file."
                    .to_string(),
            });
        }

        if self.auth.session_timeout.as_secs() < 300 {
            // Less than 5 minutes
            return Err(Error::Internal {
                operation: "Config validation: session timeout is too short (minimum 5 minutes)".to_string(),
            });
        }

        if self.auth.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let has_wildcard = self
            .auth
            .cors
            .allowed_origins
            .iter()
            .any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.auth.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        if self.files.staging_dir.as_os_str().is_empty() || self.files.storage_dir.as_os_str().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: files.staging_dir and files.storage_dir must be set.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("CHATCTL_").split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Provider details for the `azureOpenAI` catalog endpoint,
    /// falling back to the plain OpenAI provider
    pub fn azure_provider(&self) -> &ProviderEndpointConfig {
        self.providers.azure_openai.as_ref().unwrap_or(&self.providers.openai)
    }
}
