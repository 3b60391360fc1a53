use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub analysis: Option<AnalysisConfig>,
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
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the shop owner routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared key for the `api_key` method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::ApiKey => "api_key",
        }
    }
}

/// Upload limits and retention policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    /// Largest accepted single file (inclusive).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// How long a submitted file is kept before the sweeper evicts it.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// How often the expiry sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Upper bound on a whole multipart request body.
    #[serde(default = "default_max_request")]
    pub max_request_bytes: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
            max_request_bytes: default_max_request(),
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_retention() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_max_request() -> u64 {
    512 * 1024 * 1024
}

/// Classifier provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisProvider {
    #[default]
    Gemini,
}

impl AnalysisProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisProvider::Gemini => "gemini",
        }
    }
}

/// AI content analysis configuration.
///
/// The section being present is not enough to enable the feature: an empty
/// `api_key` keeps it disabled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub provider: AnalysisProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Custom API base URL (for proxies or tests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout. Unset means the call may wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl AnalysisConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Config {
    /// Analysis config, only when a credential is actually present.
    pub fn enabled_analysis(&self) -> Option<&AnalysisConfig> {
        self.analysis.as_ref().filter(|a| a.is_enabled())
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub intake: IntakeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SanitizedAnalysisConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAnalysisConfig {
    pub provider: String,
    pub model: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
            },
            server: config.server.clone(),
            intake: config.intake.clone(),
            analysis: config.analysis.as_ref().map(|a| SanitizedAnalysisConfig {
                provider: a.provider.as_str().to_string(),
                model: a.model.clone(),
                api_key_configured: a.is_enabled(),
                timeout_secs: a.timeout_secs,
            }),
        }
    }
}
