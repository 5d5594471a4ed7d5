use serde::Deserialize;

use crate::utils::constants::*;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SettingsConfig {
    pub timeouts: TimeoutsConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

/// Exchanger timeouts, each enforced independently.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// waiting for a free connection slot
    pub connection_request_ms: u64,
    /// TCP + TLS establishment
    pub connect_ms: u64,
    /// reading the response
    pub read_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connection_request_ms: DEFAULT_CONNECTION_REQUEST_TIMEOUT_MS,
            connect_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub safety_margin_seconds: u64,
    pub validation: ValidationMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            safety_margin_seconds: DEFAULT_SAFETY_MARGIN_SECS,
            validation: ValidationMode::Expiry,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// `expires_in` from the token response
    #[default]
    Expiry,
    /// `expires_in` and the JWT `exp` claim
    Jwt,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: u64,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 1,
            base_delay_ms: 200,
            max_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub token_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            token_path: "/token".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default = "default_metrics_enabled")]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: default_metrics_enabled(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}
