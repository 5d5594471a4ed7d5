//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks timeouts, retry invariants, pool size, server paths and logging level
//! - Credentials are validated separately, see [`validate_credentials`]

use tracing::{error, info};

use crate::config::credentials::Credentials;
use crate::config::settings::{
    LoggingConfig, MetricsConfig, PoolConfig, RetryConfig, ServerConfig, ServiceConfig, TimeoutsConfig,
};
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();
    let settings = &cfg.settings;

    validate_timeouts(&settings.timeouts, &mut errors);
    validate_retry(&settings.retry, &mut errors);
    validate_pool(&settings.pool, &mut errors);
    validate_logging(&settings.logging, &mut errors);
    validate_server(&settings.server, &settings.metrics, &mut errors);

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config validation: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

/// The login URL must be an absolute http(s) URL.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), AuthError> {
    match reqwest::Url::parse(&credentials.login_url) {
        Ok(url) if url.scheme() == "https" || url.scheme() == "http" => Ok(()),
        Ok(url) => Err(AuthError::configuration(format!(
            "MS_LOGIN_URL must use http or https, got '{}'",
            url.scheme()
        ))),
        Err(e) => Err(AuthError::configuration(format!("MS_LOGIN_URL is not a valid URL: {}", e))),
    }
}

fn validate_timeouts(t: &TimeoutsConfig, errors: &mut Vec<String>) {
    for (name, value) in [
        ("connection_request_ms", t.connection_request_ms),
        ("connect_ms", t.connect_ms),
        ("read_ms", t.read_ms),
    ] {
        if value == 0 {
            errors.push(format!("settings.timeouts.{} must be > 0", name));
        }
    }
}

fn validate_retry(r: &RetryConfig, errors: &mut Vec<String>) {
    if r.attempts == 0 {
        errors.push("settings.retry.attempts must be >= 1".to_string());
    }
    if r.base_delay_ms > r.max_delay_ms {
        errors.push(format!(
            "settings.retry.base_delay_ms ({}) must be <= max_delay_ms ({})",
            r.base_delay_ms, r.max_delay_ms
        ));
    }
}

fn validate_pool(p: &PoolConfig, errors: &mut Vec<String>) {
    if p.max_connections == 0 {
        errors.push("settings.pool.max_connections must be >= 1".to_string());
    }
}

fn validate_logging(l: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&l.level.to_lowercase().as_str()) {
        errors.push(format!(
            "settings.logging.level '{}' must be one of {:?}",
            l.level, LOG_LEVELS
        ));
    }
}

fn validate_server(s: &ServerConfig, m: &MetricsConfig, errors: &mut Vec<String>) {
    if s.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if !s.token_path.starts_with('/') {
        errors.push(format!("settings.server.token_path '{}' must start with '/'", s.token_path));
    }
    if m.is_enabled {
        if !m.path.starts_with('/') {
            errors.push(format!("settings.metrics.path '{}' must start with '/'", m.path));
        }
        if m.path == s.token_path {
            errors.push(format!(
                "settings.metrics.path and settings.server.token_path collide on '{}'",
                m.path
            ));
        }
    }
}
