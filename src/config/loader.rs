use std::sync::OnceLock;
use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::settings::ServiceConfig;
use crate::config::validator;
use crate::observability::metrics::get_metrics;

/// Load settings from `path`, or defaults when no file is given.
pub async fn load(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => file_to_config(path).await,
        None => {
            let config = ServiceConfig::default();
            validate(&config).await?;
            Ok(config)
        }
    }
}

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_validation_errors.inc();
        })
        .map_err(|e| anyhow!("Invalid config format: {}", e))?;

    debug!("validation config ...");
    validate(&service_config).await?;

    Ok(service_config)
}

async fn validate(service_config: &ServiceConfig) -> Result<()> {
    validator::validate_service_config(service_config)
        .await
        .map_err(|errors| anyhow!("invalid configuration:\n  - {}", errors.join("\n  - ")))
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_REF: OnceLock<Regex> = OnceLock::new();
    let re = ENV_REF.get_or_init(|| {
        Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static env pattern is valid")
    });
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
