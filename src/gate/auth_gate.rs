use std::sync::Arc;

use tracing::info;

use crate::cache::token::TokenEntry;
use crate::cache::token_cache::TokenCache;
use crate::config::credentials::Credentials;
use crate::config::settings::SettingsConfig;
use crate::config::validator::validate_credentials;
use crate::error::AuthError;
use crate::helpers::time::SystemClock;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::oauth2::OAuth2Exchanger;
use crate::sources::TokenExchanger;
use crate::validator::build_validator;

/// Consumer-facing entry point. Holds no state besides the cache handle.
pub struct AuthGate<E> {
    cache: TokenCache<E>,
}

impl<E> Clone for AuthGate<E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<E: TokenExchanger> AuthGate<E> {
    pub fn new(cache: TokenCache<E>) -> Self {
        Self { cache }
    }

    pub async fn current_bearer_token(&self) -> Result<String, AuthError> {
        self.current_entry().await.map(|entry| entry.access_token.clone())
    }

    /// `Bearer <token>`, ready for an `Authorization` header.
    pub async fn authorization_header(&self) -> Result<String, AuthError> {
        self.current_bearer_token().await.map(|token| format!("Bearer {}", token))
    }

    pub(crate) async fn current_entry(&self) -> Result<Arc<TokenEntry>, AuthError> {
        let result = self.cache.get_entry().await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.reason(),
        };
        get_metrics().await.bearer_requests.with_label_values(&[outcome]).inc();
        result
    }

    pub fn cache(&self) -> &TokenCache<E> {
        &self.cache
    }
}

impl AuthGate<OAuth2Exchanger> {
    /// Wire the production gate from `MS_*` environment variables.
    pub fn from_env(settings: &SettingsConfig) -> Result<Self, AuthError> {
        Self::from_credentials(Credentials::from_env()?, settings)
    }

    /// Credentials → exchanger → cache → gate.
    pub fn from_credentials(credentials: Credentials, settings: &SettingsConfig) -> Result<Self, AuthError> {
        validate_credentials(&credentials)?;
        info!(
            login_url = %credentials.login_url,
            client_id = %credentials.client_id,
            tenant_id = %credentials.tenant_id,
            "configuring client-credentials exchange"
        );

        let exchanger = OAuth2Exchanger::new(credentials, &settings.timeouts, &settings.pool)?;
        let cache = TokenCache::with_parts(
            exchanger,
            build_validator(&settings.cache),
            Arc::new(SystemClock),
            RetrySettings::from(&settings.retry),
        );
        Ok(Self::new(cache))
    }
}
