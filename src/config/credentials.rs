use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthError;
use crate::utils::constants::*;

/// Client-credentials profile for the Microsoft identity platform.
///
/// Read once at start-up. The secret is never printed.
#[derive(Clone)]
pub struct Credentials {
    pub login_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub tenant_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login_url", &self.login_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl Credentials {
    pub fn new(login_url: String, client_id: String, client_secret: SecretString, tenant_id: String) -> Self {
        Self {
            login_url,
            client_id,
            client_secret,
            tenant_id,
        }
    }

    /// Load `MS_LOGIN_URL`, `MS_CLIENT_ID`, `MS_CLIENT_SECRET`, `MS_TENANT_ID`.
    ///
    /// # Errors
    ///
    /// `AuthError::Configuration` naming every variable that is unset or blank.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing: Vec<&str> = Vec::new();
        let mut read = |name: &'static str| -> String {
            match lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let login_url = read(MS_LOGIN_URL_ENV);
        let client_id = read(MS_CLIENT_ID_ENV);
        let client_secret = read(MS_CLIENT_SECRET_ENV);
        let tenant_id = read(MS_TENANT_ID_ENV);

        if !missing.is_empty() {
            return Err(AuthError::configuration(format!(
                "required environment variables not configured: {}",
                missing.join(", ")
            )));
        }

        Ok(Self::new(login_url, client_id, SecretString::from(client_secret), tenant_id))
    }

    /// Form body of the client-credentials request.
    pub fn form_params(&self) -> [(&'static str, &str); 5] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("tenant", self.tenant_id.as_str()),
            ("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS),
            ("scope", GRAPH_DEFAULT_SCOPE),
        ]
    }
}
