use std::sync::Arc;

use thiserror::Error;

/// Shared cause, so one failed refresh can be handed to every waiter.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while acquiring a bearer token.
///
/// Every exchange-related kind is recoverable from the caller's point of view:
/// the cache stays usable and the next call starts a fresh attempt.
/// `Configuration` is raised at start-up only.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// Missing or invalid configuration. Fatal at start-up.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be assembled (bad URL, bad form parameters).
    #[error("failed to prepare authentication request: {message}")]
    RequestBuildFailure {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// No pooled connection slot or TCP/TLS connection within the configured time.
    #[error("connection establishment timeout: {message}")]
    ConnectTimeout {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// The identity provider did not answer within the read timeout.
    #[error("socket read timeout while waiting for the identity provider")]
    ReadTimeout {
        #[source]
        source: Option<Cause>,
    },

    /// Any other transport failure.
    #[error("network error during authentication: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Non-2xx answer from the token endpoint.
    #[error("authentication failed with status code: {status}")]
    UpstreamRejected { status: u16 },

    /// The 2xx body did not parse into `access_token` / `expires_in`.
    #[error("malformed token response: {message}")]
    MalformedTokenResponse {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// The refresh task ended without publishing a result (it panicked).
    #[error("token refresh aborted before completion")]
    RefreshAborted,
}

impl AuthError {
    pub fn configuration(message: impl Into<String>) -> Self {
        AuthError::Configuration(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        AuthError::MalformedTokenResponse {
            message: message.into(),
            source: None,
        }
    }

    /// Kinds worth another attempt under a retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::ConnectTimeout { .. }
            | AuthError::ReadTimeout { .. }
            | AuthError::NetworkError { .. } => true,
            AuthError::UpstreamRejected { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Low-cardinality label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration",
            AuthError::RequestBuildFailure { .. } => "request_build",
            AuthError::ConnectTimeout { .. } => "connect_timeout",
            AuthError::ReadTimeout { .. } => "read_timeout",
            AuthError::NetworkError { .. } => "network",
            AuthError::UpstreamRejected { .. } => "upstream_rejected",
            AuthError::MalformedTokenResponse { .. } => "malformed_response",
            AuthError::RefreshAborted => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn upstream_rejected_message_carries_status() {
        let err = AuthError::UpstreamRejected { status: 401 };
        assert_eq!(err.to_string(), "authentication failed with status code: 401");
        assert!(!err.is_transient());
        assert!(AuthError::UpstreamRejected { status: 503 }.is_transient());
        assert!(AuthError::UpstreamRejected { status: 429 }.is_transient());
    }

    #[test]
    fn cause_chain_is_preserved_across_clones() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow provider");
        let err = AuthError::ReadTimeout {
            source: Some(Arc::new(io)),
        };
        let cloned = err.clone();
        let source = cloned.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("slow provider"));
        assert_eq!(cloned.reason(), "read_timeout");
    }

    #[test]
    fn malformed_and_configuration_are_not_transient() {
        assert!(!AuthError::malformed("missing access_token").is_transient());
        assert!(!AuthError::configuration("MS_CLIENT_ID").is_transient());
    }
}
