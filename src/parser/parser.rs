use std::sync::Arc;

use anyhow::{anyhow, Result};
use base64::Engine;
use serde::{Deserialize, Deserializer};
use tracing::{debug, error};

use crate::cache::token::TokenEntry;
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;

/// Success body of the token endpoint. Extra fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(deserialize_with = "deserialize_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

// jwt token
#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    pub exp: i64,
}

/// Parse a raw token-endpoint body into a cache entry issued at `issued_at`.
pub async fn parse_token_response(body: &str, issued_at: i64) -> Result<TokenEntry, AuthError> {
    let response: TokenResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "token response parse failed");
            get_metrics().await.parse_failures.inc();
            return Err(AuthError::MalformedTokenResponse {
                message: "body is not a token response".to_owned(),
                source: Some(Arc::new(e)),
            });
        }
    };

    if response.access_token.trim().is_empty() {
        get_metrics().await.parse_failures.inc();
        return Err(AuthError::malformed("access_token is empty"));
    }

    debug!(expires_in = response.expires_in, "token response parsed successfully");
    Ok(TokenEntry::new(
        response.access_token,
        response.token_type,
        issued_at,
        response.expires_in,
    ))
}

/// Read the payload of a compact JWT without checking its signature.
pub fn decode_jwt_claims(token_string: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token_string.split('.').collect();
    let payload = match parts.as_slice() {
        [_, payload, _] if !payload.is_empty() => *payload,
        _ => return Err(anyhow!("invalid JWT format")),
    };

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| anyhow!("base64 decode error: {}", e))?;

    serde_json::from_slice::<JwtClaims>(&decoded)
        .map_err(|e| anyhow!("invalid JWT payload: {}", e))
}

/// Providers disagree on whether `expires_in` is a number or a decimal string.
fn deserialize_expires_in<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("expires_in '{}': {}", s, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn sample_jwt(exp: i64) -> String {
        // minimal unsigned JWT for tests: {"exp": exp}
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
        format!("{}.{}.sig", header, payload)
    }

    #[tokio::test]
    async fn test_parse_numeric_expires_in() {
        let body = json!({"access_token": "tok123", "expires_in": 3600, "token_type": "Bearer"}).to_string();
        let entry = parse_token_response(&body, 1_000).await.unwrap();
        assert_eq!(entry.access_token, "tok123");
        assert_eq!(entry.expires_at, 4_600);
        assert_eq!(entry.token_type.as_deref(), Some("Bearer"));
    }

    #[tokio::test]
    async fn test_parse_string_expires_in() {
        let body = r#"{"access_token":"tok","expires_in":"3599","ext_expires_in":"3599"}"#;
        let entry = parse_token_response(body, 0).await.unwrap();
        assert_eq!(entry.expires_at, 3_599);
    }

    #[tokio::test]
    async fn test_missing_fields_are_malformed() {
        for body in [
            r#"{"expires_in":3600}"#,
            r#"{"access_token":"tok"}"#,
            r#"{"access_token":"","expires_in":10}"#,
            r#"{"access_token":"tok","expires_in":"soon"}"#,
            "<html>login</html>",
        ] {
            let err = parse_token_response(body, 0).await.unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedTokenResponse { .. }),
                "body {body} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_decode_jwt_claims() {
        let claims = decode_jwt_claims(&sample_jwt(1_782_462_021)).unwrap();
        assert_eq!(claims.exp, 1_782_462_021);
    }

    #[test]
    fn test_decode_rejects_non_jwt() {
        assert!(decode_jwt_claims("tok123").is_err());
        assert!(decode_jwt_claims("a..c").is_err());
        assert!(decode_jwt_claims("a.!!!.c").is_err());
        let no_exp = format!("x.{}.y", URL_SAFE_NO_PAD.encode(r#"{"sub":"svc"}"#));
        assert!(decode_jwt_claims(&no_exp).is_err());
    }
}
