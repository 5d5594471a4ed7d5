use crate::cache::token::TokenEntry;
use crate::parser::parser::decode_jwt_claims;
use tracing::debug;

/// Decides whether a cached entry may be handed out again.
///
/// Implementations are pure: no I/O, no errors. Anything they cannot read is
/// reported as invalid.
pub trait TokenValidator: Send + Sync + 'static {
    fn is_valid(&self, entry: Option<&TokenEntry>, now: i64) -> bool;
}

/// Trusts `expires_at` from the exchange (`expires_in`), minus a safety margin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryValidator {
    pub safety_margin_seconds: u64,
}

impl ExpiryValidator {
    pub fn new(safety_margin_seconds: u64) -> Self {
        Self { safety_margin_seconds }
    }
}

impl TokenValidator for ExpiryValidator {
    fn is_valid(&self, entry: Option<&TokenEntry>, now: i64) -> bool {
        match entry {
            Some(entry) => now < refresh_deadline(entry.expires_at, self.safety_margin_seconds),
            None => false,
        }
    }
}

/// Same as [`ExpiryValidator`], and the access token must also be a JWT whose
/// own `exp` claim is still in the future.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtExpiryValidator {
    pub safety_margin_seconds: u64,
}

impl JwtExpiryValidator {
    pub fn new(safety_margin_seconds: u64) -> Self {
        Self { safety_margin_seconds }
    }
}

impl TokenValidator for JwtExpiryValidator {
    fn is_valid(&self, entry: Option<&TokenEntry>, now: i64) -> bool {
        let Some(entry) = entry else {
            return false;
        };
        if now >= refresh_deadline(entry.expires_at, self.safety_margin_seconds) {
            return false;
        }
        match decode_jwt_claims(&entry.access_token) {
            Ok(claims) => now < refresh_deadline(claims.exp, self.safety_margin_seconds),
            Err(e) => {
                debug!(error = %e, "cached token is not a readable JWT");
                false
            }
        }
    }
}

/// Raw-string check: `true` iff `token` is a JWT whose `exp` is strictly after `now`.
pub fn jwt_is_valid(token: Option<&str>, now: i64) -> bool {
    token
        .and_then(|t| decode_jwt_claims(t).ok())
        .map(|claims| now < claims.exp)
        .unwrap_or(false)
}

fn refresh_deadline(expires_at: i64, safety_margin_seconds: u64) -> i64 {
    expires_at.saturating_sub(i64::try_from(safety_margin_seconds).unwrap_or(i64::MAX))
}
