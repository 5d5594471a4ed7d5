
/// One cached bearer token.
///
/// Built only from a successful exchange and never mutated afterwards; the
/// cache replaces the whole value on refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub access_token: String,
    pub token_type: Option<String>,
    pub issued_at: i64,  // UNIX TIMESTAMP
    pub expires_at: i64, // UNIX TIMESTAMP
}

impl TokenEntry {
    pub fn new(access_token: String, token_type: Option<String>, issued_at: i64, expires_in: u64) -> Self {
        let expires_in = i64::try_from(expires_in).unwrap_or(i64::MAX);
        Self {
            access_token,
            token_type,
            issued_at,
            expires_at: issued_at.saturating_add(expires_in),
        }
    }

    /// Seconds left until `expires_at`, never negative.
    pub fn remaining_seconds(&self, now: i64) -> u64 {
        u64::try_from(self.expires_at.saturating_sub(now)).unwrap_or(0)
    }
}
