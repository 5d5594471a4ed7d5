pub mod token_validator;

use std::sync::Arc;

use crate::config::settings::{CacheConfig, ValidationMode};
use token_validator::{ExpiryValidator, JwtExpiryValidator, TokenValidator};

/// Build the validator selected in settings.
pub fn build_validator(cache: &CacheConfig) -> Arc<dyn TokenValidator> {
    match cache.validation {
        ValidationMode::Expiry => Arc::new(ExpiryValidator::new(cache.safety_margin_seconds)),
        ValidationMode::Jwt => Arc::new(JwtExpiryValidator::new(cache.safety_margin_seconds)),
    }
}
