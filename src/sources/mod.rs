use std::future::Future;

use crate::error::AuthError;

pub mod oauth2;

/// Raw answer of the token endpoint. Parsing happens in the cache layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResult {
    pub status: u16,
    pub body: String,
}

/// One round trip to the identity provider.
///
/// Implementations never retry; a failed exchange is reported once.
pub trait TokenExchanger: Send + Sync + 'static {
    fn exchange(&self) -> impl Future<Output = Result<ExchangeResult, AuthError>> + Send;
}
