//! The credential abstraction every identity source implements.

use std::sync::Arc;

use {async_trait::async_trait, secrecy::ExposeSecret};

use crate::{
    error::{Error, Result},
    types::{AccessToken, unix_now},
};

/// Produces bearer tokens for a scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short stable name used in logs, errors and metric labels.
    fn name(&self) -> &'static str;

    /// Acquire a new token for `scope`. Implementations do not cache; the
    /// caller owns caching.
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

pub type SharedCredential = Arc<dyn TokenCredential>;

/// A pre-issued token (e.g. `MCP_ACCESS_TOKEN`), returned as-is for any scope.
///
/// Opaque tokens carry no expiry, so one is assumed from `lifetime_secs`.
/// JWTs with an `exp` claim use that instead.
pub struct StaticTokenCredential {
    token: secrecy::Secret<String>,
    lifetime_secs: u64,
}

impl StaticTokenCredential {
    pub fn new(token: secrecy::Secret<String>) -> Self {
        Self {
            token,
            lifetime_secs: crate::types::DEFAULT_EXPIRES_IN,
        }
    }

    pub fn with_lifetime(mut self, lifetime_secs: u64) -> Self {
        self.lifetime_secs = lifetime_secs;
        self
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        let raw = self.token.expose_secret();
        if raw.trim().is_empty() {
            return Err(Error::unavailable(self.name(), "token is empty"));
        }
        let expires_at = crate::jwt::TokenClaims::decode(raw)
            .and_then(|c| c.expires_at)
            .unwrap_or_else(|| unix_now() + self.lifetime_secs);
        Ok(AccessToken::new(raw.clone(), expires_at))
    }
}
