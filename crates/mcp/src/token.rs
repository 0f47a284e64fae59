//! Cached bearer token for the tool server scope.
//!
//! One [`TokenProvider`] is shared (via `Arc`) by every client that talks to
//! the same server. The cache check and the refresh run under one async
//! mutex, so callers racing on an expired token trigger a single
//! acquisition and all receive its result.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use {
    secrecy::{ExposeSecret, Secret},
    tokio::sync::Mutex,
    tollgate_config::AuthConfig,
    tollgate_oauth::{SharedCredential, unix_now},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, token as token_metrics};

/// Refresh this long before the reported expiry.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct CachedToken {
    pub value: Secret<String>,
    /// Unix seconds.
    pub expires_at: u64,
}

impl CachedToken {
    /// Usable at `now` when it stays valid for longer than `margin`.
    fn is_fresh(&self, now: u64, margin: Duration) -> bool {
        now < self.expires_at.saturating_sub(margin.as_secs())
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct TokenProvider {
    credential: SharedCredential,
    scope: String,
    safety_margin: Duration,
    ttl: Option<Duration>,
    cache: Mutex<Option<CachedToken>>,
    acquisitions: AtomicU64,
}

impl TokenProvider {
    pub fn new(credential: SharedCredential, scope: impl Into<String>) -> Self {
        Self {
            credential,
            scope: scope.into(),
            safety_margin: DEFAULT_SAFETY_MARGIN,
            ttl: None,
            cache: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Scope, margin and TTL from `[auth]`.
    pub fn from_config(credential: SharedCredential, auth: &AuthConfig) -> Self {
        Self::new(credential, auth.scope.clone())
            .with_safety_margin(Duration::from_secs(auth.safety_margin_secs))
            .with_ttl(auth.token_ttl_secs.map(Duration::from_secs))
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Never trust a token for longer than `ttl`, whatever it reports.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn credential_name(&self) -> &'static str {
        self.credential.name()
    }

    /// Number of times the identity chain has been asked for a token.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Bearer token for the configured scope, from cache when still fresh.
    pub async fn get_token(&self) -> tollgate_oauth::Result<Secret<String>> {
        Ok(self.get_cached_token().await?.value)
    }

    /// Like [`get_token`](Self::get_token) but also returns the expiry.
    pub async fn get_cached_token(&self) -> tollgate_oauth::Result<CachedToken> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.is_fresh(unix_now(), self.safety_margin)
        {
            #[cfg(feature = "metrics")]
            counter!(token_metrics::CACHE_HITS_TOTAL).increment(1);
            return Ok(cached.clone());
        }
        self.refresh_locked(&mut cache).await
    }

    /// Called after the server rejected `stale`. Acquires a new token unless
    /// another caller already replaced `stale` with a fresh one.
    pub async fn force_refresh(
        &self,
        stale: &Secret<String>,
    ) -> tollgate_oauth::Result<Secret<String>> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.value.expose_secret() != stale.expose_secret()
            && cached.is_fresh(unix_now(), self.safety_margin)
        {
            debug!("token already refreshed by a concurrent caller");
            return Ok(cached.value.clone());
        }
        Ok(self.refresh_locked(&mut cache).await?.value)
    }

    /// Drop the cached token; the next call acquires a new one.
    pub async fn reset(&self) {
        *self.cache.lock().await = None;
    }

    async fn refresh_locked(
        &self,
        cache: &mut Option<CachedToken>,
    ) -> tollgate_oauth::Result<CachedToken> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        #[cfg(feature = "metrics")]
        counter!(token_metrics::ACQUISITIONS_TOTAL).increment(1);

        debug!(scope = %self.scope, credential = self.credential.name(), "acquiring token");
        let token = match self.credential.get_token(&self.scope).await {
            Ok(token) => token,
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(token_metrics::ACQUISITION_FAILURES_TOTAL).increment(1);
                warn!(scope = %self.scope, error = %e, "token acquisition failed");
                // A failed refresh must not leave an expired token behind.
                *cache = None;
                return Err(e);
            },
        };

        let now = unix_now();
        let expires_at = match self.ttl {
            Some(ttl) => token.expires_at.min(now + ttl.as_secs()),
            None => token.expires_at,
        };
        if expires_at.saturating_sub(self.safety_margin.as_secs()) <= now {
            warn!(
                expires_in = expires_at.saturating_sub(now),
                margin_secs = self.safety_margin.as_secs(),
                "acquired token expires inside the safety margin"
            );
        }
        info!(expires_in = expires_at.saturating_sub(now), "token acquired");

        let fresh = CachedToken {
            value: token.token,
            expires_at,
        };
        *cache = Some(fresh.clone());
        Ok(fresh)
    }
}
