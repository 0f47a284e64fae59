use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// A bearer token and the unix time (seconds) at which it expires.
#[derive(Clone)]
pub struct AccessToken {
    pub token: Secret<String>,
    pub expires_at: u64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: u64) -> Self {
        Self {
            token: Secret::new(token.into()),
            expires_at,
        }
    }

    /// Seconds until expiry relative to `now`; negative once expired.
    pub fn expires_in(&self, now: u64) -> i64 {
        self.expires_at as i64 - now as i64
    }

    /// First `n` characters of the token followed by `...`, for diagnostics.
    pub fn preview(&self, n: usize) -> String {
        let token = self.token.expose_secret();
        let head: String = token.chars().take(n).collect();
        if token.chars().count() > n {
            format!("{head}...")
        } else {
            head
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Successful response from an OAuth 2.0 token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Error body from an OAuth 2.0 token endpoint (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenEndpointError {
    pub fn describe(&self) -> String {
        match &self.error_description {
            Some(desc) => format!("{}: {}", self.error, desc.lines().next().unwrap_or(desc)),
            None => self.error.clone(),
        }
    }
}

/// Token lifetime assumed when the endpoint omits `expires_in`.
pub(crate) const DEFAULT_EXPIRES_IN: u64 = 3600;

impl TokenEndpointResponse {
    pub fn into_access_token(self, now: u64) -> AccessToken {
        AccessToken::new(
            self.access_token,
            now + self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        )
    }
}
