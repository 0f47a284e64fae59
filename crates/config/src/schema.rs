//! Config schema types (remote tool server, identity, agent).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    url::Url,
};

/// Scope requested when none is configured: the tool server's app registration.
pub const DEFAULT_AUTH_SCOPE: &str = "17a97781-0078-4478-8b4e-fe5dda9e2400/.default";

/// Identity authority used by the client-secret and device-code credentials.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TollgateConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub agent: AgentConfig,
}

/// Remote tool server (MCP over HTTP) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the tool server, e.g. `https://mcp.example.net`.
    pub url: Option<String>,
    /// Display label for the server, used in logs and by the agent runtime.
    pub label: Option<String>,
    /// Path appended to `url` for JSON-RPC POSTs. Empty means post to `url` as-is.
    pub message_path: String,
    /// Attach a fresh `sessionId` query parameter to every call.
    pub session_affinity: bool,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Tools the client may call. Empty allows every tool.
    pub allowed_tools: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            label: None,
            message_path: "message".into(),
            session_affinity: true,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            allowed_tools: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Full JSON-RPC endpoint: `url` joined with `message_path`.
    ///
    /// Returns `None` when no URL is configured.
    pub fn endpoint(&self) -> Option<Result<Url, url::ParseError>> {
        let base = self.url.as_deref()?.trim();
        let path = self.message_path.trim_matches('/');
        let joined = if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{path}", base.trim_end_matches('/'))
        };
        Some(Url::parse(&joined))
    }
}

/// Identity chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Scope (resource + `/.default`) the bearer token is requested for.
    pub scope: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_secret: Option<Secret<String>>,
    pub authority_host: String,
    /// Pre-issued bearer token. Bypasses the identity chain when set.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<Secret<String>>,
    /// Refresh this many seconds before the reported expiry.
    pub safety_margin_secs: u64,
    /// Upper bound on how long a cached token is trusted, regardless of its
    /// reported expiry.
    pub token_ttl_secs: Option<u64>,
    /// Fall back to the Azure CLI login session.
    pub use_cli_credential: bool,
    /// Fall back to an interactive device code prompt.
    pub use_device_code: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scope: DEFAULT_AUTH_SCOPE.into(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_host: DEFAULT_AUTHORITY_HOST.into(),
            access_token: None,
            safety_margin_secs: 300,
            token_ttl_secs: None,
            use_cli_credential: true,
            use_device_code: false,
        }
    }
}

impl AuthConfig {
    /// Whether tenant, client id and secret are all present.
    pub fn has_client_secret(&self) -> bool {
        self.tenant_id.is_some()
            && self.client_id.is_some()
            && self
                .client_secret
                .as_ref()
                .is_some_and(|s| !s.expose_secret().is_empty())
    }
}

/// Agent runtime settings. Consumed by the runtime, not by the tool client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub project_endpoint: Option<String>,
    pub model_deployment: Option<String>,
    /// Existing agent to reuse. When absent the runtime creates one.
    pub agent_id: Option<String>,
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            project_endpoint: None,
            model_deployment: None,
            agent_id: None,
            name: "tollgate-agent".into(),
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
