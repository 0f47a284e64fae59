//! Interactive device authorization grant (RFC 8628) for a public client.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, token as token_metrics};

use crate::{
    credential::TokenCredential,
    error::{Context, Error, Result},
    types::{AccessToken, TokenEndpointError, TokenEndpointResponse, unix_now},
};

const CREDENTIAL_NAME: &str = "device_code";
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// What the user must do to finish signing in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodePrompt {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until `device_code` stops being accepted.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Ready-made instruction text from the identity provider.
    #[serde(default)]
    pub message: Option<String>,
}

fn default_interval() -> u64 {
    5
}

fn default_expires_in() -> u64 {
    900
}

impl DeviceCodePrompt {
    pub fn instructions(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}",
                self.verification_uri, self.user_code
            )
        })
    }
}

pub type PromptCallback = Arc<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

pub struct DeviceCodeCredential {
    tenant_id: String,
    client_id: String,
    authority_host: String,
    client: reqwest::Client,
    prompt: PromptCallback,
    /// Overrides the server-provided interval. Tests only.
    poll_interval: Option<Duration>,
}

impl DeviceCodeCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        authority_host: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            authority_host: authority_host.into(),
            client: reqwest::Client::new(),
            prompt: Arc::new(|p: &DeviceCodePrompt| eprintln!("{}", p.instructions())),
            poll_interval: None,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Replace the default stderr prompt.
    pub fn with_prompt(mut self, prompt: PromptCallback) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    fn endpoint(&self, leaf: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/{leaf}",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Ask the identity provider for a device code.
    pub async fn request_device_code(&self, scope: &str) -> Result<DeviceCodePrompt> {
        let url = self.endpoint("devicecode");
        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope)])
            .send()
            .await
            .with_context(|| format!("device code request to {url} failed"))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = serde_json::from_str::<TokenEndpointError>(&body)
                .map(|e| e.describe())
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(Error::authentication(
                CREDENTIAL_NAME,
                format!("device code request failed: {message}"),
            ));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Poll the token endpoint until the user completes sign-in, declines,
    /// or the code expires.
    pub async fn poll_for_token(&self, prompt: &DeviceCodePrompt) -> Result<AccessToken> {
        let url = self.endpoint("token");
        let deadline = Instant::now() + Duration::from_secs(prompt.expires_in);
        let mut interval = self
            .poll_interval
            .unwrap_or_else(|| Duration::from_secs(prompt.interval));

        loop {
            tokio::time::sleep(interval).await;
            if Instant::now() >= deadline {
                return Err(Error::authentication(
                    CREDENTIAL_NAME,
                    "device code expired before sign-in completed",
                ));
            }

            let resp = self
                .client
                .post(&url)
                .header("Accept", "application/json")
                .form(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", prompt.device_code.as_str()),
                ])
                .send()
                .await
                .with_context(|| format!("token poll to {url} failed"))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();

            if status.is_success() {
                let parsed: TokenEndpointResponse = serde_json::from_str(&body)?;
                return Ok(parsed.into_access_token(unix_now()));
            }

            let Ok(err) = serde_json::from_str::<TokenEndpointError>(&body) else {
                return Err(Error::authentication(
                    CREDENTIAL_NAME,
                    format!("unexpected response from token endpoint (HTTP {status})"),
                ));
            };

            match err.error.as_str() {
                "authorization_pending" => continue,
                "slow_down" => {
                    interval += Duration::from_secs(5);
                    debug!(interval_secs = interval.as_secs(), "device flow asked to slow down");
                },
                "expired_token" => {
                    return Err(Error::authentication(
                        CREDENTIAL_NAME,
                        "device code expired before sign-in completed",
                    ));
                },
                "authorization_declined" | "access_denied" => {
                    return Err(Error::authentication(CREDENTIAL_NAME, "sign-in was declined"));
                },
                _ => return Err(Error::authentication(CREDENTIAL_NAME, err.describe())),
            }
        }
    }
}

#[async_trait]
impl TokenCredential for DeviceCodeCredential {
    fn name(&self) -> &'static str {
        CREDENTIAL_NAME
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        #[cfg(feature = "metrics")]
        counter!(token_metrics::DEVICE_FLOW_ATTEMPTS_TOTAL).increment(1);

        let prompt = self.request_device_code(scope).await?;
        info!(
            verification_uri = %prompt.verification_uri,
            expires_in = prompt.expires_in,
            "waiting for device code sign-in"
        );
        (self.prompt)(&prompt);
        self.poll_for_token(&prompt).await
    }
}
