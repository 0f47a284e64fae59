//! Ordered identity chain: the first credential that can produce a token wins.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tollgate_config::AuthConfig,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, labels, token as token_metrics};

use crate::{
    azure_cli::AzureCliCredential,
    credential::{SharedCredential, StaticTokenCredential, TokenCredential},
    device_code::DeviceCodeCredential,
    environment::EnvironmentCredential,
    error::{Error, Result},
    types::AccessToken,
};

/// Tries each credential in order.
///
/// A credential reporting [`Error::CredentialUnavailable`] hands over to the
/// next one. Any other error stops the chain: a configured secret that the
/// identity provider rejects should surface, not be masked by a CLI login.
pub struct ChainedCredential {
    sources: Vec<SharedCredential>,
}

impl ChainedCredential {
    pub fn new(sources: Vec<SharedCredential>) -> Self {
        Self { sources }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut skipped = Vec::new();

        for source in &self.sources {
            let name = source.name();
            debug!(credential = name, scope, "trying credential");

            match source.get_token(scope).await {
                Ok(token) => {
                    #[cfg(feature = "metrics")]
                    counter!(
                        token_metrics::CREDENTIAL_ATTEMPTS_TOTAL,
                        labels::CREDENTIAL => name,
                        labels::STATUS => "success"
                    )
                    .increment(1);
                    info!(credential = name, expires_at = token.expires_at, "acquired token");
                    return Ok(token);
                },
                Err(e) if e.is_unavailable() => {
                    #[cfg(feature = "metrics")]
                    counter!(
                        token_metrics::CREDENTIAL_ATTEMPTS_TOTAL,
                        labels::CREDENTIAL => name,
                        labels::STATUS => "unavailable"
                    )
                    .increment(1);
                    debug!(credential = name, reason = %e, "credential unavailable");
                    skipped.push(e.to_string());
                },
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(
                        token_metrics::CREDENTIAL_ATTEMPTS_TOTAL,
                        labels::CREDENTIAL => name,
                        labels::STATUS => "error"
                    )
                    .increment(1);
                    warn!(credential = name, error = %e, "credential failed");
                    return Err(e);
                },
            }
        }

        let reason = if skipped.is_empty() {
            "no credentials configured".to_string()
        } else {
            skipped.join("; ")
        };
        Err(Error::unavailable(self.name(), reason))
    }
}

/// Build the chain described by `auth`:
/// static token, then client secret, then Azure CLI, then device code.
pub fn default_chain(auth: &AuthConfig, client: reqwest::Client) -> ChainedCredential {
    let mut sources: Vec<SharedCredential> = Vec::new();

    if let Some(token) = &auth.access_token {
        let mut cred = StaticTokenCredential::new(token.clone());
        if let Some(ttl) = auth.token_ttl_secs {
            cred = cred.with_lifetime(ttl);
        }
        sources.push(Arc::new(cred));
    }

    let environment = EnvironmentCredential::from_config(auth, client.clone());
    if environment.is_configured() {
        sources.push(Arc::new(environment));
    }

    if auth.use_cli_credential {
        sources.push(Arc::new(
            AzureCliCredential::new().with_tenant(auth.tenant_id.clone()),
        ));
    }

    if auth.use_device_code
        && let (Some(tenant), Some(client_id)) = (&auth.tenant_id, &auth.client_id)
    {
        let device = DeviceCodeCredential::new(
            tenant.clone(),
            client_id.clone(),
            auth.authority_host.clone(),
        )
        .with_client(client);
        sources.push(Arc::new(device));
    }

    debug!(
        credentials = ?sources.iter().map(|c| c.name()).collect::<Vec<_>>(),
        "built identity chain"
    );
    ChainedCredential::new(sources)
}

/// Shared HTTP client for identity endpoints.
pub fn identity_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(Error::from)
}
