//! Client secret credential resolved from configuration or the environment.

use {async_trait::async_trait, tollgate_config::AuthConfig};

use crate::{
    client_secret::ClientSecretCredential,
    credential::TokenCredential,
    error::{Error, Result},
    types::AccessToken,
};

/// Wraps a [`ClientSecretCredential`] when tenant, client id and secret are
/// all configured; otherwise reports itself unavailable so a chain moves on.
pub struct EnvironmentCredential {
    inner: Option<ClientSecretCredential>,
}

impl EnvironmentCredential {
    pub fn from_config(auth: &AuthConfig, client: reqwest::Client) -> Self {
        let inner = match (&auth.tenant_id, &auth.client_id, &auth.client_secret) {
            (Some(tenant), Some(client_id), Some(secret)) if auth.has_client_secret() => Some(
                ClientSecretCredential::new(
                    tenant.clone(),
                    client_id.clone(),
                    secret.clone(),
                    auth.authority_host.clone(),
                )
                .with_client(client),
            ),
            _ => None,
        };
        Self { inner }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        match &self.inner {
            Some(inner) => inner.get_token(scope).await,
            None => Err(Error::unavailable(
                self.name(),
                "AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are not all set",
            )),
        }
    }
}
