//! OAuth 2.0 client credentials grant against a tenant's token endpoint.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use crate::{
    credential::TokenCredential,
    error::{Context, Error, Result},
    types::{AccessToken, TokenEndpointError, TokenEndpointResponse, unix_now},
};

/// Confidential-client credential (tenant + client id + client secret).
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: Secret<String>,
    authority_host: String,
    client: reqwest::Client,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        authority_host: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
            authority_host: authority_host.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "client_secret"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let url = self.token_url();
        debug!(url = %url, scope, client_id = %self.client_id, "requesting client credentials token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("scope", scope),
        ];

        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .with_context(|| format!("token request to {url} failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read token endpoint response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenEndpointError>(&body)
                .map(|e| e.describe())
                .unwrap_or_else(|_| format!("HTTP {status}"));
            warn!(url = %url, %status, error = %message, "client credentials token request rejected");
            return Err(Error::authentication(self.name(), message));
        }

        let parsed: TokenEndpointResponse = serde_json::from_str(&body)
            .map_err(|e| Error::external("invalid token endpoint response", e))?;
        Ok(parsed.into_access_token(unix_now()))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn credential(base: &str) -> ClientSecretCredential {
        ClientSecretCredential::new("tenant-1", "client-1", Secret::new("s3cret".into()), base)
    }

    #[test]
    fn token_url_trims_authority_slash() {
        let cred = credential("https://login.example.com/");
        assert_eq!(
            cred.token_url(),
            "https://login.example.com/tenant-1/oauth2/v2.0/token"
        );
    }

    #[tokio::test]
    async fn posts_client_credentials_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded("scope".into(), "api://tools/.default".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type":"Bearer","expires_in":3599,"access_token":"at-1"}"#)
            .create_async()
            .await;

        let before = unix_now();
        let token = credential(&server.url())
            .get_token("api://tools/.default")
            .await
            .unwrap();
        assert_eq!(token.token.expose_secret(), "at-1");
        assert!(token.expires_at >= before + 3599);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_secret_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client","error_description":"bad secret"}"#)
            .create_async()
            .await;

        let err = credential(&server.url()).get_token("s").await.unwrap_err();
        assert!(!err.is_unavailable());
        assert_eq!(
            err.to_string(),
            "client_secret authentication failed: invalid_client: bad secret"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let err = credential("http://127.0.0.1:1")
            .get_token("s")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("token request to"));
    }
}
