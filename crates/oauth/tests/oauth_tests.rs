#![allow(clippy::unwrap_used, clippy::expect_used)]
use {
    secrecy::{ExposeSecret, Secret},
    tollgate_config::AuthConfig,
    tollgate_oauth::{TokenClaims, TokenCredential, default_chain},
};

fn secret_auth(authority: &str) -> AuthConfig {
    AuthConfig {
        tenant_id: Some("tenant-1".into()),
        client_id: Some("client-1".into()),
        client_secret: Some(Secret::new("s3cret".into())),
        authority_host: authority.into(),
        use_cli_credential: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn chain_uses_client_secret_from_config() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tenant-1/oauth2/v2.0/token")
        .match_body(mockito::Matcher::UrlEncoded(
            "scope".into(),
            "17a97781-0078-4478-8b4e-fe5dda9e2400/.default".into(),
        ))
        .with_status(200)
        .with_body(r#"{"access_token":"chain-token","expires_in":3600}"#)
        .create_async()
        .await;

    let auth = secret_auth(&server.url());
    let chain = default_chain(&auth, reqwest::Client::new());
    let token = chain.get_token(&auth.scope).await.unwrap();
    assert_eq!(token.token.expose_secret(), "chain-token");
    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_secret_is_not_masked_by_later_credentials() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tenant-1/oauth2/v2.0/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#)
        .create_async()
        .await;

    let mut auth = secret_auth(&server.url());
    auth.use_cli_credential = true;
    let err = default_chain(&auth, reqwest::Client::new())
        .get_token(&auth.scope)
        .await
        .unwrap_err();
    assert!(!err.is_unavailable());
    assert!(err.to_string().contains("AADSTS7000215"));
}

#[tokio::test]
async fn static_token_expiry_comes_from_jwt() {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    let payload = URL_SAFE_NO_PAD.encode(r#"{"exp":1893456000,"upn":"dev@contoso.com"}"#);
    let jwt = format!("eyJhbGciOiJub25lIn0.{payload}.sig");
    let auth = AuthConfig {
        access_token: Some(Secret::new(jwt.clone())),
        use_cli_credential: false,
        ..Default::default()
    };

    let token = default_chain(&auth, reqwest::Client::new())
        .get_token(&auth.scope)
        .await
        .unwrap();
    assert_eq!(token.expires_at, 1_893_456_000);

    let claims = TokenClaims::decode(token.token.expose_secret()).unwrap();
    assert_eq!(claims.principal(), Some("dev@contoso.com"));
}
