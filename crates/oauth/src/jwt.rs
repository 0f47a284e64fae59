//! Best-effort JWT payload decoding for display and expiry hints.
//!
//! Signatures are not checked; the tool server validates tokens.

use {
    base64::{
        Engine,
        engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    },
    serde::Deserialize,
};

/// Claims the CLI shows when reporting which identity a token belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default, rename = "aud")]
    pub audience: Option<serde_json::Value>,
    #[serde(default, rename = "tid")]
    pub tenant_id: Option<String>,
    #[serde(default, rename = "oid")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub appid: Option<String>,
    #[serde(default)]
    pub scp: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, rename = "exp")]
    pub expires_at: Option<u64>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT. `None` for opaque tokens.
    pub fn decode(token: &str) -> Option<Self> {
        let payload_b64 = token.split('.').nth(1)?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).or_else(|_| {
            let padded = match payload_b64.len() % 4 {
                2 => format!("{payload_b64}=="),
                3 => format!("{payload_b64}="),
                _ => payload_b64.to_string(),
            };
            STANDARD.decode(padded)
        });
        serde_json::from_slice(&payload.ok()?).ok()
    }

    /// The signed-in user, or the application for app-only tokens.
    pub fn principal(&self) -> Option<&str> {
        self.upn
            .as_deref()
            .or(self.preferred_username.as_deref())
            .or(self.appid.as_deref())
            .or(self.object_id.as_deref())
    }

    /// App-only tokens carry `roles` but no delegated `scp`.
    pub fn is_app_only(&self) -> bool {
        self.scp.is_none() && self.upn.is_none() && self.preferred_username.is_none()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: serde_json::Value) -> String {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        format!("eyJhbGciOiJub25lIn0.{body}.sig")
    }

    #[test]
    fn decodes_user_token() {
        let token = jwt(serde_json::json!({
            "aud": "api://tools",
            "tid": "tenant-1",
            "oid": "user-oid",
            "upn": "jane@example.com",
            "scp": "user_impersonation",
            "exp": 1_900_000_000u64,
        }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.principal(), Some("jane@example.com"));
        assert_eq!(claims.tenant_id.as_deref(), Some("tenant-1"));
        assert_eq!(claims.expires_at, Some(1_900_000_000));
        assert!(!claims.is_app_only());
    }

    #[test]
    fn app_only_token_falls_back_to_appid() {
        let token = jwt(serde_json::json!({ "appid": "app-1", "roles": ["Tools.Read"] }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.principal(), Some("app-1"));
        assert!(claims.is_app_only());
        assert_eq!(claims.roles, vec!["Tools.Read"]);
    }

    #[test]
    fn opaque_token_is_none() {
        assert!(TokenClaims::decode("not-a-jwt").is_none());
        assert!(TokenClaims::decode("a.!!!.c").is_none());
    }
}
