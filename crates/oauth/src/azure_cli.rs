//! Token from the signed-in Azure CLI session (`az login`).

use std::{process::Stdio, time::Duration};

use {
    async_trait::async_trait,
    chrono::{Local, NaiveDateTime, TimeZone},
    serde::Deserialize,
    tokio::process::Command,
    tracing::debug,
};

use crate::{
    credential::TokenCredential,
    error::{Error, Result},
    types::AccessToken,
};

const CREDENTIAL_NAME: &str = "azure_cli";

/// Runs `az account get-access-token --scope <scope> --output json`.
pub struct AzureCliCredential {
    program: String,
    tenant_id: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenOutput {
    access_token: String,
    /// Unix seconds; emitted by az 2.54+.
    #[serde(default, rename = "expires_on")]
    expires_on_unix: Option<u64>,
    /// Local time, `2024-01-01 12:00:00.000000`; older CLIs only.
    #[serde(default)]
    expires_on: Option<String>,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: "az".into(),
            tenant_id: None,
            timeout: Duration::from_secs(20),
        }
    }
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable (tests, or `az` outside `PATH`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse_output(stdout: &[u8]) -> Result<AccessToken> {
        let out: CliTokenOutput = serde_json::from_slice(stdout).map_err(|e| {
            Error::authentication(CREDENTIAL_NAME, format!("unexpected output: {e}"))
        })?;

        let expires_at = match (out.expires_on_unix, out.expires_on.as_deref()) {
            (Some(ts), _) => ts,
            (None, Some(local)) => parse_local_expiry(local).ok_or_else(|| {
                Error::authentication(CREDENTIAL_NAME, format!("unparsable expiresOn: {local}"))
            })?,
            (None, None) => {
                return Err(Error::authentication(
                    CREDENTIAL_NAME,
                    "output has no expiry",
                ));
            },
        };

        Ok(AccessToken::new(out.access_token, expires_at))
    }
}

fn parse_local_expiry(raw: &str) -> Option<u64> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    u64::try_from(local.timestamp()).ok()
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        CREDENTIAL_NAME
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["account", "get-access-token", "--output", "json", "--scope", scope]);
        if let Some(tenant) = &self.tenant_id {
            cmd.args(["--tenant", tenant.as_str()]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, scope, "requesting token from Azure CLI");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(Error::authentication(
                    CREDENTIAL_NAME,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            },
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::unavailable(
                    CREDENTIAL_NAME,
                    format!("'{}' is not installed", self.program),
                ));
            },
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.contains("az login") || stderr.contains("not logged in") {
                return Err(Error::unavailable(
                    CREDENTIAL_NAME,
                    "not logged in; run 'az login'",
                ));
            }
            return Err(Error::authentication(
                CREDENTIAL_NAME,
                stderr.lines().next().unwrap_or("az exited with an error").to_string(),
            ));
        }

        Self::parse_output(&output.stdout)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn parses_unix_expiry() {
        let token = AzureCliCredential::parse_output(
            br#"{"accessToken":"at","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tenant":"t","tokenType":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(token.token.expose_secret(), "at");
        assert_eq!(token.expires_at, 1_893_456_000);
    }

    #[test]
    fn parses_local_expiry_from_older_cli() {
        let token = AzureCliCredential::parse_output(
            br#"{"accessToken":"at","expiresOn":"2030-01-01 00:00:00.000000"}"#,
        )
        .unwrap();
        assert_eq!(
            token.expires_at,
            parse_local_expiry("2030-01-01 00:00:00.000000").unwrap()
        );
    }

    #[test]
    fn missing_expiry_is_an_error() {
        assert!(AzureCliCredential::parse_output(br#"{"accessToken":"at"}"#).is_err());
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let cred = AzureCliCredential::new().with_program("tollgate_no_such_az_binary_42");
        assert!(cred.get_token("s").await.unwrap_err().is_unavailable());
    }

    #[cfg(unix)]
    fn fake_az(dir: &std::path::Path, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("az");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_cli_and_passes_scope() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the scope back as the token so the argument order is checked.
        let program = fake_az(
            dir.path(),
            r#"echo "{\"accessToken\":\"$6\",\"expires_on\":1893456000}""#,
        );
        let cred = AzureCliCredential::new().with_program(program);
        let token = cred.get_token("api://tools/.default").await.unwrap();
        assert_eq!(token.token.expose_secret(), "api://tools/.default");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn logged_out_cli_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_az(
            dir.path(),
            "echo \"ERROR: Please run 'az login' to setup account.\" >&2; exit 1",
        );
        let cred = AzureCliCredential::new().with_program(program);
        assert!(cred.get_token("s").await.unwrap_err().is_unavailable());
    }
}
