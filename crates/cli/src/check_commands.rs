//! `tollgate check`: configuration, token and connectivity report.
//!
//! Prints a structured report with `[ok]`, `[warn]`, `[fail]`, `[skip]` or
//! `[info]` per item and returns an error when anything failed.

use std::{path::Path, sync::Arc};

use {
    anyhow::Result,
    secrecy::ExposeSecret,
    tollgate_config::{Severity, TollgateConfig, validate},
    tollgate_mcp::{FailureKind, TokenProvider, ToolCallResult, ToolClient, ToolClientConfig},
    tollgate_oauth::{TokenClaims, unix_now},
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Characters of the token shown in the report.
const TOKEN_PREVIEW_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Ok,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Skip => DIM,
            Self::Info => CYAN,
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }

    fn has_failures(&self) -> bool {
        self.items.iter().any(|i| i.status == Status::Fail)
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
            match item.status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub struct CheckOptions {
    pub probe_tool: String,
    pub probe_args: serde_json::Value,
    pub skip_probe: bool,
}

pub async fn handle_check(config_path: Option<&Path>, options: CheckOptions) -> Result<()> {
    eprintln!("{BOLD}tollgate check{RESET}");
    eprintln!("{BOLD}=============={RESET}\n");

    let mut sections = vec![check_config_file(config_path)];

    let config = tollgate_config::load(config_path)?;
    let settings = check_settings(&config);
    let settings_ok = !settings.has_failures();
    sections.push(settings);

    let tokens = build_token_provider(&config)?;
    let token_section = check_token(&tokens).await;
    let token_ok = !token_section.has_failures();
    sections.push(token_section);

    let probe = if options.skip_probe {
        let mut s = Section::new("Tool call");
        s.push(Status::Skip, "probe skipped (--skip-probe)");
        s
    } else if !settings_ok || !token_ok {
        let mut s = Section::new("Tool call");
        s.push(Status::Skip, "skipped because earlier checks failed");
        s
    } else {
        let client = ToolClient::new(
            ToolClientConfig::from_server_config(&config.server)?,
            Arc::clone(&tokens),
        )?;
        check_tool_call(&client, &options.probe_tool, options.probe_args).await
    };
    sections.push(probe);

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        anyhow::bail!("{errors} check(s) failed");
    }
    Ok(())
}

pub(crate) fn build_token_provider(config: &TollgateConfig) -> Result<Arc<TokenProvider>> {
    let http = tollgate_oauth::identity_http_client(std::time::Duration::from_secs(
        config.server.timeout_secs.max(1),
    ))?;
    let chain = tollgate_oauth::default_chain(&config.auth, http);
    Ok(Arc::new(TokenProvider::from_config(
        Arc::new(chain),
        &config.auth,
    )))
}

// ── 1. Config file ──────────────────────────────────────────────────────────

fn check_config_file(path: Option<&Path>) -> Section {
    let result = validate(path);
    let title = match &result.config_path {
        Some(p) => format!("Config file ({})", p.display()),
        None => "Config file".to_string(),
    };
    let mut section = Section::new(title);

    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "valid");
    }
    for d in &result.diagnostics {
        let message = if d.path.is_empty() {
            d.message.clone()
        } else {
            format!("{}: {}", d.path, d.message)
        };
        section.push(d.severity.into(), message);
    }
    section
}

// ── 2. Resolved settings ────────────────────────────────────────────────────

fn check_settings(config: &TollgateConfig) -> Section {
    let mut section = Section::new("Settings (file + environment)");

    if let Some(Ok(url)) = config.server.endpoint() {
        section.push(Status::Ok, format!("endpoint: {url}"));
    }
    if let Some(label) = &config.server.label {
        section.push(Status::Ok, format!("server label: {label}"));
    }
    section.push(Status::Ok, format!("scope: {}", config.auth.scope));
    if let Some(endpoint) = &config.agent.project_endpoint {
        section.push(Status::Ok, format!("project endpoint: {endpoint}"));
    }
    if let Some(model) = &config.agent.model_deployment {
        section.push(Status::Ok, format!("model deployment: {model}"));
    }
    if let Some(agent_id) = &config.agent.agent_id {
        section.push(Status::Ok, format!("agent id: {agent_id} (existing agent is reused)"));
    }
    if !config.server.allowed_tools.is_empty() {
        section.push(
            Status::Info,
            format!("allowed tools: {}", config.server.allowed_tools.join(", ")),
        );
    }

    for (status, message) in validate_settings(config) {
        section.push(status, message);
    }
    section
}

fn validate_settings(config: &TollgateConfig) -> Vec<(Status, String)> {
    tollgate_config::validate_config(config)
        .diagnostics
        .into_iter()
        .map(|d| (d.severity.into(), format!("{}: {}", d.path, d.message)))
        .collect()
}

// ── 3. Token ────────────────────────────────────────────────────────────────

async fn check_token(tokens: &TokenProvider) -> Section {
    let mut section = Section::new(format!("Token ({})", tokens.scope()));

    match tokens.get_cached_token().await {
        Ok(cached) => {
            let lines = describe_token(cached.value.expose_secret(), cached.expires_at, unix_now());
            for (status, line) in lines {
                section.push(status, line);
            }
        },
        Err(e) => {
            section.push(Status::Fail, format!("acquisition failed: {e}"));
            section.push(
                Status::Info,
                "sign in with 'az login', or set MCP_ACCESS_TOKEN or AZURE_TENANT_ID/AZURE_CLIENT_ID/AZURE_CLIENT_SECRET",
            );
        },
    }
    section
}

/// Report lines for an acquired token. Never includes more than a preview.
pub(crate) fn describe_token(token: &str, expires_at: u64, now: u64) -> Vec<(Status, String)> {
    let mut lines = vec![(Status::Ok, format!("acquired ({} chars)", token.len()))];

    let minutes = (expires_at as i64 - now as i64) / 60;
    let expiry_status = if minutes > 5 {
        Status::Ok
    } else {
        Status::Warn
    };
    lines.push((expiry_status, format!("expires in {minutes} minute(s)")));

    let preview: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    lines.push((Status::Info, format!("preview: {preview}...")));

    if let Some(claims) = TokenClaims::decode(token) {
        if let Some(principal) = claims.principal() {
            let kind = if claims.is_app_only() {
                "application"
            } else {
                "user"
            };
            lines.push((Status::Info, format!("{kind}: {principal}")));
        }
        if let Some(tid) = &claims.tenant_id {
            lines.push((Status::Info, format!("tenant: {tid}")));
        }
        if let Some(aud) = &claims.audience {
            let aud = aud.as_str().map(String::from).unwrap_or_else(|| aud.to_string());
            lines.push((Status::Info, format!("audience: {aud}")));
        }
    }
    lines
}

// ── 4. Probe call ───────────────────────────────────────────────────────────

async fn check_tool_call(client: &ToolClient, tool: &str, args: serde_json::Value) -> Section {
    let mut section = Section::new(format!("Tool call ({tool} @ {})", client.endpoint()));

    match client.call_tool(tool, args).await {
        ToolCallResult::Success { payload } => {
            let rendered = payload.to_string();
            let shown: String = rendered.chars().take(200).collect();
            section.push(Status::Ok, "tool call succeeded");
            section.push(Status::Info, format!("result: {shown}"));
        },
        ToolCallResult::Failure(failure) => {
            let status = failure
                .raw_status
                .map(|s| format!("HTTP {s}, "))
                .unwrap_or_default();
            section.push(
                Status::Fail,
                format!("{status}{}: {}", failure.kind, failure.message),
            );
            section.push(Status::Info, hint(failure.kind));
        },
    }
    section
}

/// What to look at next for each failure kind.
pub(crate) fn hint(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Credential => {
            "no token could be acquired; run 'az login' or configure a client secret"
        },
        FailureKind::Unauthorized => {
            "the server rejected the token; check that MCP_AUTH_SCOPE matches the server's app registration"
        },
        FailureKind::Forbidden => {
            "the token is valid but the caller lacks permission; check the user's role assignments and row-level security policies"
        },
        FailureKind::NotFound => {
            "endpoint or tool not found; check MCP_SERVER_URL, the message path and the tool name"
        },
        FailureKind::ProtocolError => {
            "the server answered with something other than MCP JSON-RPC; check that the URL points at the MCP endpoint"
        },
        FailureKind::TransportError => {
            "the server could not be reached; check network access, DNS and that the server is running"
        },
        FailureKind::ToolError => "the tool ran and reported an error; see the message above",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(Status::Ok.label(), "ok");
        assert_eq!(Status::Fail.label(), "fail");
        assert_eq!(Status::from(Severity::Warning), Status::Warn);
    }

    #[test]
    fn print_report_counts_errors_and_warnings() {
        let mut s = Section::new("x");
        s.push(Status::Ok, "a");
        s.push(Status::Fail, "b");
        s.push(Status::Warn, "c");
        s.push(Status::Warn, "d");
        assert!(s.has_failures());
        assert_eq!(print_report(&[s]), (1, 2));
    }

    #[test]
    fn missing_url_fails_settings() {
        let section = check_settings(&TollgateConfig::default());
        assert!(section.has_failures());
        assert!(
            section
                .items
                .iter()
                .any(|i| i.message.contains("MCP_SERVER_URL"))
        );
    }

    #[test]
    fn configured_settings_pass() {
        let mut config = TollgateConfig::default();
        config.server.url = Some("https://mcp.example.net".into());
        let section = check_settings(&config);
        assert!(!section.has_failures());
        assert!(
            section
                .items
                .iter()
                .any(|i| i.message == "endpoint: https://mcp.example.net/message")
        );
    }

    #[test]
    fn token_description_is_redacted() {
        let token = "abcdefghijklmnopqrstuvwxyz0123456789";
        let lines = describe_token(token, 10_000 + 3600, 10_000);
        let text: Vec<_> = lines.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(text[0], "acquired (36 chars)");
        assert_eq!(text[1], "expires in 60 minute(s)");
        assert_eq!(text[2], "preview: abcdefghijklmnopqrst...");
        assert!(!text.iter().any(|l| l.contains("uvwxyz")));
    }

    #[test]
    fn token_near_expiry_warns() {
        let lines = describe_token("t", 1_000 + 120, 1_000);
        assert_eq!(lines[1].0, Status::Warn);
    }

    #[test]
    fn every_kind_has_a_hint() {
        for kind in [
            FailureKind::Credential,
            FailureKind::Unauthorized,
            FailureKind::Forbidden,
            FailureKind::NotFound,
            FailureKind::ProtocolError,
            FailureKind::TransportError,
            FailureKind::ToolError,
        ] {
            assert!(!hint(kind).is_empty());
        }
    }
}
