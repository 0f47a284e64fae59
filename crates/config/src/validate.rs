//! Configuration validation.
//!
//! Two layers: raw-file checks (syntax, unknown or misspelled fields) and
//! semantic checks on a resolved [`TollgateConfig`] (required values,
//! credential sources, timeouts).

use std::{collections::HashMap, path::Path};

use secrecy::ExposeSecret;

use crate::schema::TollgateConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "required",
    /// "optional", "credential", "timeout", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "server.url"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

/// Mirrors every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        (
            "server",
            Struct(HashMap::from([
                ("url", Leaf),
                ("label", Leaf),
                ("message_path", Leaf),
                ("session_affinity", Leaf),
                ("timeout_secs", Leaf),
                ("connect_timeout_secs", Leaf),
                ("allowed_tools", Leaf),
            ])),
        ),
        (
            "auth",
            Struct(HashMap::from([
                ("scope", Leaf),
                ("tenant_id", Leaf),
                ("client_id", Leaf),
                ("client_secret", Leaf),
                ("authority_host", Leaf),
                ("access_token", Leaf),
                ("safety_margin_secs", Leaf),
                ("token_ttl_secs", Leaf),
                ("use_cli_credential", Leaf),
                ("use_device_code", Leaf),
            ])),
        ),
        (
            "agent",
            Struct(HashMap::from([
                ("project_endpoint", Leaf),
                ("model_deployment", Leaf),
                ("agent_id", Leaf),
                ("name", Leaf),
            ])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── File validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered one when
/// `path` is `None`. Only TOML files get unknown-field checks.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults and environment".into(),
            }],
            config_path: None,
        };
    };

    let is_toml = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|e| e == "toml");

    let mut result = if is_toml {
        match std::fs::read_to_string(actual_path) {
            Ok(content) => validate_toml_str(&content),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "syntax",
                    path: String::new(),
                    message: format!("failed to read config file: {e}"),
                }],
                config_path: None,
            },
        }
    } else {
        match crate::loader::load_config(actual_path) {
            Ok(_) => ValidationResult::default(),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "type-error",
                    path: String::new(),
                    message: e.to_string(),
                }],
                config_path: None,
            },
        }
    };
    result.config_path = Some(actual_path.clone());
    result
}

/// Validate a TOML string without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    if let Err(e) = toml::from_str::<TollgateConfig>(toml_str) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        });
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();

    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => {
                check_unknown_fields(child_value, child_schema, &path, diagnostics);
            },
            None => {
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            },
        }
    }
}

// ── Semantic validation ─────────────────────────────────────────────────────

/// Check a resolved config (file + environment) for values the tool client
/// and the agent runtime need.
#[must_use]
pub fn validate_config(config: &TollgateConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let mut push = |severity: Severity, category: &'static str, path: &str, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message,
        });
    };

    match config.server.endpoint() {
        None => push(
            Severity::Error,
            "required",
            "server.url",
            "not set (MCP_SERVER_URL)".into(),
        ),
        Some(Err(e)) => push(
            Severity::Error,
            "required",
            "server.url",
            format!("invalid endpoint URL: {e}"),
        ),
        Some(Ok(_)) => {},
    }

    if config.auth.scope.trim().is_empty() {
        push(
            Severity::Error,
            "required",
            "auth.scope",
            "not set (MCP_AUTH_SCOPE)".into(),
        );
    }

    if config.server.timeout_secs == 0 {
        push(
            Severity::Error,
            "timeout",
            "server.timeout_secs",
            "must be greater than zero".into(),
        );
    }

    let auth = &config.auth;
    let has_static = auth
        .access_token
        .as_ref()
        .is_some_and(|t| !t.expose_secret().is_empty());
    let partial_secret = !auth.has_client_secret()
        && (auth.tenant_id.is_some() || auth.client_id.is_some() || auth.client_secret.is_some());

    if partial_secret {
        push(
            Severity::Warning,
            "credential",
            "auth",
            "tenant_id, client_id and client_secret must all be set for the client secret credential"
                .into(),
        );
    }
    if !has_static && !auth.has_client_secret() && !auth.use_cli_credential && !auth.use_device_code
    {
        push(
            Severity::Error,
            "credential",
            "auth",
            "no credential source: set MCP_ACCESS_TOKEN, AZURE_CLIENT_SECRET, or enable use_cli_credential / use_device_code"
                .into(),
        );
    }
    if auth.use_device_code && (auth.tenant_id.is_none() || auth.client_id.is_none()) {
        push(
            Severity::Warning,
            "credential",
            "auth.use_device_code",
            "device code flow needs tenant_id and client_id".into(),
        );
    }
    if let Some(ttl) = auth.token_ttl_secs
        && ttl <= auth.safety_margin_secs
    {
        push(
            Severity::Warning,
            "timeout",
            "auth.token_ttl_secs",
            format!(
                "ttl ({ttl}s) is not above the safety margin ({}s); every call will acquire a new token",
                auth.safety_margin_secs
            ),
        );
    }

    if config.server.label.is_none() {
        push(
            Severity::Warning,
            "optional",
            "server.label",
            "not set (MCP_SERVER_LABEL)".into(),
        );
    }
    if config.agent.project_endpoint.is_none() {
        push(
            Severity::Warning,
            "optional",
            "agent.project_endpoint",
            "not set (PROJECT_ENDPOINT); required by the agent runtime".into(),
        );
    }
    if config.agent.model_deployment.is_none() {
        push(
            Severity::Warning,
            "optional",
            "agent.model_deployment",
            "not set (MODEL_DEPLOYMENT_NAME); required by the agent runtime".into(),
        );
    }
    if config.agent.agent_id.is_none() {
        push(
            Severity::Info,
            "optional",
            "agent.agent_id",
            "not set (AGENT_ID); the agent runtime will create a new agent".into(),
        );
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}
