use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::TollgateConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "tollgate.toml",
    "tollgate.yaml",
    "tollgate.yml",
    "tollgate.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<TollgateConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./tollgate.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/tollgate/tollgate.{toml,yaml,yml,json}` (user-global)
///
/// Returns `TollgateConfig::default()` if no config file is found.
pub fn discover_and_load() -> TollgateConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    TollgateConfig::default()
}

/// Load from an explicit path if given, otherwise discover, then apply
/// environment overrides from the process environment.
pub fn load(explicit: Option<&Path>) -> Result<TollgateConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/tollgate/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tollgate").map(|d| d.config_dir().to_path_buf())
}

/// Overlay environment variables onto a loaded config.
///
/// Empty values are ignored. Unparsable numeric or boolean values are logged
/// and ignored.
pub fn apply_env_overrides(config: &mut TollgateConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("MCP_SERVER_URL") {
        config.server.url = Some(v);
    }
    if let Some(v) = get("MCP_SERVER_LABEL") {
        config.server.label = Some(v);
    }
    if let Some(v) = get("MCP_MESSAGE_PATH") {
        config.server.message_path = v;
    }
    if let Some(v) = get("MCP_SESSION_AFFINITY") {
        match parse_bool(&v) {
            Some(b) => config.server.session_affinity = b,
            None => warn!(value = %v, "ignoring invalid MCP_SESSION_AFFINITY"),
        }
    }
    if let Some(v) = get("MCP_TIMEOUT_SECS") {
        match v.trim().parse() {
            Ok(secs) => config.server.timeout_secs = secs,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid MCP_TIMEOUT_SECS"),
        }
    }
    if let Some(v) = get("MCP_ALLOWED_TOOLS") {
        config.server.allowed_tools = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(v) = get("MCP_AUTH_SCOPE") {
        config.auth.scope = v;
    }
    if let Some(v) = get("MCP_ACCESS_TOKEN") {
        config.auth.access_token = Some(Secret::new(v));
    }
    if let Some(v) = get("MCP_TOKEN_TTL_SECS") {
        match v.trim().parse() {
            Ok(secs) => config.auth.token_ttl_secs = Some(secs),
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid MCP_TOKEN_TTL_SECS"),
        }
    }
    if let Some(v) = get("AZURE_TENANT_ID") {
        config.auth.tenant_id = Some(v);
    }
    if let Some(v) = get("AZURE_CLIENT_ID") {
        config.auth.client_id = Some(v);
    }
    if let Some(v) = get("AZURE_CLIENT_SECRET") {
        config.auth.client_secret = Some(Secret::new(v));
    }
    if let Some(v) = get("AZURE_AUTHORITY_HOST") {
        config.auth.authority_host = v;
    }

    if let Some(v) = get("PROJECT_ENDPOINT") {
        config.agent.project_endpoint = Some(v);
    }
    if let Some(v) = get("MODEL_DEPLOYMENT_NAME") {
        config.agent.model_deployment = Some(v);
    }
    if let Some(v) = get("AGENT_ID") {
        config.agent.agent_id = Some(v);
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<TollgateConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}
