//! Default configuration template with every option documented.

/// Config template written by `tollgate init`.
pub fn default_config_template() -> String {
    format!(
        r##"# Tollgate Configuration
# ======================
# Every value can also come from the environment (see the variable named next
# to each option); environment values win over this file.
#
# Environment variable substitution is supported: ${{ENV_VAR}} or ${{ENV_VAR:-fallback}}
# Example: client_secret = "${{AZURE_CLIENT_SECRET}}"

# ══════════════════════════════════════════════════════════════════════════════
# REMOTE TOOL SERVER
# ══════════════════════════════════════════════════════════════════════════════

[server]
# url = "https://mcp.example.net"   # MCP_SERVER_URL
# label = "sql-tools"               # MCP_SERVER_LABEL
message_path = "message"            # MCP_MESSAGE_PATH, appended to url ("" = post to url)
session_affinity = true             # MCP_SESSION_AFFINITY, adds ?sessionId=<uuid> per call
timeout_secs = 30                   # MCP_TIMEOUT_SECS, whole-request timeout
connect_timeout_secs = 10
allowed_tools = []                  # MCP_ALLOWED_TOOLS (comma-separated), [] = all tools

# ══════════════════════════════════════════════════════════════════════════════
# IDENTITY
# ══════════════════════════════════════════════════════════════════════════════
# Credentials are tried in order: access_token, client secret, Azure CLI,
# device code. The first one that yields a token wins.

[auth]
scope = "{scope}"   # MCP_AUTH_SCOPE
# tenant_id = "..."                 # AZURE_TENANT_ID
# client_id = "..."                 # AZURE_CLIENT_ID
# client_secret = "${{AZURE_CLIENT_SECRET}}"
authority_host = "{authority}"   # AZURE_AUTHORITY_HOST
# access_token = "..."              # MCP_ACCESS_TOKEN, pre-issued bearer token
safety_margin_secs = 300            # refresh this long before expiry
# token_ttl_secs = 1800             # MCP_TOKEN_TTL_SECS, cap on cached token lifetime
use_cli_credential = true           # fall back to `az account get-access-token`
use_device_code = false             # fall back to an interactive device code prompt

# ══════════════════════════════════════════════════════════════════════════════
# AGENT RUNTIME
# ══════════════════════════════════════════════════════════════════════════════

[agent]
# project_endpoint = "https://..."  # PROJECT_ENDPOINT
# model_deployment = "gpt-4o"       # MODEL_DEPLOYMENT_NAME
# agent_id = "asst_..."             # AGENT_ID, reuse instead of creating a new agent
name = "tollgate-agent"
"##,
        scope = crate::schema::DEFAULT_AUTH_SCOPE,
        authority = crate::schema::DEFAULT_AUTHORITY_HOST,
    )
}
