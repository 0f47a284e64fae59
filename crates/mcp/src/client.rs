//! Authenticated JSON-RPC client for a remote MCP tool server.
//!
//! Every request carries `Authorization: Bearer <token>` from the shared
//! [`TokenProvider`]. A 401 forces one token refresh and one re-send of the
//! same envelope; every other outcome is classified into a
//! [`ToolCallResult`] without retrying.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    reqwest::{Client, StatusCode},
    secrecy::{ExposeSecret, Secret},
    tollgate_config::{ServerConfig, TollgateConfig},
    tracing::{debug, info, warn},
    url::Url,
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, histogram, labels, mcp as mcp_metrics};

use crate::{
    allowlist::ToolAllowList,
    error::{Context, Error, Result},
    result::{FailureKind, ToolCallFailure, ToolCallResult, excerpt},
    token::TokenProvider,
    types::{
        JsonRpcRequest, JsonRpcResponse, METHOD_TOOLS_LIST, McpToolDef, ToolsCallResult,
        ToolsListResult, error_codes,
    },
};

const STREAMABLE_ACCEPT_HEADER: &str = "application/json, text/event-stream";
const SESSION_ID_PARAM: &str = "sessionId";

/// Correlation ids are unique across every client in the process.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct ToolClientConfig {
    /// Full JSON-RPC endpoint (base URL plus message path).
    pub endpoint: Url,
    pub label: Option<String>,
    /// Add a fresh `sessionId` query parameter to each call.
    pub session_affinity: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub allow_list: ToolAllowList,
}

impl ToolClientConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            label: None,
            session_affinity: true,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            allow_list: ToolAllowList::new(),
        }
    }

    pub fn from_server_config(server: &ServerConfig) -> Result<Self> {
        let endpoint = server.endpoint().ok_or(Error::MissingEndpoint)??;
        Ok(Self {
            endpoint,
            label: server.label.clone(),
            session_affinity: server.session_affinity,
            timeout: Duration::from_secs(server.timeout_secs),
            connect_timeout: Duration::from_secs(server.connect_timeout_secs),
            allow_list: server.allowed_tools.iter().cloned().collect(),
        })
    }
}

pub struct ToolClient {
    http: Client,
    config: ToolClientConfig,
    tokens: Arc<TokenProvider>,
}

impl ToolClient {
    pub fn new(config: ToolClientConfig, tokens: Arc<TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build HTTP client for tool server")?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    /// Client, identity chain and token provider from a loaded config.
    pub fn from_config(config: &TollgateConfig) -> Result<Self> {
        let client_config = ToolClientConfig::from_server_config(&config.server)?;
        let identity_http = tollgate_oauth::identity_http_client(client_config.timeout)?;
        let chain = tollgate_oauth::default_chain(&config.auth, identity_http);
        let tokens = TokenProvider::from_config(Arc::new(chain), &config.auth);
        Self::new(client_config, Arc::new(tokens))
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    pub fn label(&self) -> &str {
        self.config.label.as_deref().unwrap_or(self.config.endpoint.as_str())
    }

    pub fn allow_list(&self) -> &ToolAllowList {
        &self.config.allow_list
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Invoke `name` with `arguments`. Never fails; every outcome is a
    /// [`ToolCallResult`].
    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> ToolCallResult {
        let started = Instant::now();
        #[cfg(feature = "metrics")]
        counter!(mcp_metrics::TOOL_CALLS_TOTAL, labels::TOOL => name.to_string()).increment(1);

        let outcome = if self.config.allow_list.is_allowed(name) {
            let request = JsonRpcRequest::tools_call(next_request_id(), name, arguments);
            match self.rpc(&request).await {
                Ok(result) => decode_call_result(result),
                Err(failure) => Err(failure),
            }
        } else {
            #[cfg(feature = "metrics")]
            counter!(mcp_metrics::ALLOW_LIST_DENIALS_TOTAL, labels::TOOL => name.to_string())
                .increment(1);
            Err(ToolCallFailure::new(
                FailureKind::Forbidden,
                format!("tool '{name}' is not on the allow list"),
            ))
        };

        let elapsed = started.elapsed();
        #[cfg(feature = "metrics")]
        histogram!(mcp_metrics::TOOL_CALL_DURATION_SECONDS, labels::TOOL => name.to_string())
            .record(elapsed.as_secs_f64());

        match &outcome {
            Ok(_) => debug!(tool = name, ?elapsed, "tool call succeeded"),
            Err(failure) => {
                #[cfg(feature = "metrics")]
                counter!(
                    mcp_metrics::TOOL_CALL_FAILURES_TOTAL,
                    labels::TOOL => name.to_string(),
                    labels::KIND => failure.kind.as_str()
                )
                .increment(1);
                warn!(
                    tool = name,
                    kind = %failure.kind,
                    status = ?failure.raw_status,
                    error = %failure.message,
                    "tool call failed"
                );
            },
        }

        outcome.into()
    }

    /// All tools the server exposes, filtered by the allow list.
    ///
    /// A server that hands out a cursor it already returned is reported as a
    /// protocol error instead of being paged forever.
    pub async fn list_tools(&self) -> std::result::Result<Vec<McpToolDef>, ToolCallFailure> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let request = JsonRpcRequest::new(next_request_id(), METHOD_TOOLS_LIST, params);
            let result = self.rpc(&request).await?;
            let page: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                ToolCallFailure::protocol(format!("malformed tools/list result: {e}"))
            })?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen.insert(next.clone()) {
                        return Err(ToolCallFailure::protocol(format!(
                            "tools/list returned cursor '{next}' twice"
                        )));
                    }
                    cursor = Some(next);
                },
                _ => break,
            }
        }

        tools.retain(|t| self.config.allow_list.is_allowed(&t.name));
        Ok(tools)
    }

    /// One JSON-RPC exchange with the single 401 refresh-and-resend.
    /// Returns the `result` member of a well-formed success response.
    async fn rpc(
        &self,
        request: &JsonRpcRequest,
    ) -> std::result::Result<serde_json::Value, ToolCallFailure> {
        let token = self
            .tokens
            .get_token()
            .await
            .map_err(|e| ToolCallFailure::credential(&e))?;

        let url = self.request_url();
        debug!(method = %request.method, id = %request.id, url = %url, "client -> server");

        let mut response = self.post(&url, request, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            info!(
                method = %request.method,
                id = %request.id,
                url = %self.config.endpoint,
                "received 401, refreshing token and retrying once"
            );
            #[cfg(feature = "metrics")]
            counter!(mcp_metrics::UNAUTHORIZED_RETRIES_TOTAL).increment(1);

            let fresh = self
                .tokens
                .force_refresh(&token)
                .await
                .map_err(|e| ToolCallFailure::credential(&e))?;
            response = self.post(&url, request, &fresh).await?;
        }

        classify_response(request, response).await
    }

    fn request_url(&self) -> Url {
        let mut url = self.config.endpoint.clone();
        if self.config.session_affinity {
            url.query_pairs_mut()
                .append_pair(SESSION_ID_PARAM, &uuid::Uuid::new_v4().to_string());
        }
        url
    }

    async fn post(
        &self,
        url: &Url,
        request: &JsonRpcRequest,
        token: &Secret<String>,
    ) -> std::result::Result<reqwest::Response, ToolCallFailure> {
        self.http
            .post(url.clone())
            .header("Accept", STREAMABLE_ACCEPT_HEADER)
            .bearer_auth(token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| ToolCallFailure::transport(&e))
    }
}

async fn classify_response(
    request: &JsonRpcRequest,
    response: reqwest::Response,
) -> std::result::Result<serde_json::Value, ToolCallFailure> {
    let status = response.status();
    let is_event_stream = response_is_event_stream(&response);
    let body = response
        .text()
        .await
        .map_err(|e| ToolCallFailure::transport(&e))?;

    let failure = |kind: FailureKind, what: &str| {
        let mut message = what.to_string();
        if !body.trim().is_empty() {
            message.push_str(": ");
            message.push_str(&excerpt(&body));
        }
        Err(ToolCallFailure::new(kind, message).with_status(status.as_u16()))
    };

    match status {
        StatusCode::UNAUTHORIZED => {
            return failure(FailureKind::Unauthorized, "server rejected the bearer token");
        },
        StatusCode::FORBIDDEN => {
            return failure(FailureKind::Forbidden, "caller is not permitted to use this tool");
        },
        StatusCode::NOT_FOUND => return failure(FailureKind::NotFound, "endpoint not found"),
        s if !s.is_success() => {
            return failure(FailureKind::ProtocolError, &format!("unexpected HTTP status {s}"));
        },
        _ => {},
    }

    let parsed = if is_event_stream {
        parse_event_stream(&body)
    } else {
        serde_json::from_str::<JsonRpcResponse>(&body).ok()
    };
    let Some(parsed) = parsed else {
        return failure(FailureKind::ProtocolError, "malformed JSON-RPC response");
    };

    if parsed.jsonrpc != crate::types::JSONRPC_VERSION {
        return failure(
            FailureKind::ProtocolError,
            &format!("unsupported jsonrpc version '{}'", parsed.jsonrpc),
        );
    }
    if parsed.id != request.id {
        return Err(ToolCallFailure::protocol(format!(
            "response id {} does not match request id {}",
            parsed.id, request.id
        ))
        .with_status(status.as_u16()));
    }

    match (parsed.result, parsed.error) {
        (Some(result), None) => Ok(result),
        (None, Some(err)) => {
            let kind = match err.code {
                error_codes::METHOD_NOT_FOUND => FailureKind::NotFound,
                _ => FailureKind::ProtocolError,
            };
            Err(ToolCallFailure::new(kind, format!("JSON-RPC error {}: {}", err.code, err.message))
                .with_status(status.as_u16()))
        },
        (Some(_), Some(_)) => failure(
            FailureKind::ProtocolError,
            "response carries both result and error",
        ),
        (None, None) => failure(
            FailureKind::ProtocolError,
            "response carries neither result nor error",
        ),
    }
}

/// Payload of a `tools/call` result: the first text entry, as JSON when it
/// parses, otherwise as a JSON string.
fn decode_call_result(
    result: serde_json::Value,
) -> std::result::Result<serde_json::Value, ToolCallFailure> {
    let result: ToolsCallResult = serde_json::from_value(result)
        .map_err(|e| ToolCallFailure::protocol(format!("malformed tools/call result: {e}")))?;

    if result.is_error {
        let text = result.first_text().unwrap_or("tool reported an error");
        return Err(ToolCallFailure::new(FailureKind::ToolError, text));
    }

    let Some(text) = result.first_text() else {
        return Err(ToolCallFailure::protocol(
            "tools/call result has no text content",
        ));
    };

    Ok(serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string())))
}

fn response_is_event_stream(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|base| base.trim() == "text/event-stream")
        })
}

/// First JSON-RPC response carried in the `data:` lines of an event stream.
/// Notifications and server-initiated requests in the same stream are skipped.
fn parse_event_stream(body: &str) -> Option<JsonRpcResponse> {
    let mut data = String::new();

    for line in body.lines() {
        let trimmed = line.trim_end();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
            continue;
        }

        if trimmed.is_empty() && !data.is_empty() {
            if let Some(resp) = parse_response_frame(&data) {
                return Some(resp);
            }
            data.clear();
        }
    }

    if data.is_empty() {
        return None;
    }
    parse_response_frame(&data)
}

fn parse_response_frame(data: &str) -> Option<JsonRpcResponse> {
    serde_json::from_str::<JsonRpcResponse>(data)
        .ok()
        .filter(|resp| resp.result.is_some() || resp.error.is_some())
}
