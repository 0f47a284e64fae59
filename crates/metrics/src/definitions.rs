//! Metric name and label definitions.
//!
//! Every metric tollgate emits is named here so the set stays documented in
//! one place.

/// Tool invocation metrics
pub mod mcp {
    /// Total number of `tools/call` invocations
    pub const TOOL_CALLS_TOTAL: &str = "tollgate_mcp_tool_calls_total";
    /// Tool call failures, labelled by failure kind
    pub const TOOL_CALL_FAILURES_TOTAL: &str = "tollgate_mcp_tool_call_failures_total";
    /// End-to-end tool call duration in seconds (token + HTTP + decode)
    pub const TOOL_CALL_DURATION_SECONDS: &str = "tollgate_mcp_tool_call_duration_seconds";
    /// Requests re-sent after a 401 and a forced token refresh
    pub const UNAUTHORIZED_RETRIES_TOTAL: &str = "tollgate_mcp_unauthorized_retries_total";
    /// Tool calls rejected locally by the allow list
    pub const ALLOW_LIST_DENIALS_TOTAL: &str = "tollgate_mcp_allow_list_denials_total";
}

/// Token cache and identity chain metrics
pub mod token {
    /// Token requests served from the cache
    pub const CACHE_HITS_TOTAL: &str = "tollgate_token_cache_hits_total";
    /// Network token acquisitions through the identity chain
    pub const ACQUISITIONS_TOTAL: &str = "tollgate_token_acquisitions_total";
    /// Failed token acquisitions
    pub const ACQUISITION_FAILURES_TOTAL: &str = "tollgate_token_acquisition_failures_total";
    /// Credential attempts inside the chain, labelled by credential name
    pub const CREDENTIAL_ATTEMPTS_TOTAL: &str = "tollgate_token_credential_attempts_total";
    /// Device code flows started
    pub const DEVICE_FLOW_ATTEMPTS_TOTAL: &str = "tollgate_token_device_flow_attempts_total";
}

/// Common label keys
pub mod labels {
    pub const TOOL: &str = "tool";
    pub const KIND: &str = "kind";
    pub const CREDENTIAL: &str = "credential";
    pub const STATUS: &str = "status";
}

/// Histogram buckets
pub mod buckets {
    /// Tool calls range from a fast cache-hit round trip to a slow database query
    pub const TOOL_CALL_DURATION: [f64; 10] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0];
}
