//! Authenticated MCP tool invocation over HTTP.
//!
//! - JSON-RPC 2.0 and MCP `tools/*` types (`types`)
//! - Cached, single-flight bearer token provider (`token`)
//! - Tool client with 401 refresh-and-retry and response classification (`client`)
//! - Client-side tool allow list (`allowlist`)
//! - `ToolInvoker` trait for agent runtimes (`traits`)

pub mod allowlist;
pub mod client;
pub mod error;
pub mod result;
pub mod token;
pub mod traits;
pub mod types;

pub use {
    allowlist::ToolAllowList,
    client::{ToolClient, ToolClientConfig, next_request_id},
    error::{Error, Result},
    result::{FailureKind, ToolCallFailure, ToolCallResult},
    token::{CachedToken, DEFAULT_SAFETY_MARGIN, TokenProvider},
    traits::ToolInvoker,
    types::McpToolDef,
};
