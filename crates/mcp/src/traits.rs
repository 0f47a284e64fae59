//! Seam between the tool client and the agent runtime that consumes it.

use {async_trait::async_trait, serde_json::Value};

use crate::{
    client::ToolClient,
    result::{ToolCallFailure, ToolCallResult},
    types::McpToolDef,
};

/// Anything that can invoke tools on behalf of an agent.
///
/// `ToolClient` implements this over authenticated HTTP; tests and agent
/// runtimes can substitute their own.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Display name of the server, used as the tool source label.
    fn server_label(&self) -> &str;

    /// Tools this invoker is allowed to call.
    async fn list_tools(&self) -> Result<Vec<McpToolDef>, ToolCallFailure>;

    /// Call a tool. Failures are values, never panics or errors.
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult;
}

#[async_trait]
impl ToolInvoker for ToolClient {
    fn server_label(&self) -> &str {
        self.label()
    }

    async fn list_tools(&self) -> Result<Vec<McpToolDef>, ToolCallFailure> {
        ToolClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        ToolClient::call_tool(self, name, arguments).await
    }
}
