use std::path::Path;

use {
    anyhow::{Context, Result},
    secrecy::ExposeSecret,
    tollgate_mcp::{ToolCallResult, ToolClient, ToolInvoker},
    tollgate_oauth::unix_now,
};

use crate::check_commands::{build_token_provider, describe_token, hint};

/// Parse `--args` as a JSON object.
pub(crate) fn parse_arguments(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("--args is not valid JSON: {raw}"))?;
    anyhow::ensure!(value.is_object(), "--args must be a JSON object, got: {raw}");
    Ok(value)
}

/// `tollgate token`
pub async fn handle_token(config_path: Option<&Path>, refresh: bool) -> Result<()> {
    let config = tollgate_config::load(config_path)?;
    let tokens = build_token_provider(&config)?;

    let mut cached = tokens.get_cached_token().await?;
    if refresh {
        tokens.reset().await;
        cached = tokens.get_cached_token().await?;
    }

    println!("scope:       {}", tokens.scope());
    println!("credential:  {}", tokens.credential_name());
    println!("acquisitions: {}", tokens.acquisitions());
    for (_, line) in describe_token(cached.value.expose_secret(), cached.expires_at, unix_now()) {
        println!("{line}");
    }
    Ok(())
}

/// `tollgate tools`
pub async fn handle_tools(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = tollgate_config::load(config_path)?;
    let client = ToolClient::from_config(&config)?;

    let tools = match client.list_tools().await {
        Ok(tools) => tools,
        Err(failure) => anyhow::bail!("{failure}\nhint: {}", hint(failure.kind)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    if tools.is_empty() {
        println!("No tools exposed by {}.", client.server_label());
    }
    for tool in &tools {
        match &tool.description {
            Some(desc) => println!("  {}: {}", tool.name, desc.lines().next().unwrap_or("")),
            None => println!("  {}", tool.name),
        }
    }
    Ok(())
}

/// `tollgate call <tool> --args '{...}'`
pub async fn handle_call(config_path: Option<&Path>, tool: &str, raw_args: &str) -> Result<()> {
    let arguments = parse_arguments(raw_args)?;
    let config = tollgate_config::load(config_path)?;
    let client = ToolClient::from_config(&config)?;

    match ToolInvoker::call_tool(&client, tool, arguments).await {
        ToolCallResult::Success { payload } => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        },
        ToolCallResult::Failure(failure) => {
            anyhow::bail!("{failure}\nhint: {}", hint(failure.kind))
        },
    }
}
