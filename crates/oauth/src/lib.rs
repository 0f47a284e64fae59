//! Bearer token acquisition for the remote tool server.
//!
//! Credentials implement [`TokenCredential`]; [`default_chain`] assembles them
//! from [`tollgate_config::AuthConfig`] in priority order. Nothing here caches:
//! the token provider in `tollgate-mcp` owns the cache.

pub mod azure_cli;
pub mod chain;
pub mod client_secret;
pub mod credential;
pub mod device_code;
pub mod environment;
pub mod error;
pub mod jwt;
pub mod types;

pub use {
    azure_cli::AzureCliCredential,
    chain::{ChainedCredential, default_chain, identity_http_client},
    client_secret::ClientSecretCredential,
    credential::{SharedCredential, StaticTokenCredential, TokenCredential},
    device_code::{DeviceCodeCredential, DeviceCodePrompt, PromptCallback},
    environment::EnvironmentCredential,
    jwt::TokenClaims,
    types::{AccessToken, unix_now},
};

pub use error::{Error, Result};
