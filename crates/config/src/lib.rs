//! Configuration loading, validation and env substitution.
//!
//! Config files: `tollgate.toml`, `tollgate.yaml`, or `tollgate.json`,
//! searched in `./` then `~/.config/tollgate/`. Environment variables are
//! applied on top (see [`apply_env_overrides`]).
//!
//! Supports `${ENV_VAR}` substitution in the raw file text.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load, load_config},
    schema::{AgentConfig, AuthConfig, ServerConfig, TollgateConfig},
    template::default_config_template,
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config, validate_toml_str},
};
