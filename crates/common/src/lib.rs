//! Shared error definitions and helpers used across all tollgate crates.

pub mod error;

pub use error::{Error, FromMessage, Result, TollgateError};
