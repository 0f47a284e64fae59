//! Client-side tool allow list.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Names of the tools a client may call. Empty allows every tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolAllowList {
    names: BTreeSet<String>,
}

impl ToolAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name`. Returns `false` if it was already present.
    pub fn allow(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Remove `name`; fails if it was never allowed.
    pub fn disallow(&mut self, name: &str) -> Result<()> {
        if self.names.remove(name) {
            Ok(())
        } else {
            Err(Error::NotOnAllowList { name: name.into() })
        }
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ToolAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.trim().is_empty())
                .collect(),
        }
    }
}
