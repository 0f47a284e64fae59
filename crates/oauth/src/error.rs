use std::error::Error as StdError;

use tollgate_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credential has nothing to offer in this environment (not
    /// configured, CLI not installed, not logged in). A chain moves on to the
    /// next credential.
    #[error("{credential} unavailable: {reason}")]
    CredentialUnavailable {
        credential: &'static str,
        reason: String,
    },
    /// The credential is configured but the identity endpoint refused it.
    #[error("{credential} authentication failed: {message}")]
    Authentication {
        credential: &'static str,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error("{message}")]
    Message { message: String },
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn unavailable(credential: &'static str, reason: impl Into<String>) -> Self {
        Self::CredentialUnavailable {
            credential,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn authentication(credential: &'static str, message: impl Into<String>) -> Self {
        Self::Authentication {
            credential,
            message: message.into(),
        }
    }

    /// Whether a credential chain should try the next source.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::CredentialUnavailable { .. })
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

tollgate_common::impl_context!();
