use tollgate_common::FromMessage;

/// Construction-time errors. Per-call outcomes are
/// [`ToolCallResult`](crate::result::ToolCallResult) values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no tool server URL configured (set MCP_SERVER_URL or [server].url)")]
    MissingEndpoint,
    #[error("tool '{name}' is not on the allow list")]
    NotOnAllowList { name: String },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error(transparent)]
    Credential(#[from] tollgate_oauth::Error),
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

tollgate_common::impl_context!();
