use std::error::Error as StdError;
use std::fmt::Write as _;

use thiserror::Error;

/// Boxed underlying failure attached to a [`ChatError`].
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Every failure the chat core can report.
///
/// Exchange-level kinds (`RequestBuild`, `Transport`, `Api`, `ResponseDecode`,
/// `EmptyResponse`) are recoverable: the session prints them and prompts
/// again. `Config` and `Input` end the session.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("failed to build request: {message}")]
    RequestBuild {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("failed to send request: {message}")]
    Transport {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("API returned error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode response: {message}")]
    ResponseDecode {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("API returned an empty response")]
    EmptyResponse,

    #[error("failed to read input: {message}")]
    Input {
        message: String,
        #[source]
        cause: Option<Cause>,
    },
}

impl ChatError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            cause: None,
        }
    }

    pub fn config_caused(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::Config {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn request_build(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::RequestBuild {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn transport(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::Transport {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn response_decode(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::ResponseDecode {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn input(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::Input {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Whether the session must stop instead of prompting again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Input { .. })
    }

    /// Renders the error followed by each nested cause, `outer: inner: ...`.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let _ = write!(out, ": {cause}");
            source = cause.source();
        }
        out
    }
}
