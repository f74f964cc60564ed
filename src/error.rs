//! Error types for the narration and chat clients.

use thiserror::Error;

use crate::narration::NarrationState;

/// Result alias for controller and transport operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while issuing requests or driving a controller.
///
/// Every variant carries owned strings rather than the originating error so
/// the value can be cloned onto an error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server replied with a non-2xx HTTP status code.
    #[error("request to {url} failed with HTTP {status}")]
    Request { status: u16, url: String },

    /// No HTTP status was received (refused connection, timeout, DNS).
    #[error("could not reach {url}: {detail}")]
    Connect { url: String, detail: String },

    /// A 2xx body could not be parsed as the expected JSON shape.
    #[error("malformed response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// The operation is not allowed from the controller's current state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: NarrationState,
    },

    /// The selected text is not part of the current choice set.
    #[error("choice {0:?} is not on offer")]
    UnknownChoice(String),

    /// The session id cannot be used as a single URL path segment.
    #[error("session id {0:?} is not valid")]
    InvalidSession(String),

    /// A chat message is already in flight.
    #[error("submit is disabled while a message is in flight")]
    SubmitDisabled,
}

impl ClientError {
    /// True for errors produced by a request that reached the network,
    /// i.e. the ones a retry could plausibly fix.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Request { .. } | ClientError::Connect { .. } | ClientError::Decode { .. }
        )
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{var}={value:?} is not a valid value")]
    InvalidEnv { var: String, value: String },
}
