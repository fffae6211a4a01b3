//! Error types for deck retrieval.
//!
//! Every failure of a catalog call falls into one of three kinds. The
//! variants carry owned strings rather than the underlying `reqwest` /
//! `serde_json` errors so a single failure can be handed to every caller
//! waiting on the same fetch.

use reqwest::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeckError {
    /// The request never produced a response (connection refused, DNS,
    /// timeout, or the body could not be read).
    #[error("transport error calling {url}: {message}")]
    Transport {
        url: String,
        message: String,
        /// Set when the client gave up waiting rather than the connection failing
        timed_out: bool,
    },

    /// The catalog answered with a non-success status.
    #[error("catalog returned {status} for {url}: {body}")]
    Remote {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected document shape.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl DeckError {
    pub fn transport(url: impl Into<String>, err: &reqwest::Error) -> Self {
        DeckError::Transport {
            url: url.into(),
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    pub fn remote(url: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        DeckError::Remote {
            url: url.into(),
            status: status.as_u16(),
            body: body.into(),
        }
    }

    pub fn decode(url: impl Into<String>, err: &serde_json::Error) -> Self {
        DeckError::Decode {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// The URL of the call that failed.
    pub fn url(&self) -> &str {
        match self {
            DeckError::Transport { url, .. }
            | DeckError::Remote { url, .. }
            | DeckError::Decode { url, .. } => url,
        }
    }

    /// True when the catalog reported that the deck does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeckError::Remote { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DeckError::Transport { timed_out: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
