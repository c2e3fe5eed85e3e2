//! Error types for authorization, upstream calls, playback and the secret store.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Why a browser callback was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    StateMismatch,
    MissingParameters,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::StateMismatch => f.write_str("state mismatch"),
            DenialReason::MissingParameters => f.write_str("missing parameters"),
        }
    }
}

/// Failures of an authorization round trip. None of them are retried automatically.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No valid callback arrived before the deadline.
    #[error("not authenticated within {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The callback was forged or malformed.
    #[error("authorization denied: {0}")]
    Denied(DenialReason),

    /// Another caller held the authorization lock for too long.
    #[error("another authorization is in progress")]
    Busy,

    #[error("could not start callback listener on port {port}: {source}")]
    Listener {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid authorize URL {url}: {reason}")]
    InvalidAuthorizeUrl { url: String, reason: String },

    #[error("callback listener stopped before an authorization result arrived")]
    ListenerClosed,

    #[error("secret store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("value for {key} is not an integer: {value}")]
    NotAnInteger { key: String, value: String },
}

/// An upstream Web API call failed.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("no access token: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Bad gateway, service unavailable and gateway timeout are upstream hiccups.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Status { status: 502..=504, .. })
    }
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("could not {action} playback: {source}")]
    Command {
        action: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("could not check playback state: {0}")]
    Poll(#[source] ApiError),
}

impl PlaybackError {
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Command { .. } => false,
            PlaybackError::Poll(source) => source.is_transient(),
        }
    }
}
