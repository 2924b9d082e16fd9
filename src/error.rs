use std::io;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the Spotify accounts or player endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Spotify responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Local anomalies while reading a redirect request. All of these are
/// recovered by continuing to listen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Malformed redirect request: {0}")]
    Malformed(String),
    #[error("Redirect state does not match the authorization attempt")]
    StateMismatch,
    #[error("Unexpected request path: {0}")]
    UnknownPath(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Cannot bind redirect listener on 127.0.0.1:{port}: {source}")]
    Bind { port: u16, source: io::Error },
    #[error("Authorization was denied: {0}")]
    Denied(String),
    #[error("Authorization attempt was cancelled")]
    Cancelled,
    #[error("Token exchange failed: {0}")]
    TokenExchange(#[source] ApiError),
    #[error("Token refresh failed: {0}")]
    Refresh(#[source] ApiError),
    #[error("No refresh token available, authorize first")]
    NotAuthorized,
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Playback request failed: {0}")]
    Request(#[from] ApiError),
    #[error("Cannot seek before the track duration is known")]
    UnknownDuration,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Token store holds invalid data: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("Cannot prepare configuration directory: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot read .env file: {0}")]
    Env(#[from] dotenv::Error),
}

/// Everything the controller can report back to its host.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("Controller loop has stopped")]
    Stopped,
}
