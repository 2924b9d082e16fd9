//! # Spotify Integration Module
//!
//! The thin HTTP layer between spotlink and Spotify. The rest of the crate
//! only sees the two collaborator traits defined here, which keeps the token
//! lifecycle and the playback poller independent of the actual transport:
//!
//! - [`AccountsApi`] - the accounts service token endpoint (code exchange and
//!   refresh grants)
//! - [`PlayerApi`] - the Web API player endpoints (playback state and
//!   transport commands)
//!
//! [`WebApi`] implements both on top of `reqwest`.
//!
//! ```text
//! Controller
//!     ├── TokenManager ──► AccountsApi ──► POST /api/token
//!     └── PlaybackPoller ─► PlayerApi ───► GET/PUT/POST /me/player/*
//! ```
//!
//! ## Error Types
//!
//! Every call returns [`ApiError`]: transport failures, non-success status
//! codes (with the response body kept for diagnostics) and undecodable
//! payloads. Callers decide whether a failure is fatal.

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::{
    config::Settings,
    error::ApiError,
    types::{PlaybackStateResponse, TokenResponse},
};

pub mod auth;
pub mod player;

pub use auth::{TokenGrant, build_auth_url};
pub use player::PlayerCommand;

/// Token endpoint of the accounts service.
#[async_trait]
pub trait AccountsApi: Send + Sync {
    async fn request_token(&self, grant: &TokenGrant) -> Result<TokenResponse, ApiError>;
}

/// Bearer-authenticated player endpoints.
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Current playback state, `None` when nothing is playing.
    async fn playback_state(
        &self,
        access_token: &str,
    ) -> Result<Option<PlaybackStateResponse>, ApiError>;

    async fn send_command(&self, access_token: &str, command: &PlayerCommand)
    -> Result<(), ApiError>;
}

/// `reqwest` implementation of both collaborator traits.
#[derive(Debug, Clone)]
pub struct WebApi {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
}

impl WebApi {
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: &Settings) -> Self {
        WebApi {
            client,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            token_url: settings.token_url.clone(),
            api_url: settings.api_url.clone(),
        }
    }
}

/// Turns non-success responses into [`ApiError::Status`], keeping the body.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}
