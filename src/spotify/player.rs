use async_trait::async_trait;
use reqwest::{Method, StatusCode, header::CONTENT_LENGTH};
use serde_json::{Value, json};

use crate::{
    error::ApiError,
    spotify::{PlayerApi, WebApi, ensure_success},
    types::PlaybackStateResponse,
};

/// A player endpoint call, already resolved to absolute values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Pause,
    /// Resumes when `uri` is `None`.
    Play { uri: Option<String> },
    Next,
    Previous,
    Seek { position_ms: u64 },
    Volume { percent: u8 },
}

impl PlayerCommand {
    pub fn method(&self) -> Method {
        match self {
            PlayerCommand::Next | PlayerCommand::Previous => Method::POST,
            _ => Method::PUT,
        }
    }

    /// Path relative to the Web API base URL, query included.
    pub fn path(&self) -> String {
        match self {
            PlayerCommand::Pause => "/me/player/pause".to_string(),
            PlayerCommand::Play { .. } => "/me/player/play".to_string(),
            PlayerCommand::Next => "/me/player/next".to_string(),
            PlayerCommand::Previous => "/me/player/previous".to_string(),
            PlayerCommand::Seek { position_ms } => {
                format!("/me/player/seek?position_ms={position_ms}")
            }
            PlayerCommand::Volume { percent } => {
                format!("/me/player/volume?volume_percent={percent}")
            }
        }
    }

    pub fn body(&self) -> Option<Value> {
        match self {
            PlayerCommand::Play { uri: Some(uri) } if is_single_item(uri) => {
                Some(json!({ "uris": [uri] }))
            }
            PlayerCommand::Play { uri: Some(uri) } => Some(json!({ "context_uri": uri })),
            _ => None,
        }
    }
}

/// Tracks and episodes go into `uris`; albums, playlists and artists are
/// contexts.
fn is_single_item(uri: &str) -> bool {
    uri.starts_with("spotify:track:") || uri.starts_with("spotify:episode:")
}

#[async_trait]
impl PlayerApi for WebApi {
    async fn playback_state(
        &self,
        access_token: &str,
    ) -> Result<Option<PlaybackStateResponse>, ApiError> {
        let res = self
            .client
            .get(format!("{}/me/player", self.api_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        if res.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = ensure_success(res).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn send_command(
        &self,
        access_token: &str,
        command: &PlayerCommand,
    ) -> Result<(), ApiError> {
        let url = format!("{}{}", self.api_url, command.path());
        let req = self
            .client
            .request(command.method(), url)
            .bearer_auth(access_token);

        // the player endpoints reject body-less PUT/POST without a length
        let req = match command.body() {
            Some(body) => req.json(&body),
            None => req.header(CONTENT_LENGTH, 0),
        };

        ensure_success(req.send().await?).await?;
        Ok(())
    }
}
