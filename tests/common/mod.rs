#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::Mutex,
};

use async_trait::async_trait;
use reqwest::StatusCode;
use spotlink::error::ApiError;
use spotlink::spotify::{AccountsApi, PlayerApi, PlayerCommand, TokenGrant};
use spotlink::types::{
    AlbumInfo, Device, Image, NamedEntity, PlaybackStateResponse, PlayingItem, TokenResponse,
};

fn unavailable() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "try later".to_string(),
    }
}

/// Token endpoint answering from a queue and recording every grant.
#[derive(Default)]
pub struct MockAccounts {
    responses: Mutex<VecDeque<Result<TokenResponse, ApiError>>>,
    grants: Mutex<Vec<TokenGrant>>,
}

impl MockAccounts {
    pub fn push_token(&self, access: &str, refresh: Option<&str>, expires_in: u64) {
        self.responses.lock().unwrap().push_back(Ok(TokenResponse {
            access_token: access.to_string(),
            token_type: "Bearer".to_string(),
            scope: "user-read-playback-state".to_string(),
            expires_in,
            refresh_token: refresh.map(str::to_string),
        }));
    }

    pub fn push_failure(&self) {
        self.responses.lock().unwrap().push_back(Err(unavailable()));
    }

    pub fn grants(&self) -> Vec<TokenGrant> {
        self.grants.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountsApi for MockAccounts {
    async fn request_token(&self, grant: &TokenGrant) -> Result<TokenResponse, ApiError> {
        self.grants.lock().unwrap().push(grant.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ApiError::Status {
                    status: StatusCode::BAD_REQUEST,
                    body: "no response queued".to_string(),
                })
            })
    }
}

/// Player endpoints returning a fixed playback state and recording every
/// call together with the access token it carried.
#[derive(Default)]
pub struct MockPlayer {
    state: Mutex<Option<PlaybackStateResponse>>,
    failing: Mutex<bool>,
    polls: Mutex<Vec<String>>,
    commands: Mutex<Vec<(String, PlayerCommand)>>,
}

impl MockPlayer {
    pub fn playing(state: PlaybackStateResponse) -> Self {
        let player = Self::default();
        *player.state.lock().unwrap() = Some(state);
        player
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn polls(&self) -> Vec<String> {
        self.polls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<(String, PlayerCommand)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlayerApi for MockPlayer {
    async fn playback_state(
        &self,
        access_token: &str,
    ) -> Result<Option<PlaybackStateResponse>, ApiError> {
        self.polls.lock().unwrap().push(access_token.to_string());
        if *self.failing.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn send_command(
        &self,
        access_token: &str,
        command: &PlayerCommand,
    ) -> Result<(), ApiError> {
        if *self.failing.lock().unwrap() {
            return Err(unavailable());
        }
        self.commands
            .lock()
            .unwrap()
            .push((access_token.to_string(), command.clone()));
        Ok(())
    }
}

/// A track three and a half minutes long, one minute in, at 70% volume.
pub fn track_state() -> PlaybackStateResponse {
    PlaybackStateResponse {
        is_playing: true,
        progress_ms: Some(60_000),
        item: Some(PlayingItem {
            id: Some("4uLU6hMCjMI75M1A2tKUQC".to_string()),
            name: "Never Gonna Give You Up".to_string(),
            duration_ms: 210_000,
            artists: vec![
                NamedEntity {
                    name: "Rick Astley".to_string(),
                },
                NamedEntity {
                    name: "Guest".to_string(),
                },
            ],
            album: Some(AlbumInfo {
                name: "Whenever You Need Somebody".to_string(),
                images: vec![
                    Image {
                        url: "https://i.scdn.co/image/large".to_string(),
                    },
                    Image {
                        url: "https://i.scdn.co/image/small".to_string(),
                    },
                ],
            }),
            show: None,
        }),
        device: Some(Device {
            volume_percent: Some(70),
        }),
    }
}
