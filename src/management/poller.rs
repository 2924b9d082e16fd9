use std::sync::Arc;

use crate::{
    error::PlaybackError,
    management::TokenManager,
    spotify::{PlayerApi, PlayerCommand},
    types::{PlaybackCommand, PlaybackSnapshot},
    utils,
};

/// Fetches playback snapshots and forwards transport commands.
///
/// The poller holds no timer of its own; the controller calls
/// [`PlaybackPoller::poll`] on every polling tick. Both polling and commands
/// obtain their access token from the [`TokenManager`] right before the
/// request, which refreshes first if the token has run out.
pub struct PlaybackPoller {
    player: Arc<dyn PlayerApi>,
    last_snapshot: Option<PlaybackSnapshot>,
}

impl PlaybackPoller {
    pub fn new(player: Arc<dyn PlayerApi>) -> Self {
        PlaybackPoller {
            player,
            last_snapshot: None,
        }
    }

    pub fn last_snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// One polling tick. Nothing playing yields an idle (default) snapshot.
    pub async fn poll(
        &mut self,
        tokens: &mut TokenManager,
    ) -> Result<PlaybackSnapshot, PlaybackError> {
        let access_token = tokens.valid_access_token().await?;
        let snapshot = self
            .player
            .playback_state(&access_token)
            .await?
            .map(PlaybackSnapshot::from)
            .unwrap_or_default();

        self.last_snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Maps a host command to the endpoint call it needs, using the last
    /// known snapshot for relative values.
    pub fn resolve(&self, command: &PlaybackCommand) -> Result<PlayerCommand, PlaybackError> {
        let resolved = match command {
            PlaybackCommand::Pause => PlayerCommand::Pause,
            PlaybackCommand::Resume => PlayerCommand::Play { uri: None },
            PlaybackCommand::Next => PlayerCommand::Next,
            PlaybackCommand::Previous => PlayerCommand::Previous,
            PlaybackCommand::SeekToPercent(percent) => {
                let duration_ms = self
                    .last_snapshot
                    .as_ref()
                    .map(|s| s.duration_ms)
                    .filter(|d| *d > 0)
                    .ok_or(PlaybackError::UnknownDuration)?;
                PlayerCommand::Seek {
                    position_ms: utils::seek_position_ms(*percent, duration_ms),
                }
            }
            PlaybackCommand::SetVolumePercent(percent) => PlayerCommand::Volume {
                percent: utils::volume_percent(*percent),
            },
            PlaybackCommand::PlayTrack(uri) => PlayerCommand::Play {
                uri: Some(uri.clone()),
            },
        };
        Ok(resolved)
    }

    /// Sends a command. Only transport-level completion is awaited; the
    /// effect shows up in a later snapshot.
    pub async fn send(
        &mut self,
        tokens: &mut TokenManager,
        command: &PlaybackCommand,
    ) -> Result<(), PlaybackError> {
        let resolved = self.resolve(command)?;
        let access_token = tokens.valid_access_token().await?;
        self.player.send_command(&access_token, &resolved).await?;

        if let Some(snapshot) = self.last_snapshot.as_mut() {
            match resolved {
                PlayerCommand::Pause => snapshot.is_playing = false,
                PlayerCommand::Play { uri: None } => snapshot.is_playing = true,
                PlayerCommand::Seek { position_ms } => snapshot.position_ms = position_ms,
                PlayerCommand::Volume { percent } => snapshot.volume_percent = u32::from(percent),
                _ => {}
            }
        }
        Ok(())
    }
}
