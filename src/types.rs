use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tokio::time::Instant;

use crate::utils;

/// Authorization scopes understood by the Spotify accounts service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    UserLibraryRead,
    UserLibraryModify,
    PlaylistReadPrivate,
    PlaylistModifyPublic,
    PlaylistModifyPrivate,
    PlaylistReadCollaborative,
    UserReadRecentlyPlayed,
    UserTopRead,
    UserReadPrivate,
    UserReadEmail,
    UserReadBirthdate,
    Streaming,
    UserModifyPlaybackState,
    UserReadPlaybackState,
    UserReadCurrentlyPlaying,
    UserFollowModify,
    UserFollowRead,
}

impl Scope {
    pub const ALL: [Scope; 17] = [
        Scope::UserLibraryRead,
        Scope::UserLibraryModify,
        Scope::PlaylistReadPrivate,
        Scope::PlaylistModifyPublic,
        Scope::PlaylistModifyPrivate,
        Scope::PlaylistReadCollaborative,
        Scope::UserReadRecentlyPlayed,
        Scope::UserTopRead,
        Scope::UserReadPrivate,
        Scope::UserReadEmail,
        Scope::UserReadBirthdate,
        Scope::Streaming,
        Scope::UserModifyPlaybackState,
        Scope::UserReadPlaybackState,
        Scope::UserReadCurrentlyPlaying,
        Scope::UserFollowModify,
        Scope::UserFollowRead,
    ];

    /// Enough to follow playback and use every transport command.
    pub const PLAYBACK: [Scope; 4] = [
        Scope::UserReadPlaybackState,
        Scope::UserModifyPlaybackState,
        Scope::UserReadCurrentlyPlaying,
        Scope::Streaming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::UserLibraryRead => "user-library-read",
            Scope::UserLibraryModify => "user-library-modify",
            Scope::PlaylistReadPrivate => "playlist-read-private",
            Scope::PlaylistModifyPublic => "playlist-modify-public",
            Scope::PlaylistModifyPrivate => "playlist-modify-private",
            Scope::PlaylistReadCollaborative => "playlist-read-collaborative",
            Scope::UserReadRecentlyPlayed => "user-read-recently-played",
            Scope::UserTopRead => "user-top-read",
            Scope::UserReadPrivate => "user-read-private",
            Scope::UserReadEmail => "user-read-email",
            Scope::UserReadBirthdate => "user-read-birthdate",
            Scope::Streaming => "streaming",
            Scope::UserModifyPlaybackState => "user-modify-playback-state",
            Scope::UserReadPlaybackState => "user-read-playback-state",
            Scope::UserReadCurrentlyPlaying => "user-read-currently-playing",
            Scope::UserFollowModify => "user-follow-modify",
            Scope::UserFollowRead => "user-follow-read",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == wanted)
            .ok_or_else(|| format!("unknown scope '{}'", s.trim()))
    }
}

/// Everything needed for one authorization attempt. Built when the attempt
/// starts and never changed afterwards.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub listen_port: u16,
    pub scopes: Vec<Scope>,
    pub state: String,
    pub authorize_endpoint: String,
}

/// Raw body returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The current access/refresh pair. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_at: Instant,
}

impl Token {
    /// Builds a token from an endpoint response received at `issued_at`.
    /// Spotify may omit the refresh token on refresh grants, in which case
    /// `previous_refresh` is carried over. A zero `expires_in` counts as one
    /// second.
    pub fn from_response(
        response: TokenResponse,
        issued_at: Instant,
        previous_refresh: Option<&str>,
    ) -> Self {
        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        Token {
            access_token: response.access_token,
            refresh_token,
            scope: response.scope,
            expires_at: issued_at + std::time::Duration::from_secs(response.expires_in.max(1)),
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Refresh token as written to disk by the file store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub refresh_token: String,
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

/// Point-in-time view of what the user is listening to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub track_id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub position_ms: u64,
    pub is_playing: bool,
    pub volume_percent: u32,
    pub album_art_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackStateResponse {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<PlayingItem>,
    pub device: Option<Device>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayingItem {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<NamedEntity>,
    pub album: Option<AlbumInfo>,
    // podcast episodes carry a show instead of artists/album
    pub show: Option<ShowInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumInfo {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowInfo {
    pub name: String,
    pub publisher: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub volume_percent: Option<u32>,
}

impl From<PlaybackStateResponse> for PlaybackSnapshot {
    fn from(response: PlaybackStateResponse) -> Self {
        let volume_percent = response
            .device
            .and_then(|d| d.volume_percent)
            .unwrap_or_default();
        let position_ms = response.progress_ms.unwrap_or_default();

        let Some(item) = response.item else {
            return PlaybackSnapshot {
                position_ms,
                is_playing: response.is_playing,
                volume_percent,
                ..Default::default()
            };
        };

        let (artist, album, images) = match (item.album, item.show) {
            (Some(album), _) => (
                item.artists
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                album.name,
                album.images,
            ),
            (None, Some(show)) => (show.publisher.unwrap_or_default(), show.name, show.images),
            (None, None) => (String::new(), String::new(), Vec::new()),
        };

        PlaybackSnapshot {
            track_id: item.id.unwrap_or_default(),
            name: item.name,
            artist,
            album,
            duration_ms: item.duration_ms,
            position_ms,
            is_playing: response.is_playing,
            volume_percent,
            // Spotify lists images widest first
            album_art_url: images.into_iter().next().map(|i| i.url).unwrap_or_default(),
        }
    }
}

/// Transport commands a host can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Pause,
    Resume,
    Next,
    Previous,
    /// Position as a percentage (0-100) of the current track.
    SeekToPercent(f32),
    /// Device volume as a percentage (0-100).
    SetVolumePercent(f32),
    /// Starts playing a context (album, playlist, artist) by Spotify URI.
    PlayTrack(String),
}

#[derive(Tabled)]
pub struct PlaybackTableRow {
    pub track: String,
    pub artist: String,
    pub album: String,
    pub progress: String,
    pub state: String,
    pub volume: String,
}

impl From<&PlaybackSnapshot> for PlaybackTableRow {
    fn from(snapshot: &PlaybackSnapshot) -> Self {
        PlaybackTableRow {
            track: snapshot.name.clone(),
            artist: snapshot.artist.clone(),
            album: snapshot.album.clone(),
            progress: format!(
                "{} / {}",
                utils::format_duration_ms(snapshot.position_ms),
                utils::format_duration_ms(snapshot.duration_ms)
            ),
            state: if snapshot.is_playing {
                "playing".to_string()
            } else {
                "paused".to_string()
            },
            volume: format!("{}%", snapshot.volume_percent),
        }
    }
}
