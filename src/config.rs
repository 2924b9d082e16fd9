//! Configuration management for spotlink.
//!
//! This module loads configuration values from environment variables and a
//! `.env` file and turns them into a [`Settings`] value object. The host
//! application builds one `Settings` before the first authorization attempt
//! and hands it to the controller; nothing reads the environment afterwards.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, time::Duration};

use crate::{error::ConfigError, types::Scope, utils};

pub const APP_DIR: &str = "spotlink";

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8890/callback";
pub const DEFAULT_LISTEN_PORT: u16 = 8890;
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(1000);

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the `spotlink` directory if it doesn't exist yet. A missing
/// `.env` file is not an error, since every value can also come from the
/// process environment.
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/spotlink/.env`
/// - macOS: `~/Library/Application Support/spotlink/.env`
/// - Windows: `%LOCALAPPDATA%/spotlink/.env`
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the `.env` file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), ConfigError> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path)?;
    }
    Ok(())
}

/// Platform-specific data directory of the application.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Everything the controller needs, supplied before the first `begin_auth`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    /// Must match a redirect URI registered for the Spotify application.
    pub redirect_uri: String,
    pub listen_port: u16,
    pub scopes: Vec<Scope>,
    pub polling_interval: Duration,
    /// Fixed state nonce. When `None` a random one is generated per attempt.
    pub state: Option<String>,
    /// HTML served to the browser after a successful redirect.
    pub web_return: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub api_url: String,
}

impl Settings {
    /// Settings with every optional value at its default.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Settings {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            scopes: Scope::PLAYBACK.to_vec(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            state: None,
            web_return: None,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Reads the settings from the process environment.
    ///
    /// # Example
    ///
    /// ```
    /// config::load_env().await?;
    /// let settings = config::Settings::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let client_id =
            get("SPOTIFY_API_AUTH_CLIENT_ID").ok_or(ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID"))?;
        let client_secret = get("SPOTIFY_API_AUTH_CLIENT_SECRET")
            .ok_or(ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_SECRET"))?;

        let mut settings = Settings::new(client_id, client_secret);

        if let Some(uri) = get("SPOTIFY_API_REDIRECT_URI") {
            settings.redirect_uri = uri;
        }

        settings.listen_port = match get("SPOTLINK_LISTEN_PORT") {
            Some(port) => port.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "SPOTLINK_LISTEN_PORT",
                reason: format!("{e}"),
            })?,
            None => utils::redirect_port(&settings.redirect_uri).unwrap_or(DEFAULT_LISTEN_PORT),
        };

        if let Some(scopes) = get("SPOTIFY_API_AUTH_SCOPE") {
            settings.scopes = utils::parse_scopes(&scopes).map_err(|reason| ConfigError::Invalid {
                name: "SPOTIFY_API_AUTH_SCOPE",
                reason,
            })?;
        }

        if let Some(interval) = get("SPOTLINK_POLLING_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "SPOTLINK_POLLING_INTERVAL_MS",
                reason: format!("{e}"),
            })?;
            if millis == 0 {
                return Err(ConfigError::Invalid {
                    name: "SPOTLINK_POLLING_INTERVAL_MS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            settings.polling_interval = Duration::from_millis(millis);
        }

        settings.state = get("SPOTLINK_STATE");
        settings.web_return = get("SPOTLINK_WEB_RETURN");

        if let Some(url) = get("SPOTIFY_API_AUTH_URL") {
            settings.authorize_url = url;
        }
        if let Some(url) = get("SPOTIFY_API_TOKEN_URL") {
            settings.token_url = url;
        }
        if let Some(url) = get("SPOTIFY_API_URL") {
            settings.api_url = url.trim_end_matches('/').to_string();
        }

        Ok(settings)
    }
}
