use base64::{Engine, engine::general_purpose::STANDARD};
use rand::{Rng, distr::Alphanumeric};
use url::Url;

use crate::types::Scope;

pub const STATE_NONCE_LENGTH: usize = 16;

/// Random anti-CSRF value sent as `state` and expected back on redirect.
pub fn generate_state_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Value for the `Authorization` header of token endpoint requests.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {encoded}")
}

/// Space-joined canonical scope tokens, in declaration order.
pub fn join_scopes(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a scope list separated by spaces and/or commas. Duplicates are
/// dropped, first occurrence wins.
pub fn parse_scopes(input: &str) -> Result<Vec<Scope>, String> {
    let mut scopes = Vec::new();
    for part in input.split([' ', ',']).filter(|p| !p.trim().is_empty()) {
        let scope: Scope = part.parse()?;
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }

    if scopes.is_empty() {
        return Err("scope list cannot be empty".to_string());
    }
    Ok(scopes)
}

/// Path component of a redirect URI such as `http://127.0.0.1:8890/callback`.
pub fn redirect_path(redirect_uri: &str) -> String {
    Url::parse(redirect_uri)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| "/".to_string())
}

/// Port of a redirect URI. `None` for a missing or default port and for URIs
/// that do not parse.
pub fn redirect_port(redirect_uri: &str) -> Option<u16> {
    Url::parse(redirect_uri).ok()?.port()
}

/// Absolute seek offset for a percentage of `duration_ms`.
pub fn seek_position_ms(percent: f32, duration_ms: u64) -> u64 {
    let ratio = f64::from(clamp_percent(percent)) / 100.0;
    (duration_ms as f64 * ratio).round() as u64
}

pub fn volume_percent(percent: f32) -> u8 {
    clamp_percent(percent).round() as u8
}

fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Formats milliseconds as `m:ss`.
pub fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
