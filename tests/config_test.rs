use std::{collections::HashMap, time::Duration};

use spotlink::config::{self, Settings};
use spotlink::error::ConfigError;
use spotlink::types::Scope;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

const CREDENTIALS: [(&str, &str); 2] = [
    ("SPOTIFY_API_AUTH_CLIENT_ID", "abc"),
    ("SPOTIFY_API_AUTH_CLIENT_SECRET", "secret"),
];

#[test]
fn test_defaults() {
    let settings = Settings::from_lookup(lookup(&CREDENTIALS)).unwrap();

    assert_eq!(settings.client_id, "abc");
    assert_eq!(settings.client_secret, "secret");
    assert_eq!(settings.redirect_uri, config::DEFAULT_REDIRECT_URI);
    assert_eq!(settings.listen_port, 8890);
    assert_eq!(settings.scopes, Scope::PLAYBACK.to_vec());
    assert_eq!(settings.polling_interval, Duration::from_secs(1));
    assert!(settings.state.is_none());
    assert!(settings.web_return.is_none());
    assert_eq!(settings.authorize_url, config::DEFAULT_AUTHORIZE_URL);
    assert_eq!(settings.token_url, config::DEFAULT_TOKEN_URL);
    assert_eq!(settings.api_url, config::DEFAULT_API_URL);
}

#[test]
fn test_missing_credentials() {
    let err = Settings::from_lookup(lookup(&[("SPOTIFY_API_AUTH_CLIENT_ID", "abc")])).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_SECRET")
    ));

    // Blank values count as missing
    let err = Settings::from_lookup(lookup(&[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "  "),
        ("SPOTIFY_API_AUTH_CLIENT_SECRET", "secret"),
    ]))
    .unwrap_err();
    assert!(matches!(err, ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID")));
}

#[test]
fn test_overrides() {
    let mut vars = CREDENTIALS.to_vec();
    vars.extend([
        ("SPOTIFY_API_REDIRECT_URI", "http://127.0.0.1:9000/auth"),
        ("SPOTIFY_API_AUTH_SCOPE", "streaming,user-read-email"),
        ("SPOTLINK_POLLING_INTERVAL_MS", "250"),
        ("SPOTLINK_STATE", "fixed"),
        ("SPOTLINK_WEB_RETURN", "<p>bye</p>"),
        ("SPOTIFY_API_URL", "http://localhost:3000/v1/"),
    ]);

    let settings = Settings::from_lookup(lookup(&vars)).unwrap();

    assert_eq!(settings.redirect_uri, "http://127.0.0.1:9000/auth");
    // Port follows the redirect URI
    assert_eq!(settings.listen_port, 9000);
    assert_eq!(settings.scopes, vec![Scope::Streaming, Scope::UserReadEmail]);
    assert_eq!(settings.polling_interval, Duration::from_millis(250));
    assert_eq!(settings.state.as_deref(), Some("fixed"));
    assert_eq!(settings.web_return.as_deref(), Some("<p>bye</p>"));
    assert_eq!(settings.api_url, "http://localhost:3000/v1");
}

#[test]
fn test_explicit_listen_port_wins() {
    let mut vars = CREDENTIALS.to_vec();
    vars.push(("SPOTLINK_LISTEN_PORT", "9100"));

    let settings = Settings::from_lookup(lookup(&vars)).unwrap();
    assert_eq!(settings.listen_port, 9100);
}

#[test]
fn test_invalid_values() {
    for (name, value) in [
        ("SPOTLINK_LISTEN_PORT", "not-a-port"),
        ("SPOTLINK_POLLING_INTERVAL_MS", "0"),
        ("SPOTLINK_POLLING_INTERVAL_MS", "soon"),
        ("SPOTIFY_API_AUTH_SCOPE", "bogus"),
    ] {
        let mut vars = CREDENTIALS.to_vec();
        vars.push((name, value));

        match Settings::from_lookup(lookup(&vars)) {
            Err(ConfigError::Invalid { name: invalid, .. }) => assert_eq!(invalid, name),
            other => panic!("expected {name} to be rejected, got {other:?}"),
        }
    }
}

#[test]
fn test_data_dir_ends_with_app_dir() {
    assert!(config::data_dir().ends_with(config::APP_DIR));
}
