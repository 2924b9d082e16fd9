use spotlink::spotify::{TokenGrant, build_auth_url};
use spotlink::types::{AuthSession, Scope};

const AUTHORIZE: &str = "https://accounts.spotify.com/authorize";
const REDIRECT: &str = "http://127.0.0.1:8890/callback";

#[test]
fn test_build_auth_url() {
    let url = build_auth_url(
        AUTHORIZE,
        &[Scope::UserReadPlaybackState, Scope::Streaming],
        "abc",
        REDIRECT,
        "xyz",
    );

    assert_eq!(
        url,
        "https://accounts.spotify.com/authorize?client_id=abc&response_type=code\
         &redirect_uri=http%3A%2F%2F127.0.0.1%3A8890%2Fcallback\
         &scope=user-read-playback-state%20streaming&state=xyz"
    );
}

#[test]
fn test_build_auth_url_is_deterministic() {
    let scopes = Scope::PLAYBACK;
    let first = build_auth_url(AUTHORIZE, &scopes, "abc", REDIRECT, "xyz");
    let second = build_auth_url(AUTHORIZE, &scopes, "abc", REDIRECT, "xyz");
    assert_eq!(first, second);
}

#[test]
fn test_build_auth_url_preserves_scope_order() {
    let url = build_auth_url(
        AUTHORIZE,
        &[Scope::Streaming, Scope::UserReadPlaybackState],
        "abc",
        REDIRECT,
        "xyz",
    );
    assert!(url.contains("scope=streaming%20user-read-playback-state"));
}

#[test]
fn test_build_auth_url_encodes_every_value() {
    let url = build_auth_url(AUTHORIZE, &[Scope::Streaming], "a b&c", REDIRECT, "x/y=z");
    assert!(url.contains("client_id=a%20b%26c"));
    assert!(url.contains("state=x%2Fy%3Dz"));
}

#[test]
fn test_auth_session_urls() {
    let session = AuthSession {
        client_id: "abc".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: REDIRECT.to_string(),
        listen_port: 8890,
        scopes: vec![Scope::UserReadPlaybackState, Scope::Streaming],
        state: "xyz".to_string(),
        authorize_endpoint: AUTHORIZE.to_string(),
    };

    assert_eq!(
        session.authorize_url(),
        build_auth_url(AUTHORIZE, &session.scopes, "abc", REDIRECT, "xyz")
    );
    assert_eq!(session.redirect_path(), "/callback");

    // The client secret never leaves through the browser
    assert!(!session.authorize_url().contains("secret"));
}

#[test]
fn test_token_grant_form_fields() {
    let exchange = TokenGrant::AuthorizationCode {
        code: "AQA123".to_string(),
        redirect_uri: REDIRECT.to_string(),
    };
    assert_eq!(
        exchange.form_fields(),
        vec![
            ("grant_type", "authorization_code"),
            ("code", "AQA123"),
            ("redirect_uri", REDIRECT),
        ]
    );

    let refresh = TokenGrant::RefreshToken {
        refresh_token: "R1".to_string(),
    };
    assert_eq!(
        refresh.form_fields(),
        vec![("grant_type", "refresh_token"), ("refresh_token", "R1")]
    );
}
