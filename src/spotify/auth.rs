use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use crate::{
    error::ApiError,
    spotify::{AccountsApi, WebApi, ensure_success},
    types::{AuthSession, Scope, TokenResponse},
    utils,
};

/// Builds the authorization URL the user is sent to.
///
/// The output only depends on the arguments: the same input always yields a
/// byte-identical URL. Scopes keep the order they were given in and are
/// joined with a single space before encoding, so two scopes become
/// `scope=user-read-playback-state%20streaming`.
///
/// # Example
///
/// ```
/// let url = build_auth_url(
///     "https://accounts.spotify.com/authorize",
///     &[Scope::UserReadPlaybackState, Scope::Streaming],
///     "abc",
///     "http://127.0.0.1:8890/callback",
///     "xyz",
/// );
/// assert!(url.contains("state=xyz"));
/// ```
pub fn build_auth_url(
    authorize_endpoint: &str,
    scopes: &[Scope],
    client_id: &str,
    redirect_uri: &str,
    state: &str,
) -> String {
    format!(
        "{authorize_endpoint}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&scope={scope}&state={state}",
        client_id = urlencoding::encode(client_id),
        redirect_uri = urlencoding::encode(redirect_uri),
        scope = urlencoding::encode(&utils::join_scopes(scopes)),
        state = urlencoding::encode(state),
    )
}

impl AuthSession {
    pub fn authorize_url(&self) -> String {
        build_auth_url(
            &self.authorize_endpoint,
            &self.scopes,
            &self.client_id,
            &self.redirect_uri,
            &self.state,
        )
    }

    /// Path the browser is redirected to, e.g. `/callback`.
    pub fn redirect_path(&self) -> String {
        utils::redirect_path(&self.redirect_uri)
    }
}

/// The two grants spotlink sends to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode { code: String, redirect_uri: String },
    RefreshToken { refresh_token: String },
}

impl TokenGrant {
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            TokenGrant::AuthorizationCode { code, redirect_uri } => vec![
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
            TokenGrant::RefreshToken { refresh_token } => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        }
    }
}

#[async_trait]
impl AccountsApi for WebApi {
    async fn request_token(&self, grant: &TokenGrant) -> Result<TokenResponse, ApiError> {
        let res = self
            .client
            .post(&self.token_url)
            .header(
                AUTHORIZATION,
                utils::basic_credentials(&self.client_id, &self.client_secret),
            )
            .form(&grant.form_fields())
            .send()
            .await?;

        let body = ensure_success(res).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
