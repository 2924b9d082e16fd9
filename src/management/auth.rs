use std::{sync::Arc, time::Duration};

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use tokio::time::Instant;

use crate::{
    error::{AuthError, StoreError},
    management::TokenStore,
    spotify::{AccountsApi, TokenGrant},
    types::{Token, TokenResponse},
    warning,
};

/// How long before expiry the scheduled refresh fires.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Earliest a scheduled refresh may fire after a token arrives.
pub const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

const RETRY_MIN_DELAY: Duration = Duration::from_secs(5);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(300);
const RETRY_MAX_TIMES: usize = 5;

/// Owns the token pair and its refresh schedule.
///
/// The manager is the only writer of the current [`Token`]. Every request
/// builder asks [`TokenManager::valid_access_token`] for the token to send,
/// so a token replaced by a refresh is never used again.
///
/// Scheduling is passive: the manager only records *when* the next refresh
/// is due ([`TokenManager::refresh_deadline`]); the owning event loop sleeps
/// until then and calls [`TokenManager::on_refresh_timer`]. Recording a new
/// deadline replaces the old one, so there is never more than one.
pub struct TokenManager {
    accounts: Arc<dyn AccountsApi>,
    store: Arc<dyn TokenStore>,
    redirect_uri: String,
    safety_margin: Duration,
    token: Option<Token>,
    refresh_token: Option<String>,
    refresh_at: Option<Instant>,
    retry: Option<ExponentialBackoff>,
}

impl TokenManager {
    pub fn new(
        accounts: Arc<dyn AccountsApi>,
        store: Arc<dyn TokenStore>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        TokenManager {
            accounts,
            store,
            redirect_uri: redirect_uri.into(),
            safety_margin: DEFAULT_SAFETY_MARGIN,
            token: None,
            refresh_token: None,
            refresh_at: None,
            retry: None,
        }
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn current_token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// True when requests can be made, possibly after a refresh.
    pub fn is_authorized(&self) -> bool {
        self.token.is_some() || self.refresh_token.is_some()
    }

    pub fn refresh_deadline(&self) -> Option<Instant> {
        self.refresh_at
    }

    pub fn cancel_refresh(&mut self) {
        self.refresh_at = None;
        self.retry = None;
    }

    /// Picks up a refresh token persisted by an earlier run. No access token
    /// exists afterwards; the first request refreshes lazily.
    pub async fn restore(&mut self) -> Result<bool, StoreError> {
        match self.store.load().await? {
            Some(refresh_token) => {
                self.refresh_token = Some(refresh_token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Trades an authorization code for the first token pair.
    pub async fn exchange_code(&mut self, code: &str) -> Result<&Token, AuthError> {
        let grant = TokenGrant::AuthorizationCode {
            code: code.to_string(),
            redirect_uri: self.redirect_uri.clone(),
        };

        let issued_at = Instant::now();
        let response = self
            .accounts
            .request_token(&grant)
            .await
            .map_err(AuthError::TokenExchange)?;

        self.retry = None;
        Ok(self.install(response, issued_at).await)
    }

    /// Mints a new access token from the refresh token.
    ///
    /// On failure nothing changes: the previous refresh token stays in place
    /// for a later attempt.
    pub async fn refresh(&mut self) -> Result<&Token, AuthError> {
        let refresh_token = self.refresh_token.clone().ok_or(AuthError::NotAuthorized)?;
        let grant = TokenGrant::RefreshToken { refresh_token };

        let issued_at = Instant::now();
        let response = self
            .accounts
            .request_token(&grant)
            .await
            .map_err(AuthError::Refresh)?;

        self.retry = None;
        Ok(self.install(response, issued_at).await)
    }

    /// Runs the scheduled refresh. A failed refresh is retried with a
    /// bounded exponential backoff; once that is exhausted nothing is
    /// scheduled and the next request refreshes lazily.
    pub async fn on_refresh_timer(&mut self) -> Result<(), AuthError> {
        self.refresh_at = None;

        match self.refresh().await.map(|_| ()) {
            Ok(()) => Ok(()),
            Err(e @ AuthError::Refresh(_)) => {
                self.schedule_retry();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Access token to put on the next request, refreshing first when the
    /// current one is missing or expired.
    pub async fn valid_access_token(&mut self) -> Result<String, AuthError> {
        if let Some(token) = &self.token {
            if !token.is_expired_at(Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        Ok(self.refresh().await?.access_token.clone())
    }

    async fn install(&mut self, response: TokenResponse, issued_at: Instant) -> &Token {
        let token = Token::from_response(response, issued_at, self.refresh_token.as_deref());

        if !token.refresh_token.is_empty() {
            if self.refresh_token.as_deref() != Some(token.refresh_token.as_str()) {
                if let Err(e) = self.store.save(&token.refresh_token).await {
                    warning!("Failed to persist refresh token: {}", e);
                }
            }
            self.refresh_token = Some(token.refresh_token.clone());
        }

        self.schedule_refresh(token.expires_at);
        self.token.insert(token)
    }

    fn schedule_refresh(&mut self, expires_at: Instant) {
        let now = Instant::now();
        let lifetime = expires_at.saturating_duration_since(now);
        // tokens shorter-lived than the margin get refreshed halfway through
        let lead = if lifetime > self.safety_margin {
            self.safety_margin
        } else {
            lifetime / 2
        };
        self.refresh_at = Some((expires_at - lead).max(now + MIN_REFRESH_DELAY));
    }

    fn schedule_retry(&mut self) {
        let backoff = self.retry.get_or_insert_with(|| {
            ExponentialBuilder::default()
                .with_min_delay(RETRY_MIN_DELAY)
                .with_max_delay(RETRY_MAX_DELAY)
                .with_max_times(RETRY_MAX_TIMES)
                .build()
        });

        match backoff.next() {
            Some(delay) => self.refresh_at = Some(Instant::now() + delay),
            None => {
                warning!("Giving up on scheduled token refresh after {} retries", RETRY_MAX_TIMES);
                self.retry = None;
            }
        }
    }
}
