//! # Controller
//!
//! The event loop that owns every stateful piece of spotlink: the redirect
//! listener of the current authorization attempt, the [`TokenManager`] and
//! the [`PlaybackPoller`].
//!
//! ## Scheduling
//!
//! Everything runs on one task. Each loop iteration waits for whichever
//! comes first:
//!
//! - a request from the host, sent through a [`ControllerHandle`]
//! - the listener tick, only while an authorization attempt is open
//! - the refresh deadline, only while one is scheduled
//! - the polling tick, only once authorized
//!
//! and then handles it to completion before waiting again. A refresh, a poll
//! and a command can therefore never overlap, and the token pair has a
//! single writer without any locking. Missed polling ticks are skipped
//! rather than replayed.
//!
//! ## Example
//!
//! ```rust,ignore
//! let (controller, handle) = Controller::new(settings, api.clone(), api, store, observer);
//! tokio::spawn(controller.run());
//!
//! let attempt = handle.begin_auth().await?;
//! webbrowser::open(&attempt.url)?;
//! // snapshots now arrive through the observer
//! handle.pause()?;
//! handle.shutdown()?;
//! ```

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval, sleep_until},
};

use crate::{
    config::Settings,
    error::{AuthError, ControllerError, StoreError},
    info,
    management::{PlaybackPoller, TokenManager, TokenStore},
    server::RedirectListener,
    spotify::{AccountsApi, PlayerApi, WebApi},
    success,
    types::{AuthSession, PlaybackCommand, PlaybackSnapshot},
    utils, warning,
};

/// How often an open redirect listener is polled.
pub const LISTENER_TICK: Duration = Duration::from_millis(50);

/// Receives everything the controller produces. Called on the controller's
/// task, so implementations should return quickly.
pub trait PlaybackObserver: Send + Sync {
    /// Called on every polling tick, changed or not.
    fn on_playback(&self, snapshot: &PlaybackSnapshot);

    fn on_authorized(&self) {}

    fn on_error(&self, _error: &ControllerError) {}
}

/// A started authorization attempt.
#[derive(Debug, Clone)]
pub struct AuthAttempt {
    /// Where to send the user's browser.
    pub url: String,
    /// Where the redirect listener is bound.
    pub local_addr: SocketAddr,
}

#[derive(Debug)]
enum Request {
    BeginAuth(oneshot::Sender<Result<AuthAttempt, AuthError>>),
    CancelAuth,
    Command(PlaybackCommand),
    Shutdown,
}

/// Cloneable sender side of a running [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl ControllerHandle {
    /// Opens a new authorization attempt, cancelling any open one.
    ///
    /// Fails immediately if the redirect listener cannot bind its port.
    pub async fn begin_auth(&self) -> Result<AuthAttempt, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::BeginAuth(reply))?;
        Ok(rx.await.map_err(|_| ControllerError::Stopped)??)
    }

    pub fn cancel_auth(&self) -> Result<(), ControllerError> {
        self.send(Request::CancelAuth)
    }

    pub fn command(&self, command: PlaybackCommand) -> Result<(), ControllerError> {
        self.send(Request::Command(command))
    }

    pub fn pause(&self) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::Resume)
    }

    pub fn next(&self) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::Next)
    }

    pub fn previous(&self) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::Previous)
    }

    pub fn seek_to_percent(&self, percent: f32) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::SeekToPercent(percent))
    }

    pub fn set_volume_percent(&self, percent: f32) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::SetVolumePercent(percent))
    }

    pub fn play_track(&self, context_uri: impl Into<String>) -> Result<(), ControllerError> {
        self.command(PlaybackCommand::PlayTrack(context_uri.into()))
    }

    /// Stops the loop: timers are cancelled and open sockets closed.
    pub fn shutdown(&self) -> Result<(), ControllerError> {
        self.send(Request::Shutdown)
    }

    fn send(&self, request: Request) -> Result<(), ControllerError> {
        self.tx.send(request).map_err(|_| ControllerError::Stopped)
    }
}

pub struct Controller {
    settings: Settings,
    tokens: TokenManager,
    poller: PlaybackPoller,
    listener: Option<RedirectListener>,
    observer: Arc<dyn PlaybackObserver>,
    requests: mpsc::UnboundedReceiver<Request>,
    polling: bool,
    restart_polling: bool,
}

impl Controller {
    pub fn new(
        settings: Settings,
        accounts: Arc<dyn AccountsApi>,
        player: Arc<dyn PlayerApi>,
        store: Arc<dyn TokenStore>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> (Self, ControllerHandle) {
        let (tx, requests) = mpsc::unbounded_channel();
        let tokens = TokenManager::new(accounts, store, settings.redirect_uri.clone());

        let controller = Controller {
            settings,
            tokens,
            poller: PlaybackPoller::new(player),
            listener: None,
            observer,
            requests,
            polling: false,
            restart_polling: false,
        };
        (controller, ControllerHandle { tx })
    }

    /// Controller talking to the real Spotify endpoints.
    pub fn with_web_api(
        settings: Settings,
        store: Arc<dyn TokenStore>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> (Self, ControllerHandle) {
        let api = Arc::new(WebApi::new(&settings));
        Self::new(settings, api.clone(), api, store, observer)
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.tokens = self.tokens.with_safety_margin(margin);
        self
    }

    /// Loads a persisted refresh token. When one exists polling starts right
    /// away and no browser round trip is needed.
    pub async fn restore(&mut self) -> Result<bool, StoreError> {
        let restored = self.tokens.restore().await?;
        if restored {
            self.start_polling();
        }
        Ok(restored)
    }

    pub fn is_authorized(&self) -> bool {
        self.tokens.is_authorized()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let mut listener_tick = interval(LISTENER_TICK);
        listener_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll_tick = interval(self.settings.polling_interval);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.restart_polling {
                poll_tick.reset_immediately();
                self.restart_polling = false;
            }

            let listening = self.listener.as_ref().is_some_and(RedirectListener::is_open);
            let refresh_at = self.tokens.refresh_deadline();
            let polling = self.polling;

            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.handle_request(request).await,
                },
                _ = listener_tick.tick(), if listening => self.tick_listener().await,
                _ = sleep_until(refresh_at.unwrap_or_else(Instant::now)), if refresh_at.is_some() => {
                    self.run_refresh().await
                }
                _ = poll_tick.tick(), if polling => self.poll_playback().await,
            }
        }

        self.teardown();
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::BeginAuth(reply) => {
                let result = self.begin_auth().await;
                let _ = reply.send(result);
            }
            Request::CancelAuth => {
                if let Some(mut listener) = self.listener.take() {
                    listener.cancel();
                    info!("Authorization attempt cancelled");
                }
            }
            Request::Command(command) => {
                if let Err(e) = self.poller.send(&mut self.tokens, &command).await {
                    warning!("Playback command {:?} failed: {}", command, e);
                    self.observer.on_error(&e.into());
                }
            }
            Request::Shutdown => {}
        }
    }

    async fn begin_auth(&mut self) -> Result<AuthAttempt, AuthError> {
        if let Some(mut previous) = self.listener.take() {
            previous.cancel();
        }

        let session = AuthSession {
            client_id: self.settings.client_id.clone(),
            client_secret: self.settings.client_secret.clone(),
            redirect_uri: self.settings.redirect_uri.clone(),
            listen_port: self.settings.listen_port,
            scopes: self.settings.scopes.clone(),
            state: self
                .settings
                .state
                .clone()
                .unwrap_or_else(utils::generate_state_nonce),
            authorize_endpoint: self.settings.authorize_url.clone(),
        };

        let listener = RedirectListener::bind(&session, self.settings.web_return.clone()).await?;
        let local_addr = listener
            .local_addr()
            .ok_or_else(|| AuthError::Bind {
                port: session.listen_port,
                source: std::io::Error::other("listener has no local address"),
            })?;
        info!(
            "Waiting for the Spotify redirect on http://{}{}",
            local_addr,
            session.redirect_path()
        );

        self.listener = Some(listener);
        Ok(AuthAttempt {
            url: session.authorize_url(),
            local_addr,
        })
    }

    async fn tick_listener(&mut self) {
        let Some(outcome) = self.listener.as_mut().and_then(RedirectListener::poll) else {
            return;
        };
        self.listener = None;

        let code = match outcome {
            Ok(code) => code,
            Err(e) => {
                warning!("Authorization failed: {}", e);
                self.observer.on_error(&e.into());
                return;
            }
        };

        match self.tokens.exchange_code(&code).await {
            Ok(_) => {
                success!("Authorization complete");
                self.start_polling();
                self.observer.on_authorized();
            }
            Err(e) => {
                warning!("{}", e);
                self.observer.on_error(&e.into());
            }
        }
    }

    async fn run_refresh(&mut self) {
        if let Err(e) = self.tokens.on_refresh_timer().await {
            warning!("{}", e);
            self.observer.on_error(&e.into());
        }
    }

    async fn poll_playback(&mut self) {
        match self.poller.poll(&mut self.tokens).await {
            Ok(snapshot) => self.observer.on_playback(&snapshot),
            Err(e) => {
                warning!("{}", e);
                self.observer.on_error(&e.into());
            }
        }
    }

    fn start_polling(&mut self) {
        self.polling = true;
        self.restart_polling = true;
    }

    fn teardown(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.cancel();
        }
        self.tokens.cancel_refresh();
        self.polling = false;
    }
}
