use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::{sync::mpsc, time::timeout};

use crate::{
    cli::observer::{ChannelObserver, CliEvent},
    config::Settings,
    controller::{Controller, ControllerHandle},
    error,
    management::FileTokenStore,
    success, warning,
};

const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the browser authorization and stores the refresh token.
pub async fn auth(settings: Settings) {
    let store = FileTokenStore::default_location();
    let path = store.path().clone();
    let (observer, mut events) = ChannelObserver::new();
    let (controller, handle) =
        Controller::with_web_api(settings, Arc::new(store), Arc::new(observer));
    let task = controller.spawn();

    let authorized = authorize(&handle, &mut events).await;
    let _ = handle.shutdown();
    let _ = task.await;

    if authorized {
        success!("Authentication successful! Refresh token stored in {}", path.display());
    } else {
        error!("Authentication failed or timed out.");
    }
}

/// Opens the authorization URL and waits for the redirect to be exchanged.
pub(crate) async fn authorize(
    handle: &ControllerHandle,
    events: &mut mpsc::UnboundedReceiver<CliEvent>,
) -> bool {
    let attempt = match handle.begin_auth().await {
        Ok(attempt) => attempt,
        Err(e) => error!("Cannot start authorization: {}", e),
    };

    if webbrowser::open(&attempt.url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            attempt.url
        )
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for authorization in the browser...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = timeout(AUTH_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            match event {
                CliEvent::Authorized => return true,
                CliEvent::Error(message) => {
                    spinner.suspend(|| warning!("{}", message));
                    return false;
                }
                CliEvent::Playback(_) => {}
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    spinner.finish_and_clear();
    if !outcome {
        let _ = handle.cancel_auth();
    }
    outcome
}
