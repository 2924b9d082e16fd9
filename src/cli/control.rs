use std::sync::Arc;

use tabled::Table;

use crate::{
    config::Settings,
    error,
    management::{FileTokenStore, PlaybackPoller, TokenManager},
    spotify::WebApi,
    success,
    types::{PlaybackCommand, PlaybackTableRow},
};

/// Token manager and poller primed with the stored refresh token.
async fn connect(settings: &Settings) -> (TokenManager, PlaybackPoller) {
    let api = Arc::new(WebApi::new(settings));
    let mut tokens = TokenManager::new(
        api.clone(),
        Arc::new(FileTokenStore::default_location()),
        settings.redirect_uri.clone(),
    );

    match tokens.restore().await {
        Ok(true) => {}
        Ok(false) => error!("Not authorized yet. Run `spotlink auth` first."),
        Err(e) => error!("Cannot read stored token: {}", e),
    }

    (tokens, PlaybackPoller::new(api))
}

/// Prints the current playback state once.
pub async fn status(settings: Settings) {
    let (mut tokens, mut poller) = connect(&settings).await;

    match poller.poll(&mut tokens).await {
        Ok(snapshot) if snapshot.name.is_empty() => success!("Nothing playing"),
        Ok(snapshot) => println!("{}", Table::new([PlaybackTableRow::from(&snapshot)])),
        Err(e) => error!("Cannot fetch playback state: {}", e),
    }
}

/// Sends a single transport command.
pub async fn control(settings: Settings, command: PlaybackCommand) {
    let (mut tokens, mut poller) = connect(&settings).await;

    // seeking is relative to the current track
    if matches!(command, PlaybackCommand::SeekToPercent(_)) {
        if let Err(e) = poller.poll(&mut tokens).await {
            error!("Cannot fetch playback state: {}", e);
        }
    }

    match poller.send(&mut tokens, &command).await {
        Ok(()) => success!("Sent {:?}", command),
        Err(e) => error!("Command failed: {}", e),
    }
}
