use std::sync::Arc;

use tabled::Table;

use crate::{
    cli::{
        auth::authorize,
        observer::{ChannelObserver, CliEvent},
    },
    config::Settings,
    controller::Controller,
    error, info,
    management::FileTokenStore,
    types::{PlaybackSnapshot, PlaybackTableRow},
    utils, warning,
};

/// Follows playback until Ctrl-C, authorizing first if no refresh token is
/// stored.
///
/// Snapshots arrive on every polling tick; a line is printed when the track,
/// the play state or the volume changes, or a full table with `table`.
pub async fn watch(settings: Settings, table: bool) {
    let (observer, mut events) = ChannelObserver::new();
    let (mut controller, handle) = Controller::with_web_api(
        settings,
        Arc::new(FileTokenStore::default_location()),
        Arc::new(observer),
    );

    let restored = match controller.restore().await {
        Ok(restored) => restored,
        Err(e) => {
            warning!("Cannot read stored token, authorization required: {}", e);
            false
        }
    };
    let task = controller.spawn();

    if !restored && !authorize(&handle, &mut events).await {
        let _ = handle.shutdown();
        error!("Authentication failed or timed out.");
    }

    info!("Following playback, press Ctrl-C to stop");
    let mut last: Option<PlaybackSnapshot> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(CliEvent::Playback(snapshot)) => {
                    if table {
                        println!("{}", Table::new([PlaybackTableRow::from(&snapshot)]));
                    } else if last.as_ref().is_none_or(|prev| changed(prev, &snapshot)) {
                        print_line(&snapshot);
                    }
                    last = Some(snapshot);
                }
                // already logged by the controller
                Some(CliEvent::Error(_)) | Some(CliEvent::Authorized) => {}
                None => break,
            },
        }
    }

    let _ = handle.shutdown();
    let _ = task.await;
}

fn changed(prev: &PlaybackSnapshot, next: &PlaybackSnapshot) -> bool {
    prev.track_id != next.track_id
        || prev.is_playing != next.is_playing
        || prev.volume_percent != next.volume_percent
}

fn print_line(snapshot: &PlaybackSnapshot) {
    if snapshot.name.is_empty() {
        info!("Nothing playing");
        return;
    }

    info!(
        "{} {} - {} ({} / {}, volume {}%)",
        if snapshot.is_playing { ">" } else { "||" },
        snapshot.name,
        snapshot.artist,
        utils::format_duration_ms(snapshot.position_ms),
        utils::format_duration_ms(snapshot.duration_ms),
        snapshot.volume_percent
    );
}
