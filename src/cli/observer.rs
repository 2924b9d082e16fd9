use tokio::sync::mpsc;

use crate::{controller::PlaybackObserver, error::ControllerError, types::PlaybackSnapshot};

#[derive(Debug)]
pub enum CliEvent {
    Playback(PlaybackSnapshot),
    Authorized,
    Error(String),
}

/// Forwards controller callbacks to the CLI task.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<CliEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CliEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelObserver { tx }, rx)
    }
}

impl PlaybackObserver for ChannelObserver {
    fn on_playback(&self, snapshot: &PlaybackSnapshot) {
        let _ = self.tx.send(CliEvent::Playback(snapshot.clone()));
    }

    fn on_authorized(&self) {
        let _ = self.tx.send(CliEvent::Authorized);
    }

    fn on_error(&self, error: &ControllerError) {
        let _ = self.tx.send(CliEvent::Error(error.to_string()));
    }
}
