//! # CLI Module
//!
//! The command-line front end shipped with spotlink. Every command builds
//! its components from the loaded [`Settings`](crate::config::Settings) and
//! talks to the real Spotify endpoints.
//!
//! ## Commands
//!
//! - [`auth`] - Runs the browser authorization and stores the refresh token
//! - [`watch`] - Runs the full controller loop and prints playback changes
//! - [`status`] - Fetches and prints the playback state once
//! - [`control`] - Sends one transport command (pause, next, seek, ...)
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotlink auth                # authorize once
//! spotlink watch               # follow playback
//! spotlink seek 50             # jump to the middle of the track
//! spotlink play spotify:album:4aawyAB9vmqN3uQ7FjRGTy
//! ```
//!
//! Errors are fatal here: they are printed with the `error!` macro, which
//! exits the process.

mod auth;
mod control;
mod observer;
mod watch;

pub use auth::auth;
pub use control::control;
pub use control::status;
pub use observer::{ChannelObserver, CliEvent};
pub use watch::watch;
