mod auth;
mod poller;
mod store;

pub use auth::DEFAULT_SAFETY_MARGIN;
pub use auth::MIN_REFRESH_DELAY;
pub use auth::TokenManager;
pub use poller::PlaybackPoller;
pub use store::FileTokenStore;
pub use store::MemoryTokenStore;
pub use store::TokenStore;
