// stovelink-api: Async Rust client for the pellet-stove vendor cloud

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use auth::token_expiry;
pub use client::CloudClient;
pub use error::Error;
pub use transport::TransportConfig;
pub use types::DeviceSnapshot;
