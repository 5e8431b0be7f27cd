//! HTTP API handlers

pub mod auth;
pub mod health;
pub mod request_log;
pub mod songs;
pub mod validated;

pub use auth::auth_routes;
pub use health::health_routes;
pub use request_log::log_requests;
pub use songs::song_routes;
pub use validated::{OptionalValidatedJson, ValidatedJson};
