//! songboard-api library - community song ranking service
//!
//! Visitors read a leaderboard of songs ranked by YouTube views and suggest
//! new songs by URL; administrators moderate the suggestions.

use axum::{middleware, Router};
use songboard_common::config::TomlConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

pub mod api;
pub mod context;
pub mod error;
pub mod moderation;
pub mod pagination;
pub mod policy;
pub mod repository;
pub mod resolver;

use moderation::SongModerationService;
use repository::{SongRepository, SqliteSongRepository, SqliteUserRepository, UserRepository};
use resolver::{ResolverError, VideoMetadataResolver, YouTubeResolver};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub songs: Arc<SongModerationService>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(
        songs: Arc<dyn SongRepository>,
        users: Arc<dyn UserRepository>,
        resolver: Arc<dyn VideoMetadataResolver>,
        default_artist: impl Into<String>,
    ) -> Self {
        Self {
            songs: Arc::new(SongModerationService::new(songs, resolver, default_artist)),
            users,
        }
    }

    /// Production wiring: SQLite repositories and the YouTube resolver
    pub fn from_pool(pool: sqlx::SqlitePool, config: &TomlConfig) -> Result<Self, ResolverError> {
        let resolver = YouTubeResolver::new(Duration::from_secs(config.resolver.timeout_secs))?;

        Ok(Self::new(
            Arc::new(SqliteSongRepository::new(pool.clone())),
            Arc::new(SqliteUserRepository::new(pool)),
            Arc::new(resolver),
            config.songs.default_artist.clone(),
        ))
    }
}

/// Build application router
///
/// Every request passes caller resolution first, then the access log.
/// Admin routes are gated by the `Authenticated` extractor and the
/// service's policy check rather than a route layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::song_routes())
        .layer(middleware::from_fn(api::log_requests))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            context::resolve_caller,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
