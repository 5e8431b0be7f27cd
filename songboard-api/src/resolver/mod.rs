//! Video metadata resolution
//!
//! Turns a submitted URL into the canonical video id plus the title, view
//! count and thumbnail stored on a song. The service only sees the
//! [`VideoMetadataResolver`] trait; [`YouTubeResolver`] is the production
//! implementation.

use async_trait::async_trait;
use thiserror::Error;

pub mod youtube;

pub use youtube::{extract_video_id, parse_video_page, YouTubeResolver};

/// Metadata for one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    /// Best-effort; 0 when no extraction strategy matched
    pub views: u64,
    pub thumbnail: String,
}

/// Resolver failures
///
/// A missing title is fatal (`Parse`); a missing view count is not.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Error accessing YouTube: {0}")]
    Fetch(String),

    #[error("Could not find video title: {0}")]
    Parse(String),
}

#[async_trait]
pub trait VideoMetadataResolver: Send + Sync {
    /// Resolve a user-supplied URL
    async fn resolve(&self, url: &str) -> Result<VideoMetadata, ResolverError>;
}
