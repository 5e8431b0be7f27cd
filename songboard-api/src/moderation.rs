//! Song moderation workflow
//!
//! Every operation takes the caller's [`RequestContext`] and checks the
//! authorization policy before touching storage, so a non-admin gets
//! `Forbidden` whether or not the song exists.
//!
//! Status transitions:
//!
//! ```text
//! suggest ──> pending ──approve──> approved
//!                │  ^                 │
//!             reject └────approve─────┤
//!                v                    │
//!             rejected <───reject─────┘
//! ```
//!
//! Metadata is resolved before any write; a resolver failure leaves storage
//! untouched.

use songboard_common::song::{clamp_views, TOP_SONGS};
use songboard_common::{NewSong, Song, SongChanges, SongStatus, VideoFields};
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};
use crate::pagination::{Page, PageRequest};
use crate::policy::{AuthorizationPolicy, Capability};
use crate::repository::{SoftDelete, SongRepository};
use crate::resolver::{VideoMetadata, VideoMetadataResolver};

/// Admin request to add an approved song
#[derive(Debug, Clone, Default)]
pub struct CreateSong {
    pub youtube_url: String,
    /// Overrides the resolved title when present
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Admin edit; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct EditSong {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub youtube_url: Option<String>,
    pub status: Option<SongStatus>,
}

pub struct SongModerationService {
    songs: Arc<dyn SongRepository>,
    resolver: Arc<dyn VideoMetadataResolver>,
    policy: AuthorizationPolicy,
    default_artist: String,
}

impl SongModerationService {
    pub fn new(
        songs: Arc<dyn SongRepository>,
        resolver: Arc<dyn VideoMetadataResolver>,
        default_artist: impl Into<String>,
    ) -> Self {
        Self {
            songs,
            resolver,
            policy: AuthorizationPolicy,
            default_artist: default_artist.into(),
        }
    }

    // ========================================
    // Queries
    // ========================================

    /// Leaderboard: up to `TOP_SONGS` approved songs by views
    pub async fn top(&self, ctx: &RequestContext) -> ServiceResult<Vec<Song>> {
        self.policy.authorize(ctx, Capability::View)?;
        Ok(self.songs.find_top(TOP_SONGS).await?)
    }

    /// Ranked songs after the leaderboard
    pub async fn remaining(&self, ctx: &RequestContext, page: PageRequest) -> ServiceResult<Page<Song>> {
        self.policy.authorize(ctx, Capability::View)?;
        Ok(self.songs.find_remaining(page).await?)
    }

    /// Songs in one status; `status` is parsed here so bad values are a 400
    pub async fn by_status(
        &self,
        ctx: &RequestContext,
        status: &str,
        page: PageRequest,
    ) -> ServiceResult<Page<Song>> {
        self.policy.authorize(ctx, Capability::View)?;
        let status: SongStatus = status.parse()?;
        Ok(self.songs.find_by_status(status, page).await?)
    }

    /// General list. Callers who cannot moderate only ever see approved songs.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        requested_status: Option<&str>,
        page: PageRequest,
    ) -> ServiceResult<Page<Song>> {
        self.policy.authorize(ctx, Capability::View)?;

        let status = if self.can_moderate(ctx) {
            requested_status.map(str::parse::<SongStatus>).transpose()?
        } else {
            Some(SongStatus::Approved)
        };

        Ok(self.songs.find_all(status, page).await?)
    }

    /// One active song. Non-approved songs are hidden from non-admins.
    pub async fn get(&self, ctx: &RequestContext, id: i64) -> ServiceResult<Song> {
        self.policy.authorize(ctx, Capability::View)?;

        let song = self
            .songs
            .find_by_id(id)
            .await?
            .ok_or_else(ServiceError::song_not_found)?;

        if song.status != SongStatus::Approved && !self.can_moderate(ctx) {
            return Err(ServiceError::song_not_found());
        }
        Ok(song)
    }

    // ========================================
    // Submissions
    // ========================================

    /// Public suggestion; lands in `pending`
    pub async fn suggest(&self, ctx: &RequestContext, youtube_url: &str) -> ServiceResult<Song> {
        self.policy.authorize(ctx, Capability::Suggest)?;

        let meta = self.resolver.resolve(youtube_url).await?;
        if self.songs.find_by_youtube_id(&meta.video_id).await?.is_some() {
            return Err(ServiceError::DuplicateSong(meta.video_id));
        }

        let song = self
            .songs
            .create(NewSong {
                title: meta.title.clone(),
                artist: self.default_artist.clone(),
                video: video_fields(youtube_url, meta),
                status: SongStatus::Pending,
            })
            .await?;

        info!(
            request_id = %ctx.request_id,
            song_id = song.id,
            youtube_id = %song.youtube_id,
            actor = ?ctx.actor_id(),
            "Song suggested"
        );
        Ok(song)
    }

    /// Admin creation; lands in `approved`
    ///
    /// A soft-deleted song with the same video is restored with the new
    /// attributes instead of failing.
    pub async fn create_direct(&self, ctx: &RequestContext, attrs: CreateSong) -> ServiceResult<Song> {
        self.policy.authorize(ctx, Capability::CreateDirect)?;

        let meta = self.resolver.resolve(&attrs.youtube_url).await?;
        let title = non_empty(attrs.title).unwrap_or_else(|| meta.title.clone());
        let artist = non_empty(attrs.artist).unwrap_or_else(|| self.default_artist.clone());
        let video = video_fields(&attrs.youtube_url, meta);

        let song = match self.songs.find_by_youtube_id(&video.youtube_id).await? {
            Some(existing) if !existing.is_deleted() => {
                return Err(ServiceError::DuplicateSong(existing.youtube_id));
            }
            Some(deleted) => {
                let mut changes = SongChanges::status(SongStatus::Approved);
                changes.title = Some(title);
                changes.artist = Some(artist);
                changes.video = Some(video);

                let song = self.songs.restore(deleted.id, changes).await?;
                info!(
                    request_id = %ctx.request_id,
                    song_id = song.id,
                    actor = ?ctx.actor_id(),
                    "Deleted song restored by direct creation"
                );
                song
            }
            None => {
                let song = self
                    .songs
                    .create(NewSong {
                        title,
                        artist,
                        video,
                        status: SongStatus::Approved,
                    })
                    .await?;
                info!(
                    request_id = %ctx.request_id,
                    song_id = song.id,
                    youtube_id = %song.youtube_id,
                    actor = ?ctx.actor_id(),
                    "Song created"
                );
                song
            }
        };

        Ok(song)
    }

    // ========================================
    // Moderation
    // ========================================

    /// Idempotent; clears any rejection reason
    pub async fn approve(&self, ctx: &RequestContext, id: i64) -> ServiceResult<Song> {
        self.transition(ctx, id, SongChanges::status(SongStatus::Approved), None)
            .await
    }

    pub async fn reject(&self, ctx: &RequestContext, id: i64, reason: Option<String>) -> ServiceResult<Song> {
        let reason = non_empty(reason);
        self.transition(ctx, id, SongChanges::rejected(reason.clone()), reason)
            .await
    }

    async fn transition(
        &self,
        ctx: &RequestContext,
        id: i64,
        changes: SongChanges,
        reason: Option<String>,
    ) -> ServiceResult<Song> {
        self.policy.authorize(ctx, Capability::Moderate)?;

        let previous = self
            .songs
            .find_by_id(id)
            .await?
            .ok_or_else(ServiceError::song_not_found)?;
        let song = self.songs.update(id, changes).await?;

        info!(
            request_id = %ctx.request_id,
            song_id = id,
            from = %previous.status,
            to = %song.status,
            actor = ?ctx.actor_id(),
            reason = ?reason,
            "Song status changed"
        );
        Ok(song)
    }

    /// Partial update. A changed URL is re-resolved and all video fields
    /// are written together with the other changes.
    pub async fn edit(&self, ctx: &RequestContext, id: i64, edit: EditSong) -> ServiceResult<Song> {
        self.policy.authorize(ctx, Capability::Moderate)?;

        let title = required_text("title", edit.title)?;
        let artist = required_text("artist", edit.artist)?;

        let current = self
            .songs
            .find_by_id(id)
            .await?
            .ok_or_else(ServiceError::song_not_found)?;

        let mut changes = match edit.status {
            Some(status) => SongChanges::status(status),
            None => SongChanges::default(),
        };
        changes.title = title;
        changes.artist = artist;

        if let Some(url) = edit.youtube_url.filter(|u| u.trim() != current.youtube_url) {
            let meta = self.resolver.resolve(&url).await?;
            if meta.video_id != current.youtube_id {
                if let Some(owner) = self.songs.find_by_youtube_id(&meta.video_id).await? {
                    return Err(ServiceError::DuplicateSong(owner.youtube_id));
                }
            }
            changes.video = Some(video_fields(&url, meta));
        } else {
            debug!(song_id = id, "URL unchanged; metadata not refreshed");
        }

        if changes.is_empty() {
            return Ok(current);
        }

        let song = self.songs.update(id, changes).await?;
        info!(
            request_id = %ctx.request_id,
            song_id = id,
            from = %current.status,
            to = %song.status,
            actor = ?ctx.actor_id(),
            "Song edited"
        );
        Ok(song)
    }

    /// Soft delete; removing an already-deleted song succeeds without a write
    pub async fn remove(&self, ctx: &RequestContext, id: i64) -> ServiceResult<()> {
        self.policy.authorize(ctx, Capability::Moderate)?;

        match self.songs.soft_delete(id).await? {
            SoftDelete::Deleted(song) => info!(
                request_id = %ctx.request_id,
                song_id = song.id,
                actor = ?ctx.actor_id(),
                "Song deleted"
            ),
            SoftDelete::AlreadyDeleted(song) => {
                debug!(song_id = song.id, "Song already deleted")
            }
        }
        Ok(())
    }

    fn can_moderate(&self, ctx: &RequestContext) -> bool {
        self.policy.allows(ctx.role(), Capability::Moderate)
    }
}

fn video_fields(submitted_url: &str, meta: VideoMetadata) -> VideoFields {
    VideoFields {
        youtube_url: submitted_url.trim().to_string(),
        youtube_id: meta.video_id,
        thumbnail: meta.thumbnail,
        views: clamp_views(meta.views),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed replacement for a field that may be omitted but never blanked
fn required_text(field: &str, value: Option<String>) -> ServiceResult<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(ServiceError::validation(
            field,
            format!("The {} field is required.", field),
        )),
        other => Ok(other),
    }
}
