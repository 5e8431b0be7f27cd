//! Song entity and its moderation status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::views::format_views;
use crate::{Error, Result};

/// Artist recorded when a submission does not name one
pub const DEFAULT_ARTIST: &str = "Tião Carreiro & Pardinho";

/// Number of ranked songs shown on the leaderboard
pub const TOP_SONGS: i64 = 5;

/// Moderation state of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    Pending,
    Approved,
    Rejected,
}

impl SongStatus {
    pub const ALL: [SongStatus; 3] = [SongStatus::Pending, SongStatus::Approved, SongStatus::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            SongStatus::Pending => "pending",
            SongStatus::Approved => "approved",
            SongStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SongStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SongStatus::Pending),
            "approved" => Ok(SongStatus::Approved),
            "rejected" => Ok(SongStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "Invalid status '{}'. Use: pending, approved or rejected",
                other
            ))),
        }
    }
}

/// A persisted song
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub youtube_id: String,
    pub youtube_url: String,
    pub thumbnail: String,
    pub views: i64,
    pub status: SongStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Song {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply a change set in place; `now` becomes the new `updated_at`
    pub fn apply(&mut self, changes: &SongChanges, now: DateTime<Utc>) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(artist) = &changes.artist {
            self.artist = artist.clone();
        }
        if let Some(video) = &changes.video {
            self.youtube_url = video.youtube_url.clone();
            self.youtube_id = video.youtube_id.clone();
            self.thumbnail = video.thumbnail.clone();
            self.views = video.views;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(reason) = &changes.rejection_reason {
            self.rejection_reason = reason.clone();
        }
        self.updated_at = now;
    }
}

impl Serialize for Song {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            id: i64,
            title: &'a str,
            artist: &'a str,
            youtube_id: &'a str,
            youtube_url: &'a str,
            thumbnail: &'a str,
            views: i64,
            formatted_views: String,
            status: SongStatus,
            rejection_reason: Option<&'a str>,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
            deleted_at: Option<DateTime<Utc>>,
        }

        Repr {
            id: self.id,
            title: &self.title,
            artist: &self.artist,
            youtube_id: &self.youtube_id,
            youtube_url: &self.youtube_url,
            thumbnail: &self.thumbnail,
            views: self.views,
            formatted_views: format_views(self.views),
            status: self.status,
            rejection_reason: self.rejection_reason.as_deref(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
        .serialize(serializer)
    }
}

/// Video-derived fields; always written together
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFields {
    pub youtube_url: String,
    pub youtube_id: String,
    pub thumbnail: String,
    pub views: i64,
}

/// Attributes for inserting a new song
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub video: VideoFields,
    pub status: SongStatus,
}

/// Partial update of a song; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct SongChanges {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub video: Option<VideoFields>,
    pub status: Option<SongStatus>,
    /// `Some(None)` clears the stored reason
    pub rejection_reason: Option<Option<String>>,
}

impl SongChanges {
    pub fn status(status: SongStatus) -> Self {
        let rejection_reason = if status == SongStatus::Rejected { None } else { Some(None) };
        Self {
            status: Some(status),
            rejection_reason,
            ..Default::default()
        }
    }

    pub fn rejected(reason: Option<String>) -> Self {
        Self {
            status: Some(SongStatus::Rejected),
            rejection_reason: Some(reason),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.video.is_none()
            && self.status.is_none()
            && self.rejection_reason.is_none()
    }
}

/// Canonical thumbnail for a video id
pub fn thumbnail_url(youtube_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", youtube_id)
}

/// Canonical watch URL for a video id
pub fn watch_url(youtube_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", youtube_id)
}

/// Clamp an externally reported view count into the stored range
pub fn clamp_views(views: u64) -> i64 {
    i64::try_from(views).unwrap_or(i64::MAX)
}
