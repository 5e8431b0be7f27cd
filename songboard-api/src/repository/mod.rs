//! Storage seams for songs, users and access tokens
//!
//! Both traits have a SQLite implementation used by the binary and an
//! in-memory implementation used by tests.

use async_trait::async_trait;
use songboard_common::{NewSong, NewUser, Result, Song, SongChanges, SongStatus, User, UserRecord};

use crate::pagination::{Page, PageRequest};

pub mod memory;
pub mod sqlite;

pub use memory::{InMemorySongRepository, InMemoryUserRepository};
pub use sqlite::{SqliteSongRepository, SqliteUserRepository};

/// Outcome of a soft delete
#[derive(Debug, Clone)]
pub enum SoftDelete {
    Deleted(Song),
    /// The row was already soft-deleted; nothing was written
    AlreadyDeleted(Song),
}

/// Song persistence
///
/// Ranked queries (`find_top`, `find_remaining`) only see approved, active
/// songs ordered by `views DESC, id ASC`. Lists are ordered newest first.
/// Writes that collide on `youtube_id` fail with `Error::Conflict`.
#[async_trait]
pub trait SongRepository: Send + Sync {
    async fn find_top(&self, limit: i64) -> Result<Vec<Song>>;

    /// Ranked songs after the first `TOP_SONGS`
    async fn find_remaining(&self, page: PageRequest) -> Result<Page<Song>>;

    async fn find_by_status(&self, status: SongStatus, page: PageRequest) -> Result<Page<Song>>;

    async fn find_all(&self, status: Option<SongStatus>, page: PageRequest) -> Result<Page<Song>>;

    /// Active songs only
    async fn find_by_id(&self, id: i64) -> Result<Option<Song>>;

    /// Includes soft-deleted songs
    async fn find_by_id_with_deleted(&self, id: i64) -> Result<Option<Song>>;

    /// Includes soft-deleted songs
    async fn find_by_youtube_id(&self, youtube_id: &str) -> Result<Option<Song>>;

    /// Number of rows, soft-deleted included
    async fn count(&self) -> Result<i64>;

    async fn create(&self, song: NewSong) -> Result<Song>;

    /// Update an active song; `Error::NotFound` when absent or deleted
    async fn update(&self, id: i64, changes: SongChanges) -> Result<Song>;

    async fn soft_delete(&self, id: i64) -> Result<SoftDelete>;

    /// Clear `deleted_at` and apply `changes` in one write
    async fn restore(&self, id: i64, changes: SongChanges) -> Result<Song>;
}

/// Accounts and bearer tokens
///
/// Emails are compared after `normalize_email`. Tokens are only ever seen
/// as their SHA-256 digest.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `Error::Conflict` when the email is taken
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn create_token(&self, user_id: i64, token_hash: &str) -> Result<()>;

    /// Owner of a token; touches `last_used_at`
    async fn find_by_token(&self, token_hash: &str) -> Result<Option<User>>;

    /// Returns whether a token was removed
    async fn revoke_token(&self, token_hash: &str) -> Result<bool>;
}
