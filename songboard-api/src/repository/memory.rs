//! In-memory repositories
//!
//! Same ordering, pagination and uniqueness rules as the SQLite
//! repositories. Used by the test suites; nothing survives a restart.

use async_trait::async_trait;
use songboard_common::song::TOP_SONGS;
use songboard_common::time::now;
use songboard_common::user::normalize_email;
use songboard_common::{Error, NewSong, NewUser, Result, Song, SongChanges, SongStatus, User, UserRecord};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{SongRepository, SoftDelete, UserRepository};
use crate::pagination::{Page, PageRequest};

fn paginate(mut songs: Vec<Song>, skip: i64, page: PageRequest) -> Page<Song> {
    let total = (songs.len() as i64 - skip).max(0);
    let start = usize::try_from(skip.saturating_add(page.offset())).unwrap_or(usize::MAX);
    let items = if start >= songs.len() {
        Vec::new()
    } else {
        songs.drain(start..).take(page.per_page as usize).collect()
    };

    Page { items, total, request: page }
}

fn ranked(songs: &BTreeMap<i64, Song>) -> Vec<Song> {
    let mut ranked: Vec<Song> = songs
        .values()
        .filter(|s| !s.is_deleted() && s.status == SongStatus::Approved)
        .cloned()
        .collect();
    ranked.sort_by_key(|s| (Reverse(s.views), s.id));
    ranked
}

fn newest_first(songs: &BTreeMap<i64, Song>, status: Option<SongStatus>) -> Vec<Song> {
    let mut list: Vec<Song> = songs
        .values()
        .filter(|s| !s.is_deleted() && status.map_or(true, |st| s.status == st))
        .cloned()
        .collect();
    list.sort_by_key(|s| Reverse((s.created_at, s.id)));
    list
}

// ========================================
// Songs
// ========================================

#[derive(Default)]
struct SongTable {
    rows: BTreeMap<i64, Song>,
    next_id: i64,
}

impl SongTable {
    /// UNIQUE(youtube_id) across every row
    fn check_unique(&self, youtube_id: &str, except: Option<i64>) -> Result<()> {
        let taken = self
            .rows
            .values()
            .any(|s| s.youtube_id == youtube_id && Some(s.id) != except);
        if taken {
            return Err(Error::Conflict(format!("youtube_id {}", youtube_id)));
        }
        Ok(())
    }

    fn write(&mut self, id: i64, include_deleted: bool, changes: &SongChanges, restore: bool) -> Result<Song> {
        let current = self
            .rows
            .get(&id)
            .filter(|s| include_deleted || !s.is_deleted())
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))?;

        let mut song = current.clone();
        song.apply(changes, now());
        if restore {
            song.deleted_at = None;
        }
        self.check_unique(&song.youtube_id, Some(id))?;

        self.rows.insert(id, song.clone());
        Ok(song)
    }
}

#[derive(Default)]
pub struct InMemorySongRepository {
    table: RwLock<SongTable>,
}

impl InMemorySongRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SongRepository for InMemorySongRepository {
    async fn find_top(&self, limit: i64) -> Result<Vec<Song>> {
        let table = self.table.read().await;
        Ok(ranked(&table.rows).into_iter().take(limit.max(0) as usize).collect())
    }

    async fn find_remaining(&self, page: PageRequest) -> Result<Page<Song>> {
        let table = self.table.read().await;
        Ok(paginate(ranked(&table.rows), TOP_SONGS, page))
    }

    async fn find_by_status(&self, status: SongStatus, page: PageRequest) -> Result<Page<Song>> {
        let table = self.table.read().await;
        Ok(paginate(newest_first(&table.rows, Some(status)), 0, page))
    }

    async fn find_all(&self, status: Option<SongStatus>, page: PageRequest) -> Result<Page<Song>> {
        let table = self.table.read().await;
        Ok(paginate(newest_first(&table.rows, status), 0, page))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).filter(|s| !s.is_deleted()).cloned())
    }

    async fn find_by_id_with_deleted(&self, id: i64) -> Result<Option<Song>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_youtube_id(&self, youtube_id: &str) -> Result<Option<Song>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|s| s.youtube_id == youtube_id).cloned())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.table.read().await.rows.len() as i64)
    }

    async fn create(&self, song: NewSong) -> Result<Song> {
        let mut table = self.table.write().await;
        table.check_unique(&song.video.youtube_id, None)?;

        table.next_id += 1;
        let created = now();
        let stored = Song {
            id: table.next_id,
            title: song.title,
            artist: song.artist,
            youtube_id: song.video.youtube_id,
            youtube_url: song.video.youtube_url,
            thumbnail: song.video.thumbnail,
            views: song.video.views,
            status: song.status,
            rejection_reason: None,
            created_at: created,
            updated_at: created,
            deleted_at: None,
        };
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: i64, changes: SongChanges) -> Result<Song> {
        self.table.write().await.write(id, false, &changes, false)
    }

    async fn soft_delete(&self, id: i64) -> Result<SoftDelete> {
        let mut table = self.table.write().await;
        let song = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))?;

        if song.is_deleted() {
            return Ok(SoftDelete::AlreadyDeleted(song.clone()));
        }

        let at = now();
        song.deleted_at = Some(at);
        song.updated_at = at;
        Ok(SoftDelete::Deleted(song.clone()))
    }

    async fn restore(&self, id: i64, changes: SongChanges) -> Result<Song> {
        self.table.write().await.write(id, true, &changes, true)
    }
}

// ========================================
// Users and tokens
// ========================================

#[derive(Default)]
struct UserTable {
    rows: BTreeMap<i64, UserRecord>,
    tokens: HashMap<String, i64>,
    next_id: i64,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut table = self.table.write().await;
        let email = normalize_email(&user.email);
        if table.rows.values().any(|r| r.user.email == email) {
            return Err(Error::Conflict(format!("email {}", email)));
        }

        table.next_id += 1;
        let created = now();
        let record = UserRecord {
            user: User {
                id: table.next_id,
                name: user.name,
                email,
                role: user.role,
                created_at: created,
                updated_at: created,
            },
            password_hash: user.password_hash,
        };
        let public = record.user.clone();
        table.rows.insert(public.id, record);
        Ok(public)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = normalize_email(email);
        let table = self.table.read().await;
        Ok(table.rows.values().find(|r| r.user.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).map(|r| r.user.clone()))
    }

    async fn create_token(&self, user_id: i64, token_hash: &str) -> Result<()> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&user_id) {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }
        if table.tokens.contains_key(token_hash) {
            return Err(Error::Conflict("access token".to_string()));
        }
        table.tokens.insert(token_hash.to_string(), user_id);
        Ok(())
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .tokens
            .get(token_hash)
            .and_then(|id| table.rows.get(id))
            .map(|r| r.user.clone()))
    }

    async fn revoke_token(&self, token_hash: &str) -> Result<bool> {
        Ok(self.table.write().await.tokens.remove(token_hash).is_some())
    }
}
