//! SQLite repositories (sqlx)

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use songboard_common::song::TOP_SONGS;
use songboard_common::time::now;
use songboard_common::user::normalize_email;
use songboard_common::{Error, NewSong, NewUser, Result, Song, SongChanges, SongStatus, User, UserRecord};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::{SongRepository, SoftDelete, UserRepository};
use crate::pagination::{Page, PageRequest};

const SONG_COLUMNS: &str = "id, title, artist, youtube_id, youtube_url, thumbnail, views, status, \
                            rejection_reason, created_at, updated_at, deleted_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let status: String = row.try_get("status")?;

    Ok(Song {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        youtube_id: row.try_get("youtube_id")?,
        youtube_url: row.try_get("youtube_url")?,
        thumbnail: row.try_get("thumbnail")?,
        views: row.try_get("views")?,
        status: status.parse()?,
        rejection_reason: row.try_get("rejection_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn user_record_from_row(row: &SqliteRow) -> Result<UserRecord> {
    let role: String = row.try_get("role")?;

    Ok(UserRecord {
        user: User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: role.parse()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        },
        password_hash: row.try_get("password_hash")?,
    })
}

// ========================================
// Songs
// ========================================

#[derive(Clone)]
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_song(
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<Song>> {
        let sql = if include_deleted {
            format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS)
        } else {
            format!("SELECT {} FROM songs WHERE id = ? AND deleted_at IS NULL", SONG_COLUMNS)
        };

        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut **tx).await?;
        row.as_ref().map(song_from_row).transpose()
    }

    /// Write every mutable column of `song`
    async fn store(tx: &mut Transaction<'_, Sqlite>, song: &Song) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE songs
            SET title = ?, artist = ?, youtube_id = ?, youtube_url = ?, thumbnail = ?,
                views = ?, status = ?, rejection_reason = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.youtube_id)
        .bind(&song.youtube_url)
        .bind(&song.thumbnail)
        .bind(song.views)
        .bind(song.status.as_str())
        .bind(&song.rejection_reason)
        .bind(ts(song.updated_at))
        .bind(song.deleted_at.map(ts))
        .bind(song.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::from_write(e, format!("youtube_id {}", song.youtube_id)))?;

        Ok(())
    }

    async fn fetch_page(
        &self,
        where_clause: &str,
        order_by: &str,
        status: Option<SongStatus>,
        skip: i64,
        page: PageRequest,
    ) -> Result<Page<Song>> {
        let count_sql = format!("SELECT COUNT(*) FROM songs WHERE {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = status {
            count_query = count_query.bind(status.as_str());
        }
        let matching = count_query.fetch_one(&self.pool).await?;

        let sql = format!(
            "SELECT {} FROM songs WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            SONG_COLUMNS, where_clause, order_by
        );
        let mut query = sqlx::query(&sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        let rows = query
            .bind(page.per_page)
            .bind(skip.saturating_add(page.offset()))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.iter().map(song_from_row).collect::<Result<_>>()?,
            total: (matching - skip).max(0),
            request: page,
        })
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_top(&self, limit: i64) -> Result<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs WHERE status = 'approved' AND deleted_at IS NULL \
             ORDER BY views DESC, id ASC LIMIT ?",
            SONG_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(song_from_row).collect()
    }

    async fn find_remaining(&self, page: PageRequest) -> Result<Page<Song>> {
        self.fetch_page(
            "status = 'approved' AND deleted_at IS NULL",
            "views DESC, id ASC",
            None,
            TOP_SONGS,
            page,
        )
        .await
    }

    async fn find_by_status(&self, status: SongStatus, page: PageRequest) -> Result<Page<Song>> {
        self.fetch_page(
            "status = ? AND deleted_at IS NULL",
            "created_at DESC, id DESC",
            Some(status),
            0,
            page,
        )
        .await
    }

    async fn find_all(&self, status: Option<SongStatus>, page: PageRequest) -> Result<Page<Song>> {
        match status {
            Some(status) => self.find_by_status(status, page).await,
            None => {
                self.fetch_page("deleted_at IS NULL", "created_at DESC, id DESC", None, 0, page)
                    .await
            }
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        let sql = format!("SELECT {} FROM songs WHERE id = ? AND deleted_at IS NULL", SONG_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(song_from_row).transpose()
    }

    async fn find_by_id_with_deleted(&self, id: i64) -> Result<Option<Song>> {
        let sql = format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(song_from_row).transpose()
    }

    async fn find_by_youtube_id(&self, youtube_id: &str) -> Result<Option<Song>> {
        let sql = format!("SELECT {} FROM songs WHERE youtube_id = ?", SONG_COLUMNS);
        let row = sqlx::query(&sql).bind(youtube_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(song_from_row).transpose()
    }

    async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create(&self, song: NewSong) -> Result<Song> {
        let created = now();
        let sql = format!(
            r#"
            INSERT INTO songs (title, artist, youtube_id, youtube_url, thumbnail, views, status,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            SONG_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&song.title)
            .bind(&song.artist)
            .bind(&song.video.youtube_id)
            .bind(&song.video.youtube_url)
            .bind(&song.video.thumbnail)
            .bind(song.video.views)
            .bind(song.status.as_str())
            .bind(ts(created))
            .bind(ts(created))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::from_write(e, format!("youtube_id {}", song.video.youtube_id)))?;

        song_from_row(&row)
    }

    async fn update(&self, id: i64, changes: SongChanges) -> Result<Song> {
        let mut tx = self.pool.begin().await?;

        let mut song = Self::fetch_song(&mut tx, id, false)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))?;
        song.apply(&changes, now());
        Self::store(&mut tx, &song).await?;

        tx.commit().await?;
        Ok(song)
    }

    async fn soft_delete(&self, id: i64) -> Result<SoftDelete> {
        let mut tx = self.pool.begin().await?;

        let mut song = Self::fetch_song(&mut tx, id, true)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))?;
        if song.is_deleted() {
            return Ok(SoftDelete::AlreadyDeleted(song));
        }

        let at = now();
        song.deleted_at = Some(at);
        song.updated_at = at;
        Self::store(&mut tx, &song).await?;

        tx.commit().await?;
        Ok(SoftDelete::Deleted(song))
    }

    async fn restore(&self, id: i64, changes: SongChanges) -> Result<Song> {
        let mut tx = self.pool.begin().await?;

        let mut song = Self::fetch_song(&mut tx, id, true)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))?;
        song.apply(&changes, now());
        song.deleted_at = None;
        Self::store(&mut tx, &song).await?;

        tx.commit().await?;
        Ok(song)
    }
}

// ========================================
// Users and tokens
// ========================================

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let created = now();
        let email = normalize_email(&user.email);
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&user.name)
            .bind(&email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(ts(created))
            .bind(ts(created))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::from_write(e, format!("email {}", email)))?;

        Ok(user_record_from_row(&row)?.user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_record_from_row).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_record_from_row).transpose()?.map(|r| r.user))
    }

    async fn create_token(&self, user_id: i64, token_hash: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO personal_access_tokens (user_id, token_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(ts(now()))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::from_write(e, "access token"))?;

        Ok(())
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.role, u.created_at, u.updated_at
            FROM personal_access_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token_hash = ?
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = user_record_from_row(&row)?;

        sqlx::query("UPDATE personal_access_tokens SET last_used_at = ? WHERE token_hash = ?")
            .bind(ts(now()))
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(Some(record.user))
    }

    async fn revoke_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM personal_access_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
