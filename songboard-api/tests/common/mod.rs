//! Shared test fixtures: in-memory state, a counting fake resolver and
//! request helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use serde_json::Value;
use songboard_api::context::{Caller, RequestContext};
use songboard_api::repository::{
    InMemorySongRepository, InMemoryUserRepository, SongRepository, UserRepository,
};
use songboard_api::resolver::{extract_video_id, ResolverError, VideoMetadata, VideoMetadataResolver};
use songboard_api::{build_router, AppState};
use songboard_common::auth::{generate_token, hash_token};
use songboard_common::song::{thumbnail_url, watch_url, DEFAULT_ARTIST};
use songboard_common::{NewSong, NewUser, Role, Song, SongStatus, User, VideoFields};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Fake resolver
// =============================================================================

/// Resolves any recognizable URL to `Title <id>`; counts calls
#[derive(Default)]
pub struct FakeResolver {
    calls: AtomicUsize,
    views: Mutex<HashMap<String, u64>>,
    failure: Mutex<Option<ResolverError>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_views(&self, video_id: &str, views: u64) {
        self.views.lock().unwrap().insert(video_id.to_string(), views);
    }

    pub fn fail_with(&self, err: ResolverError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoMetadataResolver for FakeResolver {
    async fn resolve(&self, url: &str) -> Result<VideoMetadata, ResolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let video_id = extract_video_id(url).ok_or(ResolverError::InvalidUrl)?;
        let views = self.views.lock().unwrap().get(&video_id).copied().unwrap_or(1_000);

        Ok(VideoMetadata {
            title: format!("Title {}", video_id),
            thumbnail: thumbnail_url(&video_id),
            video_id,
            views,
        })
    }
}

// =============================================================================
// Application fixture
// =============================================================================

static EMAIL_SEQ: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub state: AppState,
    pub songs: Arc<InMemorySongRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub resolver: Arc<FakeResolver>,
}

impl TestApp {
    pub fn new() -> Self {
        let songs = Arc::new(InMemorySongRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let resolver = Arc::new(FakeResolver::new());

        let state = AppState::new(songs.clone(), users.clone(), resolver.clone(), DEFAULT_ARTIST);

        Self {
            state,
            songs,
            users,
            resolver,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Register an account directly and return its plaintext bearer token
    pub async fn token_for(&self, role: Role) -> String {
        self.user_with_token(role).await.1
    }

    pub async fn user_with_token(&self, role: Role) -> (User, String) {
        let n = EMAIL_SEQ.fetch_add(1, Ordering::SeqCst);
        let user = self
            .users
            .create(NewUser {
                name: format!("{} {}", role, n),
                email: format!("{}{}@example.com", role, n),
                password_hash: "unused".to_string(),
                role,
            })
            .await
            .unwrap();

        let token = generate_token();
        self.users.create_token(user.id, &hash_token(&token)).await.unwrap();
        (user, token)
    }

    /// Insert a song straight into the repository
    pub async fn add_song(&self, youtube_id: &str, views: i64, status: SongStatus) -> Song {
        self.songs.create(new_song(youtube_id, views, status)).await.unwrap()
    }
}

pub fn new_song(youtube_id: &str, views: i64, status: SongStatus) -> NewSong {
    NewSong {
        title: format!("Title {}", youtube_id),
        artist: DEFAULT_ARTIST.to_string(),
        video: VideoFields {
            youtube_url: watch_url(youtube_id),
            youtube_id: youtube_id.to_string(),
            thumbnail: thumbnail_url(youtube_id),
            views,
        },
        status,
    }
}

// =============================================================================
// Request contexts
// =============================================================================

pub fn ctx_with_role(role: Role) -> RequestContext {
    let now = chrono::Utc::now();
    RequestContext::for_caller(Caller {
        user: User {
            id: if role.is_admin() { 1 } else { 2 },
            name: role.to_string(),
            email: format!("{}@example.com", role),
            role,
            created_at: now,
            updated_at: now,
        },
        token_hash: hash_token(role.as_str()),
    })
}

pub fn admin_ctx() -> RequestContext {
    ctx_with_role(Role::Admin)
}

pub fn user_ctx() -> RequestContext {
    ctx_with_role(Role::User)
}

pub fn anon_ctx() -> RequestContext {
    RequestContext::anonymous()
}

// =============================================================================
// HTTP helpers
// =============================================================================

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, None)
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
