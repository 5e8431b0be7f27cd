//! Moderation service tests
//!
//! Tests cover:
//! - Ranking (top / remaining split, ordering, no overlap)
//! - Suggestion and direct creation, including duplicate handling
//! - Status transitions and rejection reasons
//! - Authorization (policy checked before lookup)
//! - Edits with and without URL changes
//! - Soft delete

mod common;

use async_trait::async_trait;
use common::{admin_ctx, anon_ctx, new_song, user_ctx, FakeResolver, TestApp};
use songboard_api::error::ServiceError;
use songboard_api::moderation::{CreateSong, EditSong, SongModerationService};
use songboard_api::pagination::{Page, PageRequest};
use songboard_api::repository::{InMemorySongRepository, SoftDelete, SongRepository};
use songboard_api::resolver::ResolverError;
use songboard_common::song::DEFAULT_ARTIST;
use songboard_common::{NewSong, Result, Song, SongChanges, SongStatus};
use std::collections::HashSet;
use std::sync::Arc;

fn page(page: i64, per_page: i64) -> PageRequest {
    PageRequest::new(Some(page), Some(per_page), 10)
}

fn url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

// =============================================================================
// Ranking
// =============================================================================

#[tokio::test]
async fn test_top_returns_at_most_five_approved_by_views() {
    let app = TestApp::new();
    for (i, views) in [10, 70, 30, 90, 50, 20, 80].iter().enumerate() {
        app.add_song(&format!("vid{}", i), *views, SongStatus::Approved).await;
    }
    app.add_song("pending1", 1_000, SongStatus::Pending).await;
    app.add_song("rejected1", 2_000, SongStatus::Rejected).await;

    let top = app.state.songs.top(&anon_ctx()).await.unwrap();

    let views: Vec<i64> = top.iter().map(|s| s.views).collect();
    assert_eq!(views, vec![90, 80, 70, 50, 30]);
    assert!(top.iter().all(|s| s.status == SongStatus::Approved));
}

#[tokio::test]
async fn test_top_with_fewer_than_five_approved() {
    let app = TestApp::new();
    app.add_song("a", 5, SongStatus::Approved).await;
    app.add_song("b", 9, SongStatus::Approved).await;
    app.add_song("c", 100, SongStatus::Pending).await;

    let top = app.state.songs.top(&anon_ctx()).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].views, 9);
}

#[tokio::test]
async fn test_top_and_remaining_split() {
    let app = TestApp::new();
    for (i, views) in [100, 90, 80, 70, 60, 50].iter().enumerate() {
        app.add_song(&format!("vid{}", i), *views, SongStatus::Approved).await;
    }

    let ctx = anon_ctx();
    let top = app.state.songs.top(&ctx).await.unwrap();
    let rest = app.state.songs.remaining(&ctx, page(1, 10)).await.unwrap();

    assert_eq!(top.iter().map(|s| s.views).collect::<Vec<_>>(), vec![100, 90, 80, 70, 60]);
    assert_eq!(rest.items.iter().map(|s| s.views).collect::<Vec<_>>(), vec![50]);
    assert_eq!(rest.total, 1);
}

#[tokio::test]
async fn test_top_and_remaining_cover_all_approved_without_overlap() {
    let app = TestApp::new();
    for i in 0..17 {
        app.add_song(&format!("vid{}", i), (i * 37 % 101) as i64, SongStatus::Approved).await;
    }
    app.add_song("hidden", 999_999, SongStatus::Pending).await;

    let ctx = anon_ctx();
    let top = app.state.songs.top(&ctx).await.unwrap();
    let mut seen: Vec<i64> = top.iter().map(|s| s.id).collect();

    let mut p = 1;
    loop {
        let rest = app.state.songs.remaining(&ctx, page(p, 4)).await.unwrap();
        assert_eq!(rest.total, 12);
        if rest.items.is_empty() {
            break;
        }
        seen.extend(rest.items.iter().map(|s| s.id));
        p += 1;
    }

    let unique: HashSet<i64> = seen.iter().copied().collect();
    assert_eq!(seen.len(), 17, "no song may appear twice");
    assert_eq!(unique.len(), 17);
}

#[tokio::test]
async fn test_remaining_past_last_page_is_empty() {
    let app = TestApp::new();
    for i in 0..7 {
        app.add_song(&format!("vid{}", i), i, SongStatus::Approved).await;
    }

    let rest = app.state.songs.remaining(&anon_ctx(), page(9, 10)).await.unwrap();
    assert!(rest.items.is_empty());
    assert_eq!(rest.total, 2);
}

#[tokio::test]
async fn test_remaining_with_huge_page_never_repeats_top() {
    let app = TestApp::new();
    for i in 0..6 {
        app.add_song(&format!("vid{}", i), 100 - i, SongStatus::Approved).await;
    }

    let rest = app
        .state
        .songs
        .remaining(&anon_ctx(), page(i64::MAX, 10))
        .await
        .unwrap();
    assert!(rest.items.is_empty());
    assert_eq!(rest.total, 1);
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn test_by_status_rejects_unknown_status() {
    let app = TestApp::new();

    let err = app
        .state
        .songs
        .by_status(&anon_ctx(), "bogus", page(1, 10))
        .await
        .unwrap_err();

    match err {
        ServiceError::InvalidArgument(msg) => {
            assert!(msg.contains("pending"));
            assert!(msg.contains("approved"));
            assert!(msg.contains("rejected"));
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_forces_approved_for_public() {
    let app = TestApp::new();
    app.add_song("a", 1, SongStatus::Approved).await;
    app.add_song("p", 1, SongStatus::Pending).await;
    app.add_song("r", 1, SongStatus::Rejected).await;

    let public = app
        .state
        .songs
        .list(&anon_ctx(), Some("pending"), page(1, 15))
        .await
        .unwrap();
    assert_eq!(public.total, 1);
    assert_eq!(public.items[0].status, SongStatus::Approved);

    let user = app.state.songs.list(&user_ctx(), None, page(1, 15)).await.unwrap();
    assert_eq!(user.total, 1);

    let admin_all = app.state.songs.list(&admin_ctx(), None, page(1, 15)).await.unwrap();
    assert_eq!(admin_all.total, 3);

    let admin_pending = app
        .state
        .songs
        .list(&admin_ctx(), Some("pending"), page(1, 15))
        .await
        .unwrap();
    assert_eq!(admin_pending.total, 1);
    assert_eq!(admin_pending.items[0].status, SongStatus::Pending);
}

#[tokio::test]
async fn test_list_newest_first() {
    let app = TestApp::new();
    let first = app.add_song("a", 1, SongStatus::Approved).await;
    let second = app.add_song("b", 1, SongStatus::Approved).await;

    let list = app.state.songs.list(&anon_ctx(), None, page(1, 15)).await.unwrap();
    assert_eq!(list.items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second.id, first.id]);
}

#[tokio::test]
async fn test_get_hides_unapproved_from_public() {
    let app = TestApp::new();
    let pending = app.add_song("p", 1, SongStatus::Pending).await;

    let err = app.state.songs.get(&anon_ctx(), pending.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let song = app.state.songs.get(&admin_ctx(), pending.id).await.unwrap();
    assert_eq!(song.id, pending.id);
}

// =============================================================================
// Suggestions and direct creation
// =============================================================================

#[tokio::test]
async fn test_suggest_creates_pending_with_resolved_metadata() {
    let app = TestApp::new();
    app.resolver.set_views("lpGGNA6_920", 5_000_000);

    let song = app
        .state
        .songs
        .suggest(&anon_ctx(), "https://youtu.be/lpGGNA6_920")
        .await
        .unwrap();

    assert_eq!(song.status, SongStatus::Pending);
    assert_eq!(song.youtube_id, "lpGGNA6_920");
    assert_eq!(song.youtube_url, "https://youtu.be/lpGGNA6_920");
    assert_eq!(song.title, "Title lpGGNA6_920");
    assert_eq!(song.artist, "Tião Carreiro & Pardinho");
    assert_eq!(song.views, 5_000_000);
    assert_eq!(song.thumbnail, "https://img.youtube.com/vi/lpGGNA6_920/hqdefault.jpg");
}

#[tokio::test]
async fn test_duplicate_suggestion_rejected() {
    let app = TestApp::new();
    let ctx = anon_ctx();
    app.state.songs.suggest(&ctx, &url("dup")).await.unwrap();

    let err = app.state.songs.suggest(&ctx, "https://youtu.be/dup").await.unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateSong(_)));
    assert_eq!(app.songs.count().await.unwrap(), 1);
}

/// Misses every duplicate pre-check, as when another request inserts the
/// same video between the check and the insert
struct RacingSongRepository {
    inner: InMemorySongRepository,
}

#[async_trait]
impl SongRepository for RacingSongRepository {
    async fn find_top(&self, limit: i64) -> Result<Vec<Song>> {
        self.inner.find_top(limit).await
    }

    async fn find_remaining(&self, page: PageRequest) -> Result<Page<Song>> {
        self.inner.find_remaining(page).await
    }

    async fn find_by_status(&self, status: SongStatus, page: PageRequest) -> Result<Page<Song>> {
        self.inner.find_by_status(status, page).await
    }

    async fn find_all(&self, status: Option<SongStatus>, page: PageRequest) -> Result<Page<Song>> {
        self.inner.find_all(status, page).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_id_with_deleted(&self, id: i64) -> Result<Option<Song>> {
        self.inner.find_by_id_with_deleted(id).await
    }

    async fn find_by_youtube_id(&self, _youtube_id: &str) -> Result<Option<Song>> {
        Ok(None)
    }

    async fn count(&self) -> Result<i64> {
        self.inner.count().await
    }

    async fn create(&self, song: NewSong) -> Result<Song> {
        self.inner.create(song).await
    }

    async fn update(&self, id: i64, changes: SongChanges) -> Result<Song> {
        self.inner.update(id, changes).await
    }

    async fn soft_delete(&self, id: i64) -> Result<SoftDelete> {
        self.inner.soft_delete(id).await
    }

    async fn restore(&self, id: i64, changes: SongChanges) -> Result<Song> {
        self.inner.restore(id, changes).await
    }
}

#[tokio::test]
async fn test_suggest_losing_insert_race_is_duplicate() {
    let inner = InMemorySongRepository::new();
    inner.create(new_song("race", 1, SongStatus::Pending)).await.unwrap();
    let songs = Arc::new(RacingSongRepository { inner });
    let service = SongModerationService::new(songs.clone(), Arc::new(FakeResolver::new()), DEFAULT_ARTIST);

    let err = service.suggest(&anon_ctx(), &url("race")).await.unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateSong(_)), "unexpected error: {:?}", err);
    assert_eq!(songs.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_suggest_of_deleted_video_is_duplicate() {
    let app = TestApp::new();
    let song = app.add_song("gone", 1, SongStatus::Approved).await;
    app.state.songs.remove(&admin_ctx(), song.id).await.unwrap();

    let err = app.state.songs.suggest(&anon_ctx(), &url("gone")).await.unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateSong(_)));
}

#[tokio::test]
async fn test_suggest_resolver_failure_writes_nothing() {
    let app = TestApp::new();
    app.resolver.fail_with(ResolverError::Fetch("HTTP 503".into()));

    let err = app.state.songs.suggest(&anon_ctx(), &url("abc")).await.unwrap_err();
    match err {
        ServiceError::InvalidSubmission(ResolverError::Fetch(msg)) => assert_eq!(msg, "HTTP 503"),
        other => panic!("expected InvalidSubmission, got {:?}", other),
    }
    assert_eq!(app.songs.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_suggest_invalid_url() {
    let app = TestApp::new();
    let err = app
        .state
        .songs
        .suggest(&anon_ctx(), "https://vimeo.com/123")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidSubmission(ResolverError::InvalidUrl)));
}

#[tokio::test]
async fn test_create_direct_is_approved_and_honours_overrides() {
    let app = TestApp::new();

    let song = app
        .state
        .songs
        .create_direct(
            &admin_ctx(),
            CreateSong {
                youtube_url: url("new1"),
                title: Some("Chico Mineiro".into()),
                artist: Some("  ".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(song.status, SongStatus::Approved);
    assert_eq!(song.title, "Chico Mineiro");
    assert_eq!(song.artist, "Tião Carreiro & Pardinho");
}

#[tokio::test]
async fn test_create_direct_restores_deleted_song() {
    let app = TestApp::new();
    let original = app.add_song("back", 1, SongStatus::Rejected).await;
    app.state.songs.remove(&admin_ctx(), original.id).await.unwrap();

    let song = app
        .state
        .songs
        .create_direct(
            &admin_ctx(),
            CreateSong {
                youtube_url: url("back"),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(song.id, original.id);
    assert_eq!(song.status, SongStatus::Approved);
    assert!(song.deleted_at.is_none());
    assert_eq!(app.songs.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_direct_active_duplicate() {
    let app = TestApp::new();
    app.add_song("here", 1, SongStatus::Pending).await;

    let err = app
        .state
        .songs
        .create_direct(
            &admin_ctx(),
            CreateSong {
                youtube_url: url("here"),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateSong(_)));
}

#[tokio::test]
async fn test_create_direct_requires_admin() {
    let app = TestApp::new();
    let attrs = CreateSong {
        youtube_url: url("x"),
        ..Default::default()
    };

    let err = app.state.songs.create_direct(&user_ctx(), attrs.clone()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = app.state.songs.create_direct(&anon_ctx(), attrs).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated));

    assert_eq!(app.resolver.calls(), 0, "policy is checked before resolving");
}

// =============================================================================
// Status transitions
// =============================================================================

#[tokio::test]
async fn test_reject_then_approve() {
    let app = TestApp::new();
    let song = app.add_song("s", 1, SongStatus::Pending).await;
    let admin = admin_ctx();

    let rejected = app
        .state
        .songs
        .reject(&admin, song.id, Some("Not a viola song".into()))
        .await
        .unwrap();
    assert_eq!(rejected.status, SongStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Not a viola song"));

    let approved = app.state.songs.approve(&admin, song.id).await.unwrap();
    assert_eq!(approved.status, SongStatus::Approved);
    assert_eq!(approved.rejection_reason, None);
}

#[tokio::test]
async fn test_approve_is_idempotent() {
    let app = TestApp::new();
    let song = app.add_song("s", 1, SongStatus::Approved).await;

    let again = app.state.songs.approve(&admin_ctx(), song.id).await.unwrap();
    assert_eq!(again.status, SongStatus::Approved);
}

#[tokio::test]
async fn test_approve_unknown_song() {
    let app = TestApp::new();
    let err = app.state.songs.approve(&admin_ctx(), 404).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_non_admin_cannot_moderate_any_status() {
    let app = TestApp::new();
    let user = user_ctx();

    let mut ids = Vec::new();
    for (i, status) in SongStatus::ALL.iter().enumerate() {
        ids.push(app.add_song(&format!("s{}", i), 1, *status).await.id);
    }
    // Policy runs before the lookup, so a missing song is also Forbidden
    ids.push(9_999);

    for id in ids {
        let songs = &app.state.songs;
        assert!(matches!(songs.approve(&user, id).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(songs.reject(&user, id, None).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(
            songs.edit(&user, id, EditSong { title: Some("x".into()), ..Default::default() }).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(songs.remove(&user, id).await, Err(ServiceError::Forbidden(_))));
    }

    for status in SongStatus::ALL {
        let page = app.state.songs.by_status(&admin_ctx(), status.as_str(), page(1, 10)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].status, status, "nothing changed");
    }
}

#[tokio::test]
async fn test_anonymous_moderation_is_unauthenticated() {
    let app = TestApp::new();
    let song = app.add_song("s", 1, SongStatus::Pending).await;

    let err = app.state.songs.approve(&anon_ctx(), song.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated));
}

// =============================================================================
// Edits
// =============================================================================

#[tokio::test]
async fn test_edit_with_unchanged_url_skips_resolver() {
    let app = TestApp::new();
    let song = app.add_song("keep", 42, SongStatus::Pending).await;

    let edited = app
        .state
        .songs
        .edit(
            &admin_ctx(),
            song.id,
            EditSong {
                title: Some("Terra Roxa".into()),
                youtube_url: Some(song.youtube_url.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(app.resolver.calls(), 0);
    assert_eq!(edited.title, "Terra Roxa");
    assert_eq!(edited.views, 42);
}

#[tokio::test]
async fn test_edit_rejects_blank_title_and_trims_values() {
    let app = TestApp::new();
    let song = app.add_song("trim", 1, SongStatus::Pending).await;
    let songs = &app.state.songs;

    let err = songs
        .edit(
            &admin_ctx(),
            song.id,
            EditSong {
                title: Some("  \t ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation { errors, .. } => assert!(errors.contains_key("title")),
        other => panic!("expected Validation, got {:?}", other),
    }

    let edited = songs
        .edit(
            &admin_ctx(),
            song.id,
            EditSong {
                title: Some("  Pagode em Brasília ".into()),
                artist: Some(" Tião Carreiro ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.title, "Pagode em Brasília");
    assert_eq!(edited.artist, "Tião Carreiro");
}

#[tokio::test]
async fn test_edit_with_new_url_refreshes_video_fields() {
    let app = TestApp::new();
    let song = app.add_song("old", 42, SongStatus::Approved).await;
    app.resolver.set_views("fresh", 77);

    let edited = app
        .state
        .songs
        .edit(
            &admin_ctx(),
            song.id,
            EditSong {
                youtube_url: Some("https://youtu.be/fresh".into()),
                status: Some(SongStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(app.resolver.calls(), 1);
    assert_eq!(edited.youtube_id, "fresh");
    assert_eq!(edited.youtube_url, "https://youtu.be/fresh");
    assert_eq!(edited.views, 77);
    assert_eq!(edited.thumbnail, "https://img.youtube.com/vi/fresh/hqdefault.jpg");
    assert_eq!(edited.status, SongStatus::Pending);
    assert_eq!(edited.title, song.title, "title is not taken from the resolver on edit");
}

#[tokio::test]
async fn test_edit_resolver_failure_leaves_song_untouched() {
    let app = TestApp::new();
    let song = app.add_song("old", 42, SongStatus::Approved).await;
    app.resolver.fail_with(ResolverError::Parse("no title".into()));

    let err = app
        .state
        .songs
        .edit(
            &admin_ctx(),
            song.id,
            EditSong {
                title: Some("Changed".into()),
                youtube_url: Some(url("other")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidSubmission(_)));

    let stored = app.songs.find_by_id(song.id).await.unwrap().unwrap();
    assert_eq!(stored, song);
}

#[tokio::test]
async fn test_edit_to_video_of_another_song() {
    let app = TestApp::new();
    let a = app.add_song("aaa", 1, SongStatus::Approved).await;
    app.add_song("bbb", 1, SongStatus::Approved).await;

    let err = app
        .state
        .songs
        .edit(
            &admin_ctx(),
            a.id,
            EditSong {
                youtube_url: Some(url("bbb")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateSong(_)));
}

#[tokio::test]
async fn test_edit_status_away_from_rejected_clears_reason() {
    let app = TestApp::new();
    let song = app.add_song("s", 1, SongStatus::Pending).await;
    let admin = admin_ctx();
    app.state.songs.reject(&admin, song.id, Some("low quality".into())).await.unwrap();

    let edited = app
        .state
        .songs
        .edit(
            &admin,
            song.id,
            EditSong {
                status: Some(SongStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.status, SongStatus::Pending);
    assert_eq!(edited.rejection_reason, None);
}

// =============================================================================
// Soft delete
// =============================================================================

#[tokio::test]
async fn test_deleted_song_leaves_lists_but_stays_auditable() {
    let app = TestApp::new();
    let song = app.add_song("del", 1, SongStatus::Pending).await;
    let admin = admin_ctx();

    app.state.songs.remove(&admin, song.id).await.unwrap();

    let pending = app
        .state
        .songs
        .by_status(&admin, "pending", page(1, 10))
        .await
        .unwrap();
    assert!(pending.items.is_empty());

    let audit = app.songs.find_by_id_with_deleted(song.id).await.unwrap().unwrap();
    assert!(audit.deleted_at.is_some());

    let err = app.state.songs.get(&admin, song.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_twice_is_noop_and_unknown_is_not_found() {
    let app = TestApp::new();
    let song = app.add_song("del", 1, SongStatus::Approved).await;
    let admin = admin_ctx();

    app.state.songs.remove(&admin, song.id).await.unwrap();
    let first = app.songs.find_by_id_with_deleted(song.id).await.unwrap().unwrap();

    app.state.songs.remove(&admin, song.id).await.unwrap();
    let second = app.songs.find_by_id_with_deleted(song.id).await.unwrap().unwrap();
    assert_eq!(first.deleted_at, second.deleted_at);

    let err = app.state.songs.remove(&admin, 12_345).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_deleted_song_excluded_from_ranking() {
    let app = TestApp::new();
    let best = app.songs.create(new_song("best", 1_000, SongStatus::Approved)).await.unwrap();
    app.add_song("next", 10, SongStatus::Approved).await;

    app.state.songs.remove(&admin_ctx(), best.id).await.unwrap();

    let top = app.state.songs.top(&anon_ctx()).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].youtube_id, "next");
}
