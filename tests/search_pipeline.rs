mod common;

use std::time::Duration;

use common::{catalog_page, Harness, TTL_SECONDS};
use nearby_events::cache::CacheStore;
use nearby_events::error::AppError;
use nearby_events::geo::Coordinate;
use nearby_events::models::{RawCatalogResponse, User};
use nearby_events::persistence::EventRepository;

fn springfield() -> Coordinate {
    Coordinate::new(37.7749, -122.4194)
}

fn two_events() -> RawCatalogResponse {
    catalog_page(&[
        ("e1", "Opening Night", 2.5, "Rock"),
        ("e2", "Late Show", 0.8, "Jazz"),
    ])
}

#[tokio::test]
async fn miss_fills_cache_and_hit_skips_catalog() {
    let h = Harness::new();
    h.source.reply(None, two_events());

    let first = h.state.events.search(springfield(), None, "u1").await;
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, "e1");
    assert_eq!(first[0].address, "1 Main St, Springfield, IL");
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.cache.len().await, 1);

    let second = h.state.events.search(springfield(), None, "u1").await;
    assert_eq!(second, first);
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn nearby_points_share_a_bucket() {
    let h = Harness::new();
    h.source.reply(None, two_events());

    h.state.events.search(Coordinate::new(37.77490, -122.41940), None, "u1").await;
    h.state.events.search(Coordinate::new(37.77491, -122.41941), None, "u1").await;

    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn empty_keyword_uses_the_default_key() {
    let h = Harness::new();
    h.source.reply(None, two_events());

    h.state.events.search(springfield(), None, "u1").await;
    let hit = h.state.events.search(springfield(), Some(""), "u1").await;

    assert_eq!(hit.len(), 2);
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn keywords_are_cached_separately() {
    let h = Harness::new();
    h.source.reply(None, two_events());
    h.source.reply(Some("jazz"), catalog_page(&[("e2", "Late Show", 0.8, "Jazz")]));

    h.state.events.search(springfield(), None, "u1").await;
    let jazz = h.state.events.search(springfield(), Some("jazz"), "u1").await;

    assert_eq!(jazz.len(), 1);
    assert_eq!(h.source.calls(), 2);
    assert_eq!(h.cache.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_refetched() {
    let h = Harness::new();
    h.source.reply(None, two_events());

    h.state.events.search(springfield(), None, "u1").await;
    tokio::time::advance(Duration::from_secs(TTL_SECONDS - 1)).await;
    h.state.events.search(springfield(), None, "u1").await;
    assert_eq!(h.source.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    h.state.events.search(springfield(), None, "u1").await;
    assert_eq!(h.source.calls(), 2);
    assert_eq!(h.repository.event_batches().await, 2);
}

#[tokio::test]
async fn catalog_failure_returns_empty_without_caching() {
    let h = Harness::new();
    h.source.unavailable(None);

    let events = h.state.events.search(springfield(), None, "u1").await;

    assert!(events.is_empty());
    assert!(h.cache.is_empty().await);
    assert_eq!(h.repository.event_batches().await, 0);

    // The next request tries the catalog again.
    h.state.events.search(springfield(), None, "u1").await;
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn malformed_cache_entry_counts_as_miss() {
    let h = Harness::new();
    h.source.reply(None, two_events());

    let keys = h.state.events.keys();
    let key = keys.cache_key(&keys.bucket(springfield()), None);
    h.cache.set(&key, b"{not json", 60).await.unwrap();

    let events = h.state.events.search(springfield(), None, "u1").await;
    assert_eq!(events.len(), 2);
    assert_eq!(h.source.calls(), 1);

    let repaired = h.cache.get(&key).await.unwrap().unwrap();
    let decoded: RawCatalogResponse = serde_json::from_slice(&repaired).unwrap();
    assert_eq!(decoded, two_events());
}

#[tokio::test]
async fn only_misses_are_persisted() {
    let h = Harness::new();
    h.source.reply(None, two_events());

    h.state.events.search(springfield(), None, "u1").await;
    h.state.events.search(springfield(), None, "u1").await;
    h.state.events.search(springfield(), None, "u1").await;

    assert_eq!(h.repository.event_batches().await, 1);
    assert_eq!(h.repository.category_count().await, 2);
    let stored = h.repository.find_event_by_id("e2").await.unwrap().unwrap();
    assert_eq!(stored.name, "Late Show");
    assert!(!stored.favorite);
    assert_eq!(
        h.repository.find_categories_by_event_id("e1").await.unwrap(),
        vec!["Rock"]
    );
}

#[tokio::test(start_paused = true)]
async fn refetched_event_replaces_stored_row_and_categories() {
    let h = Harness::new();
    h.source.reply(None, catalog_page(&[("e1", "Matinee", 5.0, "Rock")]));
    h.state.events.search(springfield(), None, "u1").await;

    tokio::time::advance(Duration::from_secs(TTL_SECONDS + 1)).await;
    h.source.reply(None, catalog_page(&[("e1", "Evening Show", 1.5, "Jazz")]));
    h.state.events.search(springfield(), None, "u1").await;

    assert_eq!(h.source.calls(), 2);
    let stored = h.repository.find_event_by_id("e1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Evening Show");
    assert_eq!(stored.distance, 1.5);
    assert_eq!(
        h.repository.find_categories_by_event_id("e1").await.unwrap(),
        vec!["Jazz"]
    );
    assert!(!stored.categories.contains("Rock"));
}

#[tokio::test]
async fn categories_differing_in_case_share_one_row() {
    let h = Harness::new();
    h.source.reply(
        None,
        catalog_page(&[("e1", "A", 1.0, "Rock"), ("e2", "B", 2.0, "ROCK")]),
    );

    h.state.events.search(springfield(), None, "u1").await;

    assert_eq!(h.repository.category_count().await, 1);
}

#[tokio::test]
async fn duplicate_catalog_ids_collapse_to_first() {
    let h = Harness::new();
    h.source.reply(
        None,
        catalog_page(&[("e1", "First", 1.0, "Rock"), ("e1", "Second", 2.0, "Rock")]),
    );

    let events = h.state.events.search(springfield(), None, "u1").await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "First");
}

#[tokio::test]
async fn favorites_are_flagged_on_cache_hits() {
    let h = Harness::new();
    h.repository.save_user(&User::new("u1", "Ada", "Lovelace")).await.unwrap();
    h.source.reply(None, two_events());

    h.state.events.search(springfield(), None, "u1").await;
    h.state.events.set_favorite("u1", "e2").await.unwrap();

    let events = h.state.events.search(springfield(), None, "u1").await;
    let flags: Vec<(&str, bool)> = events.iter().map(|e| (e.id.as_str(), e.favorite)).collect();
    assert_eq!(flags, vec![("e1", false), ("e2", true)]);

    let other = h.state.events.search(springfield(), None, "u2").await;
    assert!(other.iter().all(|e| !e.favorite));
}

#[tokio::test]
async fn favorites_require_known_user_and_event() {
    let h = Harness::new();
    h.repository.save_user(&User::new("u1", "Ada", "Lovelace")).await.unwrap();
    h.source.reply(None, two_events());
    h.state.events.search(springfield(), None, "u1").await;

    let err = h.state.events.set_favorite("ghost", "e1").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "User", .. }));

    let err = h.state.events.set_favorite("u1", "missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "Event", .. }));

    let err = h.state.events.favorite_events("ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn favorite_list_follows_favorited_order() {
    let h = Harness::new();
    h.repository.save_user(&User::new("u1", "Ada", "Lovelace")).await.unwrap();
    h.source.reply(None, two_events());
    h.state.events.search(springfield(), None, "u1").await;

    h.state.events.set_favorite("u1", "e2").await.unwrap();
    h.state.events.set_favorite("u1", "e1").await.unwrap();
    h.state.events.set_favorite("u1", "e2").await.unwrap();

    let favorites = h.state.events.favorite_events("u1").await.unwrap();
    let ids: Vec<&str> = favorites.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e2", "e1"]);
    assert!(favorites.iter().all(|e| e.favorite));
    assert!(favorites[0].categories.contains("Jazz"));

    h.state.events.unset_favorite("u1", "e2").await.unwrap();
    h.state.events.unset_favorite("u1", "e2").await.unwrap();
    let remaining = h.state.events.favorite_events("u1").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "e1");
}
