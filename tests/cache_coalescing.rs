// tests/cache_coalescing.rs
//
// Cache freshness + refresh coalescing.
//
// Covered:
// - concurrent readers on a stale cache share one aggregation pass
// - reads inside the TTL never touch sources
// - TTL expiry triggers a new pass
// - forced refresh is visible to the next read
// - forced refresh joins an in-flight refresh

mod common;

use common::{config, two_source_client};
use parenting_tips::ingest::Aggregator;
use parenting_tips::CacheManager;
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

fn manager(client: Arc<common::MockClient>, ttl: Duration) -> Arc<CacheManager> {
    let cfg = config(&["sourceA", "sourceB"], &["sourceA"]);
    Arc::new(CacheManager::new(Aggregator::new(client, &cfg), ttl))
}

#[tokio::test]
async fn starts_empty_and_never_refreshed() {
    let client = Arc::new(two_source_client());
    let cache = manager(client.clone(), HOUR);

    let snap = cache.current();
    assert!(snap.items.is_empty());
    assert!(snap.last_refreshed_at.is_none());
    assert_eq!(client.calls(), 0);
    assert!(!cache.status().refreshing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stale_reads_trigger_one_refresh() {
    let client = Arc::new(two_source_client().with_delay(Duration::from_millis(100)));
    let cache = manager(client.clone(), HOUR);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let c = cache.clone();
        handles.push(tokio::spawn(async move { c.get_snapshot().await }));
    }
    let mut snaps = Vec::new();
    for h in handles {
        snaps.push(h.await.expect("join"));
    }

    // one pass = one fetch per source
    assert_eq!(client.calls(), 2);
    let first = &snaps[0];
    assert_eq!(first.items.len(), 2);
    assert!(snaps.iter().all(|s| Arc::ptr_eq(s, first)));
    assert_eq!(first.generation(), 1);
}

#[tokio::test]
async fn reads_within_ttl_do_not_fetch_again() {
    let client = Arc::new(two_source_client());
    let cache = manager(client.clone(), HOUR);

    let a = cache.get_snapshot().await;
    let calls_after_first = client.calls();
    let b = cache.get_snapshot().await;

    assert_eq!(calls_after_first, 2);
    assert_eq!(client.calls(), calls_after_first);
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn expired_snapshot_is_rebuilt() {
    const TTL: Duration = Duration::from_millis(50);
    let client = Arc::new(two_source_client());
    let cache = manager(client.clone(), TTL);

    let a = cache.get_snapshot().await;
    // well over TTL to avoid timer flakes
    tokio::time::sleep(TTL * 5).await;
    let b = cache.get_snapshot().await;

    assert_eq!(client.calls(), 4);
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(b.generation(), a.generation() + 1);
}

#[tokio::test]
async fn forced_refresh_is_visible_to_next_read() {
    let client = Arc::new(two_source_client());
    let cache = manager(client.clone(), HOUR);

    let before = cache.get_snapshot().await;
    let forced = cache.force_refresh().await;
    let after = cache.get_snapshot().await;

    assert_eq!(client.calls(), 4);
    assert!(!Arc::ptr_eq(&before, &forced));
    assert!(Arc::ptr_eq(&forced, &after));
    assert!(forced.last_refreshed_at >= before.last_refreshed_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forced_refresh_joins_in_flight_refresh() {
    let client = Arc::new(two_source_client().with_delay(Duration::from_millis(200)));
    let cache = manager(client.clone(), HOUR);

    let reader = {
        let c = cache.clone();
        tokio::spawn(async move { c.get_snapshot().await })
    };
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.status().refreshing, "first refresh should be in flight");

    let forced = cache.force_refresh().await;
    let read = reader.await.expect("join");

    assert_eq!(client.calls(), 2, "forced refresh must reuse the in-flight pass");
    assert!(Arc::ptr_eq(&forced, &read));
    assert!(!cache.status().refreshing);
}
