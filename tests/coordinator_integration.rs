//! Integration tests for the full adaptation stack.
//!
//! These tests drive the coordinator end to end over pushed telemetry:
//! - healthy networks dispatch preloads into the offline cache
//! - degraded and flapping connections flip policy and suppress preloads
//! - offline loads resolve from cache, and timeouts race under paused time
//!
//! Run with: `cargo test --test coordinator_integration`

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use adaptive_loader::connectivity::RetryStrategy;
use adaptive_loader::coordinator::RecommendationReason;
use adaptive_loader::fetch::StaticFetcher;
use adaptive_loader::telemetry::{EffectiveClass, StaticTelemetry};
use adaptive_loader::{
    AdaptationCoordinator, LoadContext, LoadError, LoaderConfig, NetworkReading, Priority,
    ReasonTag,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Helper Functions
// ============================================================================

/// Capture component logs in test output; `RUST_LOG` overrides the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

fn excellent_reading() -> NetworkReading {
    NetworkReading::new(EffectiveClass::FourG, 10.0, 50.0)
}

fn constrained_reading() -> NetworkReading {
    NetworkReading::new(EffectiveClass::Slow2g, 0.3, 2000.0).with_save_data(true)
}

fn setup(reading: NetworkReading) -> (AdaptationCoordinator, Arc<StaticFetcher>) {
    init_tracing();
    let telemetry = Arc::new(StaticTelemetry::with_reading(reading));
    let fetcher = Arc::new(StaticFetcher::new());
    let coordinator = AdaptationCoordinator::new(
        telemetry as _,
        Arc::clone(&fetcher) as _,
        LoaderConfig::default(),
    );
    (coordinator, fetcher)
}

async fn settle_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Healthy Network
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_excellent_link_scores_high_and_parallelizes() {
    let (coordinator, _) = setup(excellent_reading());

    let metrics = coordinator.metrics();
    assert!(metrics.quality.score > 0.8, "got {}", metrics.quality.score);
    assert_eq!(metrics.strategy.max_concurrent_loads, 6);
    assert!(metrics.strategy.allow_preload);
}

#[tokio::test(start_paused = true)]
async fn test_preload_then_offline_load_round_trip() {
    let (coordinator, fetcher) = setup(excellent_reading());
    fetcher.insert("bundle", &b"payload"[..]);

    assert!(coordinator.request_preload("bundle", Priority::Normal, ReasonTag::Viewport, 0.9, 100));
    settle_tasks().await;

    // Connection drops; the preloaded copy keeps the resource available.
    coordinator.monitor().set_online(false);
    let bytes = coordinator
        .load_resource("bundle", Priority::Normal, &LoadContext::none())
        .await
        .expect("served from cache while offline");
    assert_eq!(bytes, Bytes::from_static(b"payload"));
}

// ============================================================================
// Constrained Network
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_save_data_link_recommends_cache_first() {
    let (coordinator, _) = setup(constrained_reading());

    let rec = coordinator.loading_recommendation("any", Priority::Normal, &LoadContext::none());
    assert_eq!(rec.reason, RecommendationReason::PoorQuality);
    assert!(rec.use_cache_first);
    assert!(!rec.should_preload);

    // Strategy side: one load at a time, no speculative traffic.
    let strategy = coordinator.metrics().strategy;
    assert_eq!(strategy.max_concurrent_loads, 1);
    assert!(!strategy.allow_preload);
}

#[tokio::test(start_paused = true)]
async fn test_poor_quality_suppresses_preloads() {
    let (coordinator, fetcher) = setup(constrained_reading());
    fetcher.insert("bundle", &b"x"[..]);

    assert!(!coordinator.request_preload("bundle", Priority::Normal, ReasonTag::Viewport, 0.9, 100));
    let metrics = coordinator.metrics();
    assert_eq!(metrics.preloads_suppressed, 1);
    assert_eq!(metrics.preloads_requested, 0);
}

// ============================================================================
// Intermittent Connectivity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_flapping_connection_goes_intermittent_and_suppresses_preloads() {
    let (coordinator, fetcher) = setup(excellent_reading());
    fetcher.insert("bundle", &b"x"[..]);

    // Three drops inside the five-minute window.
    for _ in 0..3 {
        coordinator.monitor().set_online(false);
        coordinator.monitor().set_online(true);
        settle_tasks().await;
    }

    let metrics = coordinator.metrics();
    assert!(metrics.intermittent);
    assert!(metrics.online);

    assert!(!coordinator.request_preload("bundle", Priority::Normal, ReasonTag::Viewport, 0.9, 100));
    assert_eq!(coordinator.metrics().preloads_suppressed, 1);

    let rec = coordinator.loading_recommendation("bundle", Priority::Normal, &LoadContext::none());
    assert_eq!(rec.reason, RecommendationReason::Intermittent);
}

#[tokio::test(start_paused = true)]
async fn test_flap_history_ages_out() {
    let (coordinator, _) = setup(excellent_reading());

    for _ in 0..3 {
        coordinator.monitor().set_online(false);
        coordinator.monitor().set_online(true);
    }
    assert!(coordinator.metrics().intermittent);

    tokio::time::advance(Duration::from_secs(301)).await;
    settle_tasks().await;
    assert!(!coordinator.metrics().intermittent);
}

#[tokio::test(start_paused = true)]
async fn test_reconnection_backoff_schedule() {
    let (coordinator, _) = setup(excellent_reading());
    // Under exponential backoff the fifth wait is sixteen seconds.
    assert_eq!(RetryStrategy::Exponential.delay(4), Duration::from_secs(16));

    coordinator.monitor().set_online(false);
    settle_tasks().await;

    // 1 s + 2 s + 4 s + 8 s of failed attempts; each attempt's timer is only
    // registered after the previous one fires, so advance step by step.
    for step in [1u64, 2, 4, 8] {
        tokio::time::advance(Duration::from_secs(step)).await;
        settle_tasks().await;
    }
    let state = coordinator.handler().connectivity_state();
    assert_eq!(state.reconnect_attempts, 4);
    assert!(state.offline_duration >= Duration::from_secs(15));

    coordinator.monitor().set_online(true);
    settle_tasks().await;
    let state = coordinator.handler().connectivity_state();
    assert_eq!(state.reconnect_attempts, 0);
    assert_eq!(state.offline_duration, Duration::ZERO);
}

// ============================================================================
// Offline Loads and Timeouts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_offline_miss_fails_fast_then_syncs_after_reconnect() {
    let (coordinator, fetcher) = setup(excellent_reading());

    coordinator.monitor().set_online(false);
    let err = coordinator
        .load_resource("late", Priority::Normal, &LoadContext::none())
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::OfflineNoCache { .. }));
    assert_eq!(coordinator.handler().connectivity_state().pending_sync, 1);

    fetcher.insert("late", &b"synced"[..]);
    coordinator.monitor().set_online(true);
    settle_tasks().await;

    // Let the drain task register its timer before each advance.
    for _ in 0..2 {
        tokio::time::advance(Duration::from_secs(1)).await;
        settle_tasks().await;
    }

    let entry = coordinator
        .handler()
        .cached_resource("late")
        .expect("refreshed in background");
    assert_eq!(entry.payload, Bytes::from_static(b"synced"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out_with_recommended_timeout() {
    init_tracing();
    let telemetry = Arc::new(StaticTelemetry::with_reading(excellent_reading()));
    let fetcher = Arc::new(StaticFetcher::with_latency(Duration::from_secs(120)));
    fetcher.insert("slow", &b"x"[..]);
    let coordinator = AdaptationCoordinator::new(
        telemetry as _,
        Arc::clone(&fetcher) as _,
        LoaderConfig::default(),
    );

    let rec = coordinator.loading_recommendation("slow", Priority::Normal, &LoadContext::none());
    let err = coordinator
        .load_resource("slow", Priority::Normal, &LoadContext::none())
        .await
        .unwrap_err();
    match err {
        LoadError::Timeout { timeout_ms, .. } => assert_eq!(timeout_ms, rec.timeout_ms),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_falls_back_to_cached_copy() {
    let (coordinator, _fetcher) = setup(excellent_reading());
    coordinator
        .handler()
        .cache_resource("doc", Bytes::from_static(b"stale"), Priority::Normal);

    // Nothing registered upstream, so the fetch fails; the cache saves it.
    let bytes = coordinator
        .load_resource("doc", Priority::Normal, &LoadContext::none())
        .await
        .expect("cache fallback");
    assert_eq!(bytes, Bytes::from_static(b"stale"));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_metrics_snapshot_is_consistent_after_destroy() {
    let (coordinator, fetcher) = setup(excellent_reading());
    fetcher.insert("a", &b"x"[..]);

    let _ = coordinator
        .load_resource("a", Priority::Normal, &LoadContext::none())
        .await;
    coordinator.destroy();

    let metrics = coordinator.metrics();
    assert_eq!(metrics.loads_issued, 1);
    assert!(coordinator
        .load_resource("a", Priority::Normal, &LoadContext::none())
        .await
        .is_err());
}
