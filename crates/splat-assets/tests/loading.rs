mod common;

use std::sync::Arc;

use common::{BANANA, BANANA_PATH, GatedSource, banana_ply, init_tracing, optimize_options};
use splat_assets::{
    AssetConfig, AssetEvent, AssetManager, AssetState, CancellationToken, Error, LoadError,
    LoadOptions, Payload,
};

fn manager(source: &GatedSource) -> AssetManager {
    AssetManager::builder(source.clone())
        .without_compression()
        .build()
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    init_tracing();
    let (source, gate) = GatedSource::closed();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);
    let options = optimize_options();

    let (first, second, ()) = tokio::join!(
        manager.load_asset(BANANA, &options),
        manager.load_asset(BANANA, &options),
        async {
            tokio::task::yield_now().await;
            assert_eq!(manager.asset_state(BANANA, &options), AssetState::Loading);
            gate.open();
        }
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(source.fetches(), 1);
    assert!(Arc::ptr_eq(&first, &second));

    let names = first.attribute_names();
    assert!(names.contains(&"position"));
    assert!(names.contains(&"color"));
    assert!(names.contains(&"opacity"));
    assert!(first.bounds.is_some());
    assert_eq!(first.url, BANANA);

    // Served from the cache from now on.
    let third = manager.load_asset(BANANA, &options).await.unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn test_different_options_are_different_assets() {
    let source = GatedSource::open();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);

    let plain = manager
        .load_asset(BANANA, &LoadOptions::default())
        .await
        .unwrap();
    let optimized = manager.load_asset(BANANA, &optimize_options()).await.unwrap();

    assert_eq!(source.fetches(), 2);
    assert!(plain.bounds.is_none());
    assert!(optimized.bounds.is_some());
    assert_eq!(manager.cache_stats().asset_count, 2);
}

#[tokio::test]
async fn test_force_reload_bypasses_cache() {
    let source = GatedSource::open();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);
    let options = LoadOptions::default();

    let first = manager.load_asset(BANANA, &options).await.unwrap();
    let reloaded = manager
        .load_asset(BANANA, &options.clone().force_reload())
        .await
        .unwrap();

    assert_eq!(source.fetches(), 2);
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(first.payload, reloaded.payload);

    // The reload replaced the cached entry.
    let cached = manager.load_asset(BANANA, &options).await.unwrap();
    assert!(Arc::ptr_eq(&reloaded, &cached));
    assert_eq!(manager.cache_stats().asset_count, 1);
}

#[tokio::test]
async fn test_failure_leaves_cache_clean_and_retry_succeeds() {
    let source = GatedSource::open();
    let manager = manager(&source);
    let options = LoadOptions::default();

    let err = manager.load_asset(BANANA, &options).await.unwrap_err();
    match &err {
        Error::LoadFailure { url, cause } => {
            assert_eq!(url, BANANA);
            assert!(matches!(cause, LoadError::NotFound { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(manager.asset_state(BANANA, &options), AssetState::Failed);
    assert_eq!(manager.cache_stats().asset_count, 0);

    source.insert(BANANA_PATH, banana_ply());
    manager.load_asset(BANANA, &options).await.unwrap();
    assert_eq!(manager.asset_state(BANANA, &options), AssetState::Loaded);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_parse_failure_is_load_failure() {
    let source = GatedSource::open();
    source.insert("/assets/broken.ply", b"ply\nformat ascii 1.0\n".to_vec());
    let manager = manager(&source);

    let err = manager
        .load_asset("broken.ply", &LoadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::LoadFailure {
            cause: LoadError::Parse { context: "ply", .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_unsupported_format_never_fetches() {
    let source = GatedSource::open();
    let manager = manager(&source);

    let err = manager
        .load_asset("scene.gltf", &LoadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { .. }));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn test_cancelling_leader_cancels_followers() {
    let (source, _gate) = GatedSource::closed();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);
    let options = LoadOptions::default();
    let token = CancellationToken::new();

    let (leader, follower, ()) = tokio::join!(
        manager.load_asset_cancellable(BANANA, &options, &token),
        manager.load_asset(BANANA, &options),
        async {
            tokio::task::yield_now().await;
            token.cancel();
        }
    );

    assert!(matches!(leader, Err(Error::Cancelled { .. })));
    assert!(matches!(follower, Err(Error::Cancelled { .. })));
    assert_ne!(manager.asset_state(BANANA, &options), AssetState::Loading);
    assert_eq!(manager.cache_stats().asset_count, 0);
}

#[tokio::test]
async fn test_cancelling_follower_only_stops_follower() {
    let (source, gate) = GatedSource::closed();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);
    let options = LoadOptions::default();
    let token = CancellationToken::new();

    let (leader, follower, ()) = tokio::join!(
        manager.load_asset(BANANA, &options),
        manager.load_asset_cancellable(BANANA, &options, &token),
        async {
            tokio::task::yield_now().await;
            token.cancel();
            tokio::task::yield_now().await;
            gate.open();
        }
    );

    assert!(leader.is_ok());
    assert!(matches!(follower, Err(Error::Cancelled { .. })));
    assert_eq!(manager.asset_state(BANANA, &options), AssetState::Loaded);
}

#[tokio::test]
async fn test_lifecycle_events() {
    let source = GatedSource::open();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);
    let mut events = manager.subscribe();

    let asset = manager
        .load_asset(BANANA, &LoadOptions::default())
        .await
        .unwrap();
    let _ = manager.load_asset("missing.json", &LoadOptions::default()).await;
    manager.clear_cache();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(matches!(&seen[0], AssetEvent::LoadStarted { url } if url == BANANA));
    assert!(matches!(
        &seen[1],
        AssetEvent::LoadProgress { percentage: Some(p), .. } if (*p - 100.0).abs() < f64::EPSILON
    ));
    assert!(matches!(
        &seen[2],
        AssetEvent::LoadCompleted { size, .. } if *size == asset.byte_size()
    ));
    assert!(seen.iter().any(|e| matches!(
        e,
        AssetEvent::LoadFailed { url, error: Error::LoadFailure { .. } } if url == "missing.json"
    )));
    assert!(matches!(seen.last(), Some(AssetEvent::CacheCleared)));
}

#[tokio::test]
async fn test_concurrency_cap() {
    let (source, gate) = GatedSource::closed();
    source.insert("/assets/a.bin", vec![1]);
    source.insert("/assets/b.bin", vec![2]);
    let manager = AssetManager::builder(source.clone())
        .config(AssetConfig {
            max_concurrent_loads: Some(1),
            ..AssetConfig::default()
        })
        .without_compression()
        .build();
    let options = LoadOptions::default();

    let (a, b, ()) = tokio::join!(
        manager.load_asset("a.bin", &options),
        manager.load_asset("b.bin", &options),
        async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            assert_eq!(source.fetches(), 1);
            gate.open();
        }
    );

    assert_eq!(a.unwrap().payload, Payload::Bytes(vec![1]));
    assert_eq!(b.unwrap().payload, Payload::Bytes(vec![2]));
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_loads_settling_after_shutdown_are_not_cached() {
    let (source, gate) = GatedSource::closed();
    source.insert(BANANA_PATH, banana_ply());
    let manager = manager(&source);
    let options = LoadOptions::default();

    let (result, ()) = tokio::join!(manager.load_asset(BANANA, &options), async {
        tokio::task::yield_now().await;
        manager.shutdown();
        gate.open();
    });

    assert!(result.is_ok());
    assert_eq!(manager.cache_stats().asset_count, 0);
    assert_eq!(manager.asset_state(BANANA, &options), AssetState::Unloaded);

    // A fresh load after shutdown is cached as usual.
    manager.load_asset(BANANA, &options).await.unwrap();
    assert_eq!(manager.asset_state(BANANA, &options), AssetState::Loaded);
}
