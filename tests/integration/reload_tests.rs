//! Registry reload integration tests.
//!
//! Tests verify:
//! - Reloads are visible to requests started afterwards
//! - Requests holding a snapshot keep resolving against it
//! - Failed reloads leave the previous registry in place
//! - Directories added through the settings file become servable after reload

use std::path::PathBuf;

use axum::http::StatusCode;

use keepr_assets::{
    create_router, AssetPath, AssetQuery, AssetService, ConfigError, DirectoryRegistry,
    DirectorySource, RegistryError, RegistryHandle, RouterConfig, SettingsStore,
};

use super::test_utils::{assert_not_found, get, AssetFixture, MemorySource};

#[tokio::test]
async fn test_reload_visible_to_new_requests() {
    let fixture = AssetFixture::new(2);
    fixture.write(0, "a.txt", b"first");
    fixture.write(1, "a.txt", b"second");

    let source = MemorySource::new(vec![fixture.root(0).to_path_buf()]);
    let registry = RegistryHandle::new(DirectoryRegistry::empty());
    registry.reload_from(&source).await.unwrap();

    let router = create_router(
        AssetService::new(registry.clone()),
        RouterConfig::new().with_tracing(false),
    );

    let (status, _, body) = get(router.clone(), "/0/a.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"first");

    let (status, _, body) = get(router.clone(), "/1/a.txt").await;
    assert_not_found(status, &body);

    // Reorder and extend
    source
        .set(vec![fixture.root(1).to_path_buf(), fixture.root(0).to_path_buf()])
        .await;
    let snapshot = registry.reload_from(&source).await.unwrap();
    assert_eq!(snapshot.count(), 2);

    let (_, _, body) = get(router.clone(), "/0/a.txt").await;
    assert_eq!(&body[..], b"second");
    let (_, _, body) = get(router.clone(), "/1/a.txt").await;
    assert_eq!(&body[..], b"first");

    let (_, _, body) = get(router, "/health").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["directories"], 2);
}

#[tokio::test]
async fn test_snapshot_survives_reload() {
    let fixture = AssetFixture::new(2);
    fixture.write(0, "a.txt", b"old");
    fixture.write(1, "a.txt", b"new");

    let service = AssetService::new(RegistryHandle::new(
        DirectoryRegistry::new([fixture.root(0).to_path_buf()]).unwrap(),
    ));

    // A request that has already captured its snapshot
    let captured = service.registry().snapshot();
    let asset = AssetPath::parse("/0/a.txt").unwrap();

    let source = MemorySource::new(vec![fixture.root(1).to_path_buf()]);
    service.registry().reload_from(&source).await.unwrap();

    let response = service
        .fetch_in(&captured, &asset, &AssetQuery::default())
        .await
        .unwrap();
    assert_eq!(&response.into_bytes().await.unwrap()[..], b"old");

    let response = service.fetch("/0/a.txt", &AssetQuery::default()).await.unwrap();
    assert_eq!(&response.into_bytes().await.unwrap()[..], b"new");
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_registry() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.txt", b"kept");

    let registry = RegistryHandle::new(fixture.registry());
    let service = AssetService::new(registry.clone());

    let bad = MemorySource::new(vec![PathBuf::from("relative/photos")]);
    let result = registry.reload_from(&bad).await;
    assert!(matches!(
        result,
        Err(ConfigError::Registry(RegistryError::NotAbsolute(_)))
    ));

    let duplicate = MemorySource::new(vec![
        fixture.root(0).to_path_buf(),
        fixture.root(0).join("."),
    ]);
    let result = registry.reload_from(&duplicate).await;
    assert!(matches!(
        result,
        Err(ConfigError::Registry(RegistryError::Duplicate { .. }))
    ));

    let response = service.fetch("/0/a.txt", &AssetQuery::default()).await.unwrap();
    assert_eq!(&response.into_bytes().await.unwrap()[..], b"kept");
}

#[tokio::test]
async fn test_concurrent_requests_during_reloads() {
    let fixture = AssetFixture::new(2);
    fixture.write(0, "a.txt", b"zero");
    fixture.write(1, "a.txt", b"one");

    let registry = RegistryHandle::new(fixture.registry());
    let service = AssetService::new(registry.clone());

    let roots_a = vec![fixture.root(0).to_path_buf(), fixture.root(1).to_path_buf()];
    let roots_b = vec![fixture.root(1).to_path_buf(), fixture.root(0).to_path_buf()];

    let reloader = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let source = MemorySource::new(roots_a.clone());
            for i in 0..50 {
                let roots = if i % 2 == 0 { roots_b.clone() } else { roots_a.clone() };
                source.set(roots).await;
                registry.reload_from(&source).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut requests = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        requests.push(tokio::spawn(async move {
            service.fetch("/0/a.txt", &AssetQuery::default()).await
        }));
    }

    reloader.await.unwrap();
    for request in requests {
        let data = request.await.unwrap().unwrap().into_bytes().await.unwrap();
        assert!(&data[..] == b"zero" || &data[..] == b"one");
    }
}

#[tokio::test]
async fn test_settings_store_add_then_reload() {
    let fixture = AssetFixture::new(2);
    fixture.write(1, "b.txt", b"added later");
    let config_dir = tempfile::TempDir::new().unwrap();

    let store = SettingsStore::open(config_dir.path().join("config.json"))
        .await
        .unwrap();
    assert_eq!(store.add_directory(fixture.root(0)).await.unwrap(), 0);

    let registry = RegistryHandle::new(DirectoryRegistry::empty());
    registry.reload_from(&store).await.unwrap();
    let router = create_router(
        AssetService::new(registry.clone()),
        RouterConfig::new().with_tracing(false),
    );

    let (status, _, body) = get(router.clone(), "/1/b.txt").await;
    assert_not_found(status, &body);

    assert_eq!(store.add_directory(fixture.root(1)).await.unwrap(), 1);
    registry.reload_from(&store).await.unwrap();

    let (status, _, body) = get(router, "/1/b.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"added later");
}
