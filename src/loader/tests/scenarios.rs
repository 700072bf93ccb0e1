use std::sync::Arc;

use tempfile::TempDir;

use crate::Error;
use crate::loader::test_helpers::*;
use crate::types::UpdateStatus;

#[tokio::test]
async fn assets_on_disk_are_detected_and_only_the_missing_one_is_fetched() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = test_catalog(&temp_dir).await;

    // A prior update materialized two of the three assets
    let prior = test_loader(
        &catalog,
        &temp_dir,
        manifest("prior-update", vec![asset("vendor.js"), asset("styles.css")]),
        Arc::new(MockAssetSource::new()),
    );
    prior.run(&RecordingHandler::new()).await.unwrap();

    let mut launch = asset("app.js");
    launch.is_launch_asset = true;

    let source = Arc::new(MockAssetSource::new());
    let handler = RecordingHandler::new();
    let loader = test_loader(
        &catalog,
        &temp_dir,
        manifest(
            "next-update",
            vec![asset("vendor.js"), asset("styles.css"), launch],
        ),
        source.clone(),
    );

    let update = loader.run(&handler).await.unwrap().unwrap();
    assert_eq!(update.status, UpdateStatus::Ready);
    assert!(!update.has_skipped_assets);
    assert_eq!(update.launch_asset_key, Some("app.js".into()));

    // Exactly one fetch: the absent asset
    assert_eq!(source.fetched_keys(), vec!["app.js".to_string()]);

    // Progress stays bounded by total and closes at (3, 0, 3) exactly once
    let events = handler.progress_events();
    assert_eq!(events.len(), 3);
    let mut closed = 0;
    let mut last = (0, 0);
    for (_, successful, failed, total) in &events {
        assert_eq!(*total, 3);
        assert!(successful + failed <= 3);
        assert!(*successful >= last.0 && *failed >= last.1);
        if successful + failed == 3 {
            closed += 1;
        }
        last = (*successful, *failed);
    }
    assert_eq!(closed, 1);
    let (_, successful, failed, total) = events[2];
    assert_eq!((successful, failed, total), (3, 0, 3));
}

#[tokio::test]
async fn one_failed_asset_fails_the_run_but_keeps_the_successful_one() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = test_catalog(&temp_dir).await;

    let source = Arc::new(MockAssetSource::failing(&["flaky.bin"]));
    let handler = RecordingHandler::new();
    let loader = test_loader(
        &catalog,
        &temp_dir,
        manifest("partial-update", vec![asset("solid.bin"), asset("flaky.bin")]),
        source.clone(),
    );

    let err = loader.run(&handler).await.unwrap_err();
    assert!(matches!(
        err,
        Error::AssetsFailed {
            failed: 1,
            total: 2
        }
    ));

    // The update never reached a terminal status
    let update = catalog
        .load_update_by_id(&"partial-update".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.status, UpdateStatus::Pending);

    // The successfully fetched asset is durably recorded for the next run
    let solid = catalog
        .load_asset_by_key(&"solid.bin".into())
        .await
        .unwrap()
        .unwrap();
    let relative_path = solid.relative_path.unwrap();
    assert!(
        temp_dir
            .path()
            .join("updates")
            .join(&relative_path)
            .exists()
    );

    let (_, successful, failed, total) = handler.progress_events()[1];
    assert_eq!((successful, failed, total), (1, 1, 2));
}

#[tokio::test]
async fn interrupted_run_resumes_without_refetching() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = test_catalog(&temp_dir).await;

    let update_manifest = manifest("resumed-update", vec![asset("solid.bin"), asset("flaky.bin")]);

    let first_attempt = test_loader(
        &catalog,
        &temp_dir,
        update_manifest.clone(),
        Arc::new(MockAssetSource::failing(&["flaky.bin"])),
    );
    first_attempt
        .run(&RecordingHandler::new())
        .await
        .unwrap_err();

    // Second run: the previously fetched asset is found, only the failed one
    // is requested again
    let source = Arc::new(MockAssetSource::new());
    let second_attempt = test_loader(&catalog, &temp_dir, update_manifest, source.clone());
    let update = second_attempt
        .run(&RecordingHandler::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(update.status, UpdateStatus::Ready);
    assert_eq!(source.fetched_keys(), vec!["flaky.bin".to_string()]);
}

#[tokio::test]
async fn ready_update_short_circuits_all_asset_work() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = test_catalog(&temp_dir).await;

    let update_manifest = manifest("ready-update", vec![asset("bundle.js")]);

    let first = test_loader(
        &catalog,
        &temp_dir,
        update_manifest.clone(),
        Arc::new(MockAssetSource::new()),
    );
    first.run(&RecordingHandler::new()).await.unwrap();

    let source = Arc::new(MockAssetSource::new());
    let handler = RecordingHandler::new();
    let second = test_loader(&catalog, &temp_dir, update_manifest, source.clone());
    let update = second.run(&handler).await.unwrap().unwrap();

    assert_eq!(update.id, "ready-update".into());
    assert_eq!(update.status, UpdateStatus::Ready);
    assert!(source.fetched_keys().is_empty());
    assert!(handler.progress_events().is_empty());
}

#[tokio::test]
async fn scope_key_mismatch_is_overwritten_and_processing_continues() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = test_catalog(&temp_dir).await;

    let first = test_loader(
        &catalog,
        &temp_dir,
        manifest("shared-id", vec![asset("bundle.js")]),
        Arc::new(MockAssetSource::new()),
    );
    first.run(&RecordingHandler::new()).await.unwrap();

    // Same id, different scope key: a server-side anomaly, not a fatal error
    let mut conflicting = manifest("shared-id", vec![asset("bundle.js")]);
    conflicting.scope_key = "other-scope".to_string();

    let second = test_loader(
        &catalog,
        &temp_dir,
        conflicting,
        Arc::new(MockAssetSource::new()),
    );
    let update = second
        .run(&RecordingHandler::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(update.scope_key, "other-scope");

    let stored = catalog
        .load_update_by_id(&"shared-id".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.scope_key, "other-scope");
    assert_eq!(stored.status, UpdateStatus::Ready);
}

#[tokio::test]
async fn shared_asset_key_across_manifests_merges_into_one_record() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = test_catalog(&temp_dir).await;

    let first = test_loader(
        &catalog,
        &temp_dir,
        manifest("first-update", vec![asset("shared.bin")]),
        Arc::new(MockAssetSource::new()),
    );
    first.run(&RecordingHandler::new()).await.unwrap();

    let stored = catalog
        .load_asset_by_key(&"shared.bin".into())
        .await
        .unwrap()
        .unwrap();
    let original_hash = stored.content_hash.clone().unwrap();

    // A second update references the same key, now flagged as launch asset
    let mut shared = asset("shared.bin");
    shared.is_launch_asset = true;

    let source = Arc::new(MockAssetSource::new());
    let second = test_loader(
        &catalog,
        &temp_dir,
        manifest("second-update", vec![shared]),
        source.clone(),
    );
    second.run(&RecordingHandler::new()).await.unwrap();

    // No re-fetch, and still exactly one record, reflecting the merge
    assert!(source.fetched_keys().is_empty());
    let merged = catalog
        .load_asset_by_key(&"shared.bin".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged.content_hash, Some(original_hash));
    assert!(merged.is_launch_asset);

    // Both updates are associated with the one record
    for id in ["first-update", "second-update"] {
        let keys = catalog.load_asset_keys_for_update(&id.into()).await.unwrap();
        assert_eq!(keys, vec!["shared.bin".into()]);
    }
}
