//! AOI import: uniqueness, validation and compensation.

mod helpers;

use aoistore_core::ErrorKind;
use aoistore_entity::node::{NodeLifecycle, NodeStatus};
use aoistore_service::ContentInput;

use helpers::{entry_count, Fault, FaultyVariant, TestStore};

#[tokio::test]
async fn test_aoi_import_creates_every_component() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin 1", &ts.aoi_bundle("V1").await).await;
    assert_eq!(aoi.status, NodeStatus::Finalized);
    assert!(aoi.is_current());

    let root = ts.root(&aoi).await;
    let mut tags: Vec<String> = ts
        .store
        .children(root.id, None)
        .await
        .unwrap()
        .directories
        .into_iter()
        .map(|d| d.type_tag)
        .collect();
    tags.sort();
    assert_eq!(tags, ["AOIdb", "Analysis", "Layers", "PrismDir", "Surfaces"]);
    assert_eq!(entry_count(&ts.aoi_root()).await, 1);

    let url = ts.store.resolve_url(root.node_ref()).await.unwrap();
    assert!(url.ends_with(&format!("/{}", root.id)));
}

#[tokio::test]
async fn test_names_are_unique_among_current_nodes() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let bundle = ts.aoi_bundle("V1").await;
    let aoi = ts.create_aoi("Basin1", &bundle).await;

    let err = ts.try_create_aoi("Basin1", &bundle).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(ts.store.aois().await.unwrap().len(), 1);

    let root = ts.root(&aoi).await;
    let before = ts.store.children(root.id, None).await.unwrap().directories.len();
    let input = ContentInput::open(bundle.join("layers.gdb")).await.unwrap();
    let err = ts
        .store
        .create(&ts.ctx(), "Layers", root.id, &input, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(
        ts.store.children(root.id, None).await.unwrap().directories.len(),
        before
    );

    // a removed AOI frees its name
    ts.clock.set_seconds(20);
    ts.store.remove_aoi(&ts.ctx(), aoi.id, None).await.unwrap();
    ts.clock.set_seconds(30);
    let again = ts.create_aoi("Basin1", &bundle).await;
    assert_ne!(again.id, aoi.id);
}

#[tokio::test]
async fn test_invalid_bundle_is_rejected_before_any_write() {
    let ts = TestStore::new().await;
    let bundle = ts.aoi_bundle("V1").await;
    tokio::fs::remove_dir_all(bundle.join("surfaces.gdb")).await.unwrap();

    let err = ts.try_create_aoi("Basin1", &bundle).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(err.message.contains("surfaces.gdb"));
    assert!(ts.store.aois().await.unwrap().is_empty());
    assert_eq!(entry_count(&ts.aoi_root()).await, 0);
}

#[tokio::test]
async fn test_failed_component_rolls_back_whole_aoi() {
    let ts = TestStore::with_registry(FaultyVariant::registry("Analysis", Fault::Import)).await;
    ts.clock.set_seconds(10);
    let bundle = ts.aoi_bundle("V1").await;

    let err = ts.try_create_aoi("Basin1", &bundle).await.unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::Filesystem);
    assert!(ts.store.aois().await.unwrap().is_empty());
    assert_eq!(entry_count(&ts.aoi_root()).await, 0);
}

#[tokio::test]
async fn test_cancelled_import_leaves_nothing() {
    let ts = TestStore::new().await;
    let bundle = ts.aoi_bundle("V1").await;
    let ctx = ts.ctx();
    ctx.cancellation().cancel();

    let err = ts
        .store
        .create_aoi(
            &ctx,
            aoistore_service::CreateAoiRequest {
                name: "Basin1".to_string(),
                source: aoistore_service::DirectorySource::shared(&bundle).await.unwrap(),
                boundary: None,
                pourpoint: None,
                parent_aoi_id: None,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::Cancelled);
    assert!(ts.store.aois().await.unwrap().is_empty());
    assert_eq!(entry_count(&ts.aoi_root()).await, 0);
}
