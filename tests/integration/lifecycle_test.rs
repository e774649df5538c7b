//! Removal, deactivation and deletion cascades over whole AOIs.

mod helpers;

use aoistore_core::traits::epoch_seconds as t;
use aoistore_core::ErrorKind;
use aoistore_entity::node::{NodeLifecycle, NodeRef, NodeState};

use helpers::{entry_count, find_file, Fault, FaultyVariant, TestStore};

#[tokio::test]
async fn test_removed_aoi_stays_visible_to_history() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;

    ts.clock.set_seconds(20);
    let removed = ts.store.remove_aoi(&ts.ctx(), aoi.id, None).await.unwrap();
    assert_eq!(removed.state(), NodeState::Removed);
    let layers = ts.store.tree.directory(layers.id).await.unwrap();
    assert_eq!(layers.removed_at, Some(t(20)));
    assert!(ts.store.children(root.id, None).await.unwrap().is_empty());

    ts.clock.set_seconds(30);
    let report = ts
        .store
        .export(&ts.ctx(), NodeRef::directory(root.id), &ts.scratch("past"), Some(t(15)))
        .await
        .unwrap();
    let roads = find_file(&report.path, "roads").unwrap();
    assert_eq!(tokio::fs::read_to_string(&roads).await.unwrap(), "V1");
}

#[tokio::test]
async fn test_deactivate_and_delete_aoi() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;

    let err = ts.store.deactivate_aoi(&ts.ctx(), aoi.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = ts.store.delete_aoi(&ts.ctx(), aoi.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    ts.clock.set_seconds(20);
    ts.store.remove_aoi(&ts.ctx(), aoi.id, None).await.unwrap();
    let archived = ts.store.deactivate_aoi(&ts.ctx(), aoi.id).await.unwrap();
    assert_eq!(archived.state(), NodeState::Archived);
    assert_eq!(
        ts.store.tree.directory(root.id).await.unwrap().state(),
        NodeState::Archived
    );
    assert_eq!(entry_count(&ts.aoi_root()).await, 1);

    ts.store.delete_aoi(&ts.ctx(), aoi.id).await.unwrap();
    assert_eq!(ts.store.aoi(aoi.id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(
        ts.store.node(root.node_ref()).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert_eq!(entry_count(&ts.aoi_root()).await, 0);
}

#[tokio::test]
async fn test_failed_cleanup_hook_leaves_everything_active() {
    let ts = TestStore::with_registry(FaultyVariant::registry("Layers", Fault::Cleanup)).await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;
    let roads = ts.child_file(layers.id, "roads").await;

    ts.clock.set_seconds(20);
    ts.store.remove_aoi(&ts.ctx(), aoi.id, None).await.unwrap();
    let err = ts.store.deactivate_aoi(&ts.ctx(), aoi.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Filesystem);

    assert_eq!(ts.store.aoi(aoi.id).await.unwrap().state(), NodeState::Removed);
    for node in [root.node_ref(), layers.node_ref(), NodeRef::file(roads.id)] {
        let loaded = ts.store.node(node).await.unwrap();
        assert_eq!(loaded.state(), NodeState::Removed, "{node}");
    }
}

#[tokio::test]
async fn test_failing_file_cleanup_keeps_directory_active() {
    let ts = TestStore::with_registry(FaultyVariant::registry("Vector", Fault::Cleanup)).await;
    ts.clock.set_seconds(10);
    let bundle = ts.aoi_bundle("V1").await;
    tokio::fs::write(bundle.join("layers.gdb/hillshade.img"), "relief")
        .await
        .unwrap();
    let aoi = ts.create_aoi("Basin1", &bundle).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;
    let roads = ts.child_file(layers.id, "roads").await;
    let hillshade = ts.child_file(layers.id, "hillshade").await;
    assert_eq!(hillshade.type_tag, "Raster");

    ts.clock.set_seconds(20);
    assert_eq!(
        ts.store.soft_remove(&ts.ctx(), layers.node_ref(), None).await.unwrap(),
        3
    );
    let err = ts.store.deactivate(&ts.ctx(), layers.node_ref()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Filesystem);

    for node in [layers.node_ref(), NodeRef::file(roads.id), NodeRef::file(hillshade.id)] {
        let loaded = ts.store.node(node).await.unwrap();
        assert_eq!(loaded.state(), NodeState::Removed, "{node}");
    }
    assert!(ts.store.tree.directory(root.id).await.unwrap().is_current());
}

#[tokio::test]
async fn test_deactivating_one_subtree_spares_siblings() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;
    let roads = ts.child_file(layers.id, "roads").await;
    let surfaces = ts.child_dir(root.id, "Surfaces").await;

    ts.clock.set_seconds(20);
    assert_eq!(
        ts.store.soft_remove(&ts.ctx(), layers.node_ref(), None).await.unwrap(),
        2
    );
    assert_eq!(ts.store.deactivate(&ts.ctx(), layers.node_ref()).await.unwrap(), 2);

    let roads = ts.store.tree.file(roads.id).await.unwrap();
    assert_eq!(roads.state(), NodeState::Archived);
    assert!(ts.store.tree.directory(surfaces.id).await.unwrap().is_current());
    assert!(ts.store.tree.directory(root.id).await.unwrap().is_current());

    ts.store.hard_delete(&ts.ctx(), layers.node_ref()).await.unwrap();
    let err = ts.store.hard_delete(&ts.ctx(), layers.node_ref()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
