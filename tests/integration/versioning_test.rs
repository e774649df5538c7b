//! Point-in-time reconstruction across versions and snapshots.

mod helpers;

use aoistore_core::traits::epoch_seconds as t;
use aoistore_core::ErrorKind;
use aoistore_entity::node::NodeRef;
use aoistore_service::registry::layout;
use aoistore_service::{DirectorySource, SourceLayer, UpdateOutcome};

use helpers::{find_file, TestStore};

#[tokio::test]
async fn test_file_export_follows_version_history() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;
    let roads = ts.child_file(layers.id, "roads").await;

    ts.clock.set_seconds(20);
    let v2 = ts.write(&[("roads.shp", "V2")]).await;
    let layer = SourceLayer::from_path(v2.join("roads.shp")).unwrap();
    let outcome = ts
        .store
        .append_version(&ts.ctx(), roads.id, &layer, Some("resurvey"))
        .await
        .unwrap();
    assert!(outcome.is_added());
    assert_eq!(ts.store.versions(roads.id).await.unwrap().len(), 2);

    ts.clock.set_seconds(30);
    let file = NodeRef::file(roads.id);

    let out = ts.scratch("at15");
    let report = ts.store.export(&ts.ctx(), file, &out, Some(t(15))).await.unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(tokio::fs::read_to_string(&report.path).await.unwrap(), "V1");
    assert!(report.path.ends_with("roads.shp"));

    let out = ts.scratch("at25");
    let report = ts.store.export(&ts.ctx(), file, &out, Some(t(25))).await.unwrap();
    assert_eq!(tokio::fs::read_to_string(&report.path).await.unwrap(), "V2");

    let out = ts.scratch("at5");
    let err = ts.store.export(&ts.ctx(), file, &out, Some(t(5))).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reverted_content_is_stored_as_new_version() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;
    let roads = ts.child_file(layers.id, "roads").await;

    let src = ts.write(&[("v2/roads.shp", "V2"), ("v1/roads.shp", "V1")]).await;
    ts.clock.set_seconds(20);
    let v2 = SourceLayer::from_path(src.join("v2/roads.shp")).unwrap();
    assert!(ts.store.append_version(&ts.ctx(), roads.id, &v2, None).await.unwrap().is_added());

    ts.clock.set_seconds(30);
    let v1 = SourceLayer::from_path(src.join("v1/roads.shp")).unwrap();
    assert!(ts.store.append_version(&ts.ctx(), roads.id, &v1, None).await.unwrap().is_added());
    assert!(!ts.store.append_version(&ts.ctx(), roads.id, &v1, None).await.unwrap().is_added());
    assert_eq!(ts.store.versions(roads.id).await.unwrap().len(), 3);

    ts.clock.set_seconds(40);
    let file = NodeRef::file(roads.id);
    let report = ts.store.export(&ts.ctx(), file, &ts.scratch("at25"), Some(t(25))).await.unwrap();
    assert_eq!(tokio::fs::read_to_string(&report.path).await.unwrap(), "V2");
    let report = ts.store.export(&ts.ctx(), file, &ts.scratch("at35"), Some(t(35))).await.unwrap();
    assert_eq!(tokio::fs::read_to_string(&report.path).await.unwrap(), "V1");
}

#[tokio::test]
async fn test_directory_export_reconstructs_tree() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let layers = ts.child_dir(root.id, "Layers").await;
    let roads = ts.child_file(layers.id, "roads").await;

    ts.clock.set_seconds(20);
    let v2 = ts.write(&[("roads.shp", "V2")]).await;
    ts.store
        .append_version(&ts.ctx(), roads.id, &SourceLayer::from_path(v2.join("roads.shp")).unwrap(), None)
        .await
        .unwrap();

    ts.clock.set_seconds(30);
    let out = ts.scratch("tree");
    let report = ts
        .store
        .export(&ts.ctx(), NodeRef::directory(root.id), &out, Some(t(15)))
        .await
        .unwrap();
    assert!(report.path.ends_with(&aoi.shortname));
    assert!(report.files > 1);
    let exported = find_file(&report.path, "roads").unwrap();
    assert_eq!(tokio::fs::read_to_string(&exported).await.unwrap(), "V1");

    let err = ts
        .store
        .export(&ts.ctx(), NodeRef::directory(root.id), &out, Some(t(16)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = ts
        .store
        .export(&ts.ctx(), NodeRef::directory(root.id), &ts.scratch("early"), Some(t(5)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TemporalQuery);
}

#[tokio::test]
async fn test_group_export_picks_snapshot_current_at_instant() {
    let ts = TestStore::new().await;
    ts.clock.set_seconds(10);
    let aoi = ts.create_aoi("Basin1", &ts.aoi_bundle("V1").await).await;
    let root = ts.root(&aoi).await;
    let container = ts.child_dir(root.id, "PrismDir").await;
    let prism = ts.child_dir(container.id, "Prism").await;

    ts.clock.set_seconds(20);
    let entries: Vec<(String, String)> = layout::PRISM_REQUIRED_RASTERS
        .iter()
        .map(|r| (format!("prism.gdb/{r}.img"), format!("{r} v2")))
        .collect();
    let borrowed: Vec<(&str, &str)> = entries.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let v2 = ts.write(&borrowed).await;
    let outcome = ts
        .store
        .update(&ts.ctx(), prism.id, DirectorySource::shared(v2.join("prism.gdb")).await.unwrap())
        .await
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Snapshot { previous: Some(p), .. } if p == prism.id));

    ts.clock.set_seconds(30);
    let before = ts
        .store
        .export(&ts.ctx(), NodeRef::directory(container.id), &ts.scratch("before"), Some(t(15)))
        .await
        .unwrap();
    let annual = find_file(&before.path, "Annual").unwrap();
    assert_eq!(tokio::fs::read_to_string(&annual).await.unwrap(), "Annual v1");

    let after = ts
        .store
        .export(&ts.ctx(), NodeRef::directory(container.id), &ts.scratch("after"), Some(t(25)))
        .await
        .unwrap();
    let annual = find_file(&after.path, "Annual").unwrap();
    assert_eq!(tokio::fs::read_to_string(&annual).await.unwrap(), "Annual v2");
    assert_eq!(before.files, after.files);
}
