//! Asset store persistence: atomic writes, manifest checksums and recovery.

use std::fs;
use std::sync::Arc;
use std::thread;

use ntest::timeout;
use tempfile::tempdir;

use rtti_core::persistence::{AssetStatus, AssetStore, MANIFEST_FILE};
use rtti_core::types::engine_types::{GuiToggle, GuiToggleGroup, SphereCollider};
use rtti_core::types::{downcast_ref, register_engine_types, share};
use rtti_core::{RttiConfig, RttiContext, RttiError};

fn context(dir: &std::path::Path) -> RttiContext {
    let config = RttiConfig {
        asset_dir: dir.to_path_buf(),
        persistence_retry_delay_ms: 0,
        ..Default::default()
    };
    RttiContext::init(config, &[register_engine_types]).unwrap()
}

#[test]
fn test_save_and_load_round_trip() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = context(temp_dir.path()).asset_store();

    let group = GuiToggleGroup {
        allow_all_off: true,
        toggles: vec![
            Some(share(GuiToggle {
                text: "Music".to_string(),
                on: true,
            })),
            Some(share(GuiToggle {
                text: "Sound".to_string(),
                on: false,
            })),
        ],
    };
    let entry = store.save("options_menu", &group)?;
    assert_eq!(entry.type_name, "GUIToggleGroup");
    assert_eq!(entry.size, fs::metadata(store.asset_path("options_menu"))?.len());

    let loaded: GuiToggleGroup = store.load_as("options_menu")?;
    assert!(loaded.allow_all_off);
    let second = loaded.toggles[1].as_ref().unwrap().read().unwrap();
    assert_eq!(downcast_ref::<GuiToggle>(second.as_ref()).unwrap().text, "Sound");
    Ok(())
}

#[test]
fn test_reopened_store_sees_saved_assets() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    {
        let store = context(temp_dir.path()).asset_store();
        store.save("a", &SphereCollider::default())?;
        store.save("b", &GuiToggle::default())?;
    }

    let store = context(temp_dir.path()).asset_store();
    assert_eq!(store.list()?, vec!["a".to_string(), "b".to_string()]);
    let sphere: SphereCollider = store.load_as("a")?;
    assert_eq!(sphere, SphereCollider::default());
    Ok(())
}

#[test]
fn test_corrupted_asset_detected_on_load() {
    let temp_dir = tempdir().unwrap();
    let store = context(temp_dir.path()).asset_store();
    store.save("ball", &SphereCollider::default()).unwrap();

    let path = store.asset_path("ball");
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        store.load("ball"),
        Err(RttiError::DataCorruption(_))
    ));

    let reports = store.verify().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(matches!(
        reports[0].status,
        AssetStatus::ChecksumMismatch { .. }
    ));
}

#[test]
fn test_verify_reports_missing_and_healthy_assets() {
    let temp_dir = tempdir().unwrap();
    let store = context(temp_dir.path()).asset_store();
    store.save("kept", &GuiToggle::default()).unwrap();
    store.save("lost", &GuiToggle::default()).unwrap();
    fs::remove_file(store.asset_path("lost")).unwrap();

    let reports = store.verify().unwrap();
    let statuses: Vec<(&str, &AssetStatus)> = reports
        .iter()
        .map(|report| (report.name.as_str(), &report.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("kept", &AssetStatus::Ok { objects: 1 }),
            ("lost", &AssetStatus::Missing)
        ]
    );
}

#[test]
fn test_asset_outside_manifest_still_loads() {
    let temp_dir = tempdir().unwrap();
    let store = context(temp_dir.path()).asset_store();
    store.save("orphan", &GuiToggle::default()).unwrap();
    fs::remove_file(temp_dir.path().join(MANIFEST_FILE)).unwrap();

    let loaded: GuiToggle = store.load_as("orphan").unwrap();
    assert_eq!(loaded, GuiToggle::default());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_missing_asset_is_io_error() {
    let temp_dir = tempdir().unwrap();
    let store = context(temp_dir.path()).asset_store();
    assert!(matches!(store.load("nothing"), Err(RttiError::IoError(_))));
}

#[timeout(10000)]
#[test]
fn test_concurrent_saves_keep_manifest_consistent() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(context(temp_dir.path()).asset_store());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let toggle = GuiToggle {
                    text: format!("toggle{}", i),
                    on: i % 2 == 0,
                };
                store.save(&format!("toggle_{}", i), &toggle).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.list().unwrap().len(), 8);
    assert!(store
        .verify()
        .unwrap()
        .iter()
        .all(|report| matches!(report.status, AssetStatus::Ok { .. })));
    let loaded: GuiToggle = store.load_as("toggle_3").unwrap();
    assert_eq!(loaded.text, "toggle3");
}

#[timeout(30000)]
#[test]
fn test_concurrent_saves_to_one_name() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(context(temp_dir.path()).asset_store());

    for round in 0..20 {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let toggle = GuiToggle {
                        text: format!("round{}-writer{}", round, i),
                        on: i % 2 == 0,
                    };
                    store.save("shared", &toggle).unwrap();
                    let loaded: GuiToggle = store.load_as("shared").unwrap();
                    assert!(loaded.text.starts_with(&format!("round{}-", round)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded: GuiToggle = store.load_as("shared").unwrap();
        let entry = store.entry("shared").unwrap().unwrap();
        assert_eq!(entry.size, fs::metadata(store.asset_path("shared")).unwrap().len());
        assert!(loaded.text.starts_with(&format!("round{}-", round)));
    }

    assert_eq!(store.list().unwrap(), vec!["shared".to_string()]);
    let leftovers = fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(leftovers, 2);
}

#[test]
fn test_store_with_explicit_dir() {
    let temp_dir = tempdir().unwrap();
    let context = context(temp_dir.path());
    let nested = temp_dir.path().join("nested").join("assets");
    let store = AssetStore::with_dir(&nested, context.serializer());
    store.save("deep", &GuiToggle::default()).unwrap();
    assert!(nested.join("deep.asset").exists());
    assert!(nested.join(MANIFEST_FILE).exists());
}
