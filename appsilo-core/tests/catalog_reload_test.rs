//! Snapshot swapping and concurrent readers

mod common;

use appsilo_core::{Catalog, CatalogConfig, CatalogError, QueryContext};
use common::{compile_yaml, generated_silo, init_test_logging, DESKTOP_CATALOG};
use std::sync::Arc;
use std::thread;

#[test]
fn test_corrupt_blob_leaves_queries_unaffected() {
    init_test_logging();
    let catalog = Catalog::new();
    catalog.load(&compile_yaml(DESKTOP_CATALOG)).unwrap();
    let ctx = QueryContext::default();
    let before = catalog.category_apps(&ctx, "Graphics").unwrap();

    for corrupt in [&b""[..], &b"APSL"[..], &b"definitely not a silo"[..]] {
        let err = catalog.load(corrupt).unwrap_err();
        assert!(matches!(err, CatalogError::CorruptIndex { .. }), "{err}");
    }

    let after = catalog.category_apps(&ctx, "Graphics").unwrap();
    assert_eq!(before.ids(), after.ids());
}

#[test]
fn test_readers_keep_their_snapshot_across_reloads() {
    init_test_logging();
    let catalog = Arc::new(Catalog::new());
    catalog.load(&generated_silo(200)).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                for _ in 0..20 {
                    let pinned = catalog.snapshot();
                    let len = pinned.len();
                    let ctx = QueryContext::default();
                    let mut list = appsilo_core::AppList::new();
                    appsilo_core::query::search(&pinned, &ctx, &["generated"], &mut list).unwrap();
                    // a pinned snapshot never changes underneath a query
                    assert_eq!(list.len(), len);
                }
            })
        })
        .collect();

    for size in [50, 300, 100] {
        catalog.load(&generated_silo(size)).unwrap();
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(catalog.snapshot().len(), 100);
}

#[test]
fn test_config_drives_query_context() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let silo_path = dir.path().join("desktop.silo");
    std::fs::write(&silo_path, compile_yaml(DESKTOP_CATALOG)).unwrap();

    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            "locales: [de_DE]\nsilo_path: {}\n",
            silo_path.display()
        ),
    )
    .unwrap();

    let config = CatalogConfig::load_from_path(&config_path).unwrap();
    let catalog = Catalog::open(config.silo_path.as_ref().unwrap()).unwrap();
    let painter = catalog
        .lookup(&config.to_query_context(), "org.example.Painter")
        .unwrap()
        .unwrap();
    assert_eq!(painter.name(), Some("Maler"));
}
