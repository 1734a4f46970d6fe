//! Shared helpers for integration tests

#![allow(dead_code)]

use appsilo_core::silo::{source, BuilderNode, Silo, SiloBuilder};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Fixed clock for time-relative queries
pub const NOW: i64 = 1_700_000_000;

/// Compile a YAML catalog source to silo bytes
pub fn compile_yaml(yaml: &str) -> Vec<u8> {
    source::import_yaml(yaml)
        .expect("fixture YAML should parse")
        .into_builder()
        .with_built_at(NOW)
        .compile()
        .expect("fixture should compile")
}

pub fn silo_from_yaml(yaml: &str) -> Silo {
    Silo::load(&compile_yaml(yaml)).expect("fixture silo should load")
}

/// A minimal component node with an identifier and name
pub fn component(id: &str, name: &str) -> BuilderNode {
    let mut node = BuilderNode::new("component");
    node.add_child(BuilderNode::new("id").with_text(id));
    node.add_child(BuilderNode::new("name").with_text(name));
    node
}

/// A silo of `count` generated components for load and scan tests
pub fn generated_silo(count: usize) -> Vec<u8> {
    let mut builder = SiloBuilder::new().with_origin("generated").with_built_at(NOW);
    for i in 0..count {
        let mut node = component(&format!("org.example.App{i}"), &format!("App {i}"));
        node.add_child(BuilderNode::new("summary").with_text(format!("Generated editor number {i}")));
        let categories = node.add_child(BuilderNode::new("categories"));
        let category = if i % 2 == 0 { "Graphics" } else { "Office" };
        categories.add_child(BuilderNode::new("category").with_text(category));
        builder.add_component(node);
    }
    builder.compile().expect("generated silo should compile")
}

/// Catalog used by the query scenarios
pub const DESKTOP_CATALOG: &str = r#"
- ID: org.example.VectorEditor
  Name: Vector Editor
  Summary: Draw scalable graphics
  Categories: [Graphics, VectorGraphics]
  Keywords: [editor, svg]
  Provides: { mediatypes: [image/svg+xml] }
  Kudos: ["GnomeSoftware::popular"]
  Custom: { "GnomeSoftware::popularity": 12 }
- ID: org.example.Writer
  Name: Writer
  Summary: Write documents
  Categories: [Office, WordProcessor]
  Releases:
    - { version: "4.1", unix-timestamp: 1699999990 }
- ID: org.example.Painter
  Name:
    C: Painter
    de: Maler
  Summary: Paint pictures
  Categories: [Graphics, RasterGraphics]
  Releases:
    - { version: "2.0", unix-timestamp: 1699900000 }
  Custom: { "GnomeSoftware::FeatureTile": "background: red" }
- ID: org.example.SvgViewer
  Name: SVG Viewer
  Categories: [Graphics, Viewer]
  Provides: { mediatypes: [image/svg+xml] }
- ID: org.example.Sans
  Type: font
  Name: Example Sans
"#;
