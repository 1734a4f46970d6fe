//! YAML catalog sources
//!
//! Reads DEP-11 flavoured YAML into builder nodes. A source is either a
//! stream of documents (an optional `File:` header document followed by one
//! component per document) or a single document holding a list of
//! components:
//!
//! ```yaml
//! - ID: org.example.Editor
//!   Type: desktop-application
//!   Name: { C: Vector Editor, de: Vektor-Editor }
//!   Summary: Draw scalable graphics
//!   Categories: [Graphics, VectorGraphics]
//!   Keywords: { C: [editor, svg] }
//!   Provides: { mediatypes: [image/svg+xml], binaries: [vedit] }
//!   Releases:
//!     - { version: "1.2", unix-timestamp: 1700000000 }
//! ```
//!
//! Entries that cannot be read are skipped with a warning; only YAML syntax
//! errors fail the import.

use serde::{Deserialize, Deserializer};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::builder::{BuilderNode, SiloBuilder};
use super::node::LANG_ATTR;
use crate::error::Result;

/// Components read from one catalog source
#[derive(Debug, Default)]
pub struct CatalogSource {
    /// `Origin` from the header document, if any
    pub origin: Option<String>,
    pub components: Vec<BuilderNode>,
}

impl CatalogSource {
    /// Move the components into a builder, carrying the origin over
    pub fn into_builder(self) -> SiloBuilder {
        let mut builder = match self.origin {
            Some(origin) => SiloBuilder::new().with_origin(origin),
            None => SiloBuilder::new(),
        };
        builder.extend(self.components);
        builder
    }
}

/// Parse a YAML catalog source
pub fn import_yaml(text: &str) -> Result<CatalogSource> {
    let mut source = CatalogSource::default();

    for document in serde_yaml_ng::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        match value {
            Value::Null => {}
            Value::Sequence(items) => {
                for item in items {
                    push_component(&mut source, item);
                }
            }
            Value::Mapping(ref map) if map.contains_key("File") => {
                source.origin = map
                    .get("Origin")
                    .and_then(scalar_to_string)
                    .or(source.origin);
            }
            other => push_component(&mut source, other),
        }
    }

    debug!(
        "Imported {} components from YAML source",
        source.components.len()
    );
    Ok(source)
}

fn push_component(source: &mut CatalogSource, value: Value) {
    match serde_yaml_ng::from_value::<SourceComponent>(value) {
        Ok(component) => match component.into_node() {
            Some(node) => source.components.push(node),
            None => warn!("Skipping catalog entry without an ID"),
        },
        Err(e) => warn!("Skipping unreadable catalog entry: {e}"),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn opt_scalar<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Plain string or `{ locale: text }` map; `C` is the untranslated variant
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Translatable {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslatableList {
    Plain(Vec<String>),
    Localized(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SourceIcon {
    name: Option<String>,
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    scale: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceIcons {
    stock: Option<String>,
    #[serde(default)]
    cached: Vec<SourceIcon>,
    #[serde(default)]
    local: Vec<SourceIcon>,
    #[serde(default)]
    remote: Vec<SourceIcon>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SourceImage {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SourceScreenshot {
    #[serde(default)]
    default: bool,
    caption: Option<Translatable>,
    source_image: Option<SourceImage>,
    #[serde(default)]
    thumbnails: Vec<SourceImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SourceRelease {
    #[serde(default, deserialize_with = "opt_scalar")]
    version: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    unix_timestamp: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    date: Option<String>,
    urgency: Option<String>,
    description: Option<Translatable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceComponent {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    name: Option<Translatable>,
    summary: Option<Translatable>,
    description: Option<Translatable>,
    developer_name: Option<Translatable>,
    #[serde(default, deserialize_with = "opt_scalar")]
    version: Option<String>,
    project_license: Option<String>,
    project_group: Option<String>,
    package: Option<OneOrMany>,
    #[serde(default)]
    categories: Vec<String>,
    keywords: Option<TranslatableList>,
    #[serde(default)]
    provides: BTreeMap<String, Vec<String>>,
    icon: Option<SourceIcons>,
    #[serde(default)]
    screenshots: Vec<SourceScreenshot>,
    #[serde(default)]
    releases: Vec<SourceRelease>,
    #[serde(default)]
    url: BTreeMap<String, String>,
    #[serde(default)]
    launchable: BTreeMap<String, OneOrMany>,
    #[serde(default)]
    kudos: Vec<String>,
    #[serde(default)]
    custom: BTreeMap<String, Value>,
    #[serde(default)]
    size: BTreeMap<String, u64>,
}

/// Element name for a DEP-11 `Provides` key
fn provide_element(key: &str) -> &str {
    match key {
        "ids" => "id",
        "binaries" => "binary",
        "libraries" => "library",
        "mediatypes" | "mimetypes" => "mediatype",
        "fonts" => "font",
        "modaliases" => "modalias",
        other => other,
    }
}

fn push_translatable(parent: &mut BuilderNode, element: &str, value: Translatable) {
    match value {
        Translatable::Plain(text) => {
            parent.add_child(BuilderNode::new(element).with_text(text));
        }
        Translatable::Localized(map) => {
            for (locale, text) in map {
                let mut child = BuilderNode::new(element).with_text(text);
                if locale != "C" {
                    child.set_attr(LANG_ATTR, locale);
                }
                parent.add_child(child);
            }
        }
    }
}

fn push_icon(component: &mut BuilderNode, kind: &str, icon: SourceIcon) {
    let Some(reference) = icon.url.or(icon.name) else {
        return;
    };
    let mut node = BuilderNode::new("icon")
        .with_attr("type", kind)
        .with_text(reference);
    if let Some(width) = icon.width {
        node.set_attr("width", width.to_string());
    }
    if let Some(height) = icon.height {
        node.set_attr("height", height.to_string());
    }
    if let Some(scale) = icon.scale {
        node.set_attr("scale", scale.to_string());
    }
    component.add_child(node);
}

fn image_node(kind: &str, image: SourceImage) -> BuilderNode {
    let mut node = BuilderNode::new("image")
        .with_attr("type", kind)
        .with_text(image.url);
    if let Some(width) = image.width {
        node.set_attr("width", width.to_string());
    }
    if let Some(height) = image.height {
        node.set_attr("height", height.to_string());
    }
    node
}

impl SourceComponent {
    fn into_node(self) -> Option<BuilderNode> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;

        let mut component = BuilderNode::new("component");
        if let Some(kind) = self.kind {
            component.set_attr("type", kind);
        }
        if let Some(version) = self.version {
            component.set_attr("version", version);
        }
        component.add_child(BuilderNode::new("id").with_text(id));

        if let Some(name) = self.name {
            push_translatable(&mut component, "name", name);
        }
        if let Some(summary) = self.summary {
            push_translatable(&mut component, "summary", summary);
        }
        if let Some(description) = self.description {
            push_translatable(&mut component, "description", description);
        }
        if let Some(developer) = self.developer_name {
            push_translatable(&mut component, "developer_name", developer);
        }
        if let Some(license) = self.project_license {
            component.add_child(BuilderNode::new("project_license").with_text(license));
        }
        if let Some(group) = self.project_group {
            component.add_child(BuilderNode::new("project_group").with_text(group));
        }
        for pkgname in self.package.map(OneOrMany::into_vec).unwrap_or_default() {
            component.add_child(BuilderNode::new("pkgname").with_text(pkgname));
        }

        if let Some(icons) = self.icon {
            if let Some(stock) = icons.stock {
                component.add_child(
                    BuilderNode::new("icon")
                        .with_attr("type", "stock")
                        .with_text(stock),
                );
            }
            for icon in icons.cached {
                push_icon(&mut component, "cached", icon);
            }
            for icon in icons.local {
                push_icon(&mut component, "local", icon);
            }
            for icon in icons.remote {
                push_icon(&mut component, "remote", icon);
            }
        }

        if !self.categories.is_empty() {
            let categories = component.add_child(BuilderNode::new("categories"));
            for category in self.categories {
                categories.add_child(BuilderNode::new("category").with_text(category));
            }
        }

        if let Some(keywords) = self.keywords {
            let container = component.add_child(BuilderNode::new("keywords"));
            match keywords {
                TranslatableList::Plain(list) => {
                    for keyword in list {
                        container.add_child(BuilderNode::new("keyword").with_text(keyword));
                    }
                }
                TranslatableList::Localized(map) => {
                    for (locale, list) in map {
                        for keyword in list {
                            let mut node = BuilderNode::new("keyword").with_text(keyword);
                            if locale != "C" {
                                node.set_attr(LANG_ATTR, locale.clone());
                            }
                            container.add_child(node);
                        }
                    }
                }
            }
        }

        if !self.provides.is_empty() {
            let container = component.add_child(BuilderNode::new("provides"));
            for (key, values) in self.provides {
                let element = provide_element(&key);
                for value in values {
                    container.add_child(BuilderNode::new(element).with_text(value));
                }
            }
        }

        if !self.screenshots.is_empty() {
            let container = component.add_child(BuilderNode::new("screenshots"));
            for shot in self.screenshots {
                let mut node = BuilderNode::new("screenshot");
                if shot.default {
                    node.set_attr("type", "default");
                }
                if let Some(caption) = shot.caption {
                    push_translatable(&mut node, "caption", caption);
                }
                if let Some(source) = shot.source_image {
                    node.add_child(image_node("source", source));
                }
                for thumb in shot.thumbnails {
                    node.add_child(image_node("thumbnail", thumb));
                }
                container.add_child(node);
            }
        }

        if !self.releases.is_empty() {
            let container = component.add_child(BuilderNode::new("releases"));
            for release in self.releases {
                let mut node = BuilderNode::new("release");
                if let Some(version) = release.version {
                    node.set_attr("version", version);
                }
                if let Some(timestamp) = release.unix_timestamp {
                    node.set_attr("timestamp", timestamp);
                }
                if let Some(date) = release.date {
                    node.set_attr("date", date);
                }
                if let Some(urgency) = release.urgency {
                    node.set_attr("urgency", urgency);
                }
                if let Some(description) = release.description {
                    push_translatable(&mut node, "description", description);
                }
                container.add_child(node);
            }
        }

        for (kind, url) in self.url {
            component.add_child(BuilderNode::new("url").with_attr("type", kind).with_text(url));
        }

        for (kind, entries) in self.launchable {
            for entry in entries.into_vec() {
                component.add_child(
                    BuilderNode::new("launchable")
                        .with_attr("type", kind.clone())
                        .with_text(entry),
                );
            }
        }

        if !self.kudos.is_empty() {
            let container = component.add_child(BuilderNode::new("kudos"));
            for kudo in self.kudos {
                container.add_child(BuilderNode::new("kudo").with_text(kudo));
            }
        }

        if !self.custom.is_empty() {
            let container = component.add_child(BuilderNode::new("custom"));
            for (key, value) in self.custom {
                let text = scalar_to_string(&value).unwrap_or_default();
                container.add_child(BuilderNode::new("value").with_attr("key", key).with_text(text));
            }
        }

        for (kind, bytes) in self.size {
            component.add_child(
                BuilderNode::new("size")
                    .with_attr("type", kind)
                    .with_text(bytes.to_string()),
            );
        }

        Some(component)
    }
}
