//! Component node → application record extraction
//!
//! Every extractor here is tolerant: a bad sub-entry (an icon without a
//! name, a release without a timestamp) is dropped with a debug log and the
//! rest of the component is still used.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::locale::Locales;
use super::refine::{refine, RefineFlags};
use super::version::compare_versions;
use super::{App, Icon, IconKind, Image, ImageKind, Launchable, Provide, Release, Screenshot};
use crate::error::{CatalogError, Result};
use crate::silo::{Element, Node};

/// Build an application record from one component node
///
/// Fails with [`CatalogError::MissingIdentifier`] when the node has no
/// `<id>`. The record comes back with [`RefineFlags::DEFAULT`] filled in.
pub fn create_application(node: &Node, locales: &Locales) -> Result<App> {
    let id = node
        .component_id()
        .ok_or(CatalogError::MissingIdentifier)?;
    let mut app = App::new(id, node.kind());
    refine(&mut app, node, RefineFlags::DEFAULT, locales)?;
    Ok(app)
}

/// Texts of every variant of a translatable element, any language
fn all_texts<'a>(node: &'a Node, element: Element<'a>) -> impl Iterator<Item = &'a str> + 'a {
    node.children_of(element).filter_map(Node::text)
}

/// Best-matching variant among translations of one element
pub(super) fn localized_text<'a>(
    variants: impl IntoIterator<Item = &'a Node>,
    locales: &Locales,
) -> Option<String> {
    locales
        .select(variants)
        .and_then(Node::text)
        .map(str::to_string)
}

fn parse_u32(node: &Node, attr: &str) -> Option<u32> {
    let raw = node.attr(attr)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("Ignoring non-numeric {attr}=\"{raw}\" on <{}>", node.element());
            None
        }
    }
}

pub(super) fn parse_icons(node: &Node) -> Vec<Icon> {
    let mut icons: Vec<Icon> = Vec::new();
    for child in node.children_of(Element::Icon) {
        let Some(name) = child.text() else {
            debug!("Skipping icon without a name");
            continue;
        };
        let icon = Icon {
            kind: IconKind::from_type(child.attr("type")),
            name: name.to_string(),
            width: parse_u32(child, "width"),
            height: parse_u32(child, "height"),
            scale: parse_u32(child, "scale"),
        };
        if !icons.contains(&icon) {
            icons.push(icon);
        }
    }
    icons
}

/// Category tags in node order, deduplicated case-sensitively
pub(crate) fn component_categories(node: &Node) -> Vec<&str> {
    let mut categories: Vec<&str> = Vec::new();
    for container in node.children_of(Element::Categories) {
        for category in container.children_named("category").filter_map(Node::text) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
    }
    categories
}

pub(super) fn parse_keywords(node: &Node, locales: &Locales) -> BTreeSet<String> {
    let keywords: Vec<&Node> = node
        .children_of(Element::Keywords)
        .flat_map(|container| container.children_named("keyword"))
        .collect();
    let best = locales.best_rank(keywords.iter().map(|k| k.lang()));

    keywords
        .into_iter()
        .filter(|k| locales.accepts(k.lang(), best))
        .filter_map(Node::text)
        .map(str::to_string)
        .collect()
}

fn provide_kind(element: &str) -> &str {
    match element {
        "mimetype" => "mediatype",
        other => other,
    }
}

/// Provides tokens of a component
pub(crate) fn component_provides(node: &Node) -> BTreeSet<Provide> {
    node.children_of(Element::Provides)
        .flat_map(Node::children)
        .filter_map(|child| {
            child
                .text()
                .map(|value| Provide::new(provide_kind(child.element()), value))
        })
        .collect()
}

fn parse_image(node: &Node) -> Option<Image> {
    let url = node.text()?;
    let kind = match node.attr("type") {
        Some("thumbnail") => ImageKind::Thumbnail,
        _ => ImageKind::Source,
    };
    Some(Image {
        kind,
        url: url.to_string(),
        width: parse_u32(node, "width"),
        height: parse_u32(node, "height"),
    })
}

pub(super) fn parse_screenshots(node: &Node, locales: &Locales) -> Vec<Screenshot> {
    node.children_of(Element::Screenshots)
        .flat_map(|container| container.children_named("screenshot"))
        .filter_map(|shot| {
            let images: Vec<Image> = shot.children_named("image").filter_map(parse_image).collect();
            if images.is_empty() {
                debug!("Skipping screenshot without images");
                return None;
            }
            Some(Screenshot {
                is_default: shot.attr("type") == Some("default"),
                caption: localized_text(shot.children_named("caption"), locales),
                images,
            })
        })
        .collect()
}

/// Unix seconds for an ISO-8601 date or RFC 3339 timestamp; datetimes
/// without an offset are taken as UTC
fn parse_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(datetime.timestamp());
    }
    if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.and_utc().timestamp());
    }
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp())
}

fn release_timestamp(node: &Node) -> Result<i64> {
    if let Some(raw) = node.attr("timestamp") {
        return raw
            .trim()
            .parse()
            .map_err(|_| CatalogError::malformed(format!("bad release timestamp '{raw}'")));
    }
    if let Some(raw) = node.attr("date") {
        return parse_date(raw)
            .ok_or_else(|| CatalogError::malformed(format!("bad release date '{raw}'")));
    }
    Err(CatalogError::malformed("release has no timestamp or date"))
}

fn parse_release(node: &Node, locales: &Locales) -> Result<Release> {
    let version = node
        .attr("version")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CatalogError::malformed("release has no version"))?;

    Ok(Release {
        version: version.to_string(),
        timestamp: release_timestamp(node)?,
        urgency: node.attr("urgency").map(str::to_string),
        description: localized_text(node.children_named("description"), locales),
    })
}

fn release_nodes(node: &Node) -> impl Iterator<Item = &Node> {
    node.children_of(Element::Releases)
        .flat_map(|container| container.children_named("release"))
}

/// Release history, newest first; malformed entries are skipped
pub(super) fn parse_releases(node: &Node, locales: &Locales) -> Vec<Release> {
    let mut releases: Vec<Release> = release_nodes(node)
        .filter_map(|release| match parse_release(release, locales) {
            Ok(release) => Some(release),
            Err(e) => {
                debug!("Skipping release of {:?}: {e}", node.component_id());
                None
            }
        })
        .collect();

    releases.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| compare_versions(&b.version, &a.version))
    });
    releases
}

/// Timestamp of the newest well-formed release, without building the list
pub(crate) fn newest_release_timestamp(node: &Node) -> Option<i64> {
    release_nodes(node)
        .filter(|release| release.attr("version").is_some_and(|v| !v.trim().is_empty()))
        .filter_map(|release| release_timestamp(release).ok())
        .max()
}

pub(super) fn parse_urls(node: &Node) -> BTreeMap<String, String> {
    let mut urls = BTreeMap::new();
    for url in node.children_of(Element::Url) {
        if let Some(target) = url.text() {
            let kind = url.attr("type").unwrap_or("homepage");
            urls.entry(kind.to_string())
                .or_insert_with(|| target.to_string());
        }
    }
    urls
}

pub(super) fn parse_kudos(node: &Node) -> BTreeSet<String> {
    node.children_of(Element::Kudos)
        .flat_map(|container| container.children_named("kudo"))
        .filter_map(Node::text)
        .map(str::to_string)
        .collect()
}

pub(super) fn parse_metadata(node: &Node) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for value in node
        .children_of(Element::Custom)
        .flat_map(|container| container.children_named("value"))
    {
        let Some(key) = value.attr("key") else {
            debug!("Skipping custom value without a key");
            continue;
        };
        metadata
            .entry(key.to_string())
            .or_insert_with(|| value.text().unwrap_or_default().to_string());
    }
    metadata
}

/// Download and installed size in bytes
pub(super) fn parse_sizes(node: &Node) -> (Option<u64>, Option<u64>) {
    let mut download = None;
    let mut installed = None;
    for size in node.children_of(Element::Size) {
        let Some(bytes) = size.text().and_then(|t| t.parse::<u64>().ok()) else {
            debug!("Skipping size entry without a byte count");
            continue;
        };
        match size.attr("type") {
            Some("download") => {
                download.get_or_insert(bytes);
            }
            Some("installed") => {
                installed.get_or_insert(bytes);
            }
            other => debug!("Ignoring size of unknown type {other:?}"),
        }
    }
    (download, installed)
}

pub(super) fn parse_launchables(node: &Node) -> Vec<Launchable> {
    node.children_of(Element::Launchable)
        .filter_map(|launchable| {
            Some(Launchable {
                kind: launchable.attr("type").unwrap_or("desktop-id").to_string(),
                value: launchable.text()?.to_string(),
            })
        })
        .collect()
}

pub(super) fn parse_pkgnames(node: &Node) -> Vec<String> {
    let mut pkgnames: Vec<String> = Vec::new();
    for name in all_texts(node, Element::Pkgname) {
        if !pkgnames.iter().any(|p| p == name) {
            pkgnames.push(name.to_string());
        }
    }
    pkgnames
}

/// Summary of the elements a component carries, for trace logging
pub(super) fn unknown_elements(node: &Node) -> Vec<&str> {
    node.elements()
        .filter_map(|(element, _)| match element {
            Element::Unknown(name) => Some(name),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silo::BuilderNode;

    fn release(version: Option<&str>, timestamp: Option<&str>, date: Option<&str>) -> BuilderNode {
        let mut node = BuilderNode::new("release");
        if let Some(v) = version {
            node.set_attr("version", v);
        }
        if let Some(t) = timestamp {
            node.set_attr("timestamp", t);
        }
        if let Some(d) = date {
            node.set_attr("date", d);
        }
        node
    }

    fn component_with_releases(releases: Vec<BuilderNode>) -> Node {
        let mut component = BuilderNode::new("component");
        component.add_child(BuilderNode::new("id").with_text("org.example.App"));
        let container = component.add_child(BuilderNode::new("releases"));
        for r in releases {
            container.add_child(r);
        }
        component.build()
    }

    #[test]
    fn test_releases_sorted_newest_first_and_malformed_skipped() {
        let node = component_with_releases(vec![
            release(Some("1.0"), Some("1000"), None),
            release(None, Some("5000"), None),
            release(Some("1.2"), None, Some("2023-01-05")),
            release(Some("1.1"), Some("not-a-number"), None),
            release(Some("0.9"), None, None),
            release(Some("1.1.1"), Some("2000"), None),
        ]);

        let releases = parse_releases(&node, &Locales::untranslated());
        let versions: Vec<_> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["1.2", "1.1.1", "1.0"]);
        assert_eq!(releases[0].timestamp, 1_672_876_800);
        assert_eq!(newest_release_timestamp(&node), Some(1_672_876_800));
    }

    #[test]
    fn test_release_dates_accept_naive_datetimes() {
        assert_eq!(parse_date("2023-01-05"), Some(1_672_876_800));
        assert_eq!(parse_date("2023-01-05T10:00:00"), Some(1_672_876_800 + 36_000));
        assert_eq!(parse_date("2023-01-05T10:00:00+01:00"), Some(1_672_876_800 + 32_400));
        assert_eq!(parse_date("January 5th"), None);

        let node = component_with_releases(vec![release(
            Some("2.0"),
            None,
            Some("2023-01-05T10:00:00"),
        )]);
        let releases = parse_releases(&node, &Locales::untranslated());
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].timestamp, 1_672_912_800);
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_version() {
        let node = component_with_releases(vec![
            release(Some("2.9"), Some("100"), None),
            release(Some("2.10"), Some("100"), None),
        ]);
        let releases = parse_releases(&node, &Locales::untranslated());
        assert_eq!(releases[0].version, "2.10");
    }

    #[test]
    fn test_categories_dedup_preserving_order() {
        let mut component = BuilderNode::new("component");
        let categories = component.add_child(BuilderNode::new("categories"));
        for name in ["Graphics", "Viewer", "Graphics", "graphics"] {
            categories.add_child(BuilderNode::new("category").with_text(name));
        }
        let node = component.build();
        assert_eq!(component_categories(&node), vec!["Graphics", "Viewer", "graphics"]);
    }

    #[test]
    fn test_keywords_take_best_locale_plus_untranslated() {
        let mut component = BuilderNode::new("component");
        let keywords = component.add_child(BuilderNode::new("keywords"));
        keywords.add_child(BuilderNode::new("keyword").with_text("map"));
        keywords.add_child(
            BuilderNode::new("keyword")
                .with_attr("xml:lang", "de")
                .with_text("karte"),
        );
        keywords.add_child(
            BuilderNode::new("keyword")
                .with_attr("xml:lang", "fr")
                .with_text("carte"),
        );
        let node = component.build();

        let de = parse_keywords(&node, &Locales::new(["de_DE", "fr"]));
        assert_eq!(de.into_iter().collect::<Vec<_>>(), vec!["karte", "map"]);

        let plain = parse_keywords(&node, &Locales::untranslated());
        assert_eq!(plain.into_iter().collect::<Vec<_>>(), vec!["map"]);
    }

    #[test]
    fn test_provides_normalize_mimetype() {
        let mut component = BuilderNode::new("component");
        let provides = component.add_child(BuilderNode::new("provides"));
        provides.add_child(BuilderNode::new("mimetype").with_text("text/plain"));
        provides.add_child(BuilderNode::new("mediatype").with_text("text/plain"));
        provides.add_child(BuilderNode::new("binary").with_text("gedit"));
        let node = component.build();

        let provides = component_provides(&node);
        assert_eq!(provides.len(), 2);
        assert!(provides.contains(&Provide::new("mediatype", "text/plain")));
        assert!(provides.contains(&Provide::new("binary", "gedit")));
    }

    #[test]
    fn test_icons_skip_nameless_and_parse_sizes() {
        let mut component = BuilderNode::new("component");
        component.add_child(
            BuilderNode::new("icon")
                .with_attr("type", "cached")
                .with_attr("width", "64")
                .with_attr("height", "sixty-four")
                .with_text("app.png"),
        );
        component.add_child(BuilderNode::new("icon").with_attr("type", "remote"));
        let icons = parse_icons(&component.build());

        assert_eq!(icons.len(), 1);
        assert_eq!(icons[0].kind, IconKind::Cached);
        assert_eq!(icons[0].width, Some(64));
        assert_eq!(icons[0].height, None);
    }

    #[test]
    fn test_screenshots_need_images() {
        let mut component = BuilderNode::new("component");
        let shots = component.add_child(BuilderNode::new("screenshots"));
        let first = shots.add_child(BuilderNode::new("screenshot").with_attr("type", "default"));
        first.add_child(BuilderNode::new("caption").with_text("Main window"));
        first.add_child(
            BuilderNode::new("image")
                .with_attr("type", "thumbnail")
                .with_attr("width", "224")
                .with_text("https://example.org/thumb.png"),
        );
        shots.add_child(BuilderNode::new("screenshot"));
        let screenshots = parse_screenshots(&component.build(), &Locales::untranslated());

        assert_eq!(screenshots.len(), 1);
        assert!(screenshots[0].is_default);
        assert_eq!(screenshots[0].caption.as_deref(), Some("Main window"));
        assert_eq!(screenshots[0].images[0].kind, ImageKind::Thumbnail);
    }

    #[test]
    fn test_create_application_requires_id() {
        let node = BuilderNode::new("component")
            .with_attr("type", "desktop-application")
            .build();
        let err = create_application(&node, &Locales::untranslated()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingIdentifier));
    }

    #[test]
    fn test_unknown_elements_listed() {
        let mut component = BuilderNode::new("component");
        component.add_child(BuilderNode::new("id").with_text("org.example.App"));
        component.add_child(BuilderNode::new("content_rating"));
        let node = component.build();
        assert_eq!(unknown_elements(&node), vec!["content_rating"]);
    }

    #[test]
    fn test_unknown_children_do_not_block_known_fields() {
        let mut component = BuilderNode::new("component").with_attr("type", "desktop-application");
        component.add_child(BuilderNode::new("content_rating").with_attr("type", "oars-1.1"));
        component.add_child(BuilderNode::new("id").with_text("org.example.App"));
        let future = component.add_child(BuilderNode::new("branding"));
        future.add_child(BuilderNode::new("color").with_text("#ff00ff"));
        component.add_child(BuilderNode::new("name").with_text("Example"));
        component.add_child(BuilderNode::new("summary").with_text("Does examples"));
        let categories = component.add_child(BuilderNode::new("categories"));
        categories.add_child(BuilderNode::new("category").with_text("Utility"));

        let app = create_application(&component.build(), &Locales::untranslated()).unwrap();
        assert_eq!(app.id(), "org.example.App");
        assert_eq!(app.name(), Some("Example"));
        assert_eq!(app.summary(), Some("Does examples"));
        assert_eq!(app.categories(), &["Utility".to_string()]);
    }
}
