//! Progressive enrichment of application records

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};
use std::str::FromStr;
use tracing::{debug, trace};

use super::locale::Locales;
use super::parser;
use super::App;
use crate::error::{CatalogError, Result};
use crate::silo::{Element, Node};

/// Set of optional field categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RefineFlags(u32);

const FLAG_NAMES: &[(RefineFlags, &str)] = &[
    (RefineFlags::NAME, "name"),
    (RefineFlags::SUMMARY, "summary"),
    (RefineFlags::DESCRIPTION, "description"),
    (RefineFlags::VERSION, "version"),
    (RefineFlags::ICONS, "icons"),
    (RefineFlags::CATEGORIES, "categories"),
    (RefineFlags::KEYWORDS, "keywords"),
    (RefineFlags::PROVIDES, "provides"),
    (RefineFlags::SCREENSHOTS, "screenshots"),
    (RefineFlags::RELEASES, "releases"),
    (RefineFlags::URLS, "urls"),
    (RefineFlags::LICENSE, "license"),
    (RefineFlags::DEVELOPER, "developer"),
    (RefineFlags::PACKAGE, "package"),
    (RefineFlags::SIZE, "size"),
    (RefineFlags::KUDOS, "kudos"),
    (RefineFlags::ORIGIN, "origin"),
];

impl RefineFlags {
    pub const NONE: Self = Self(0);
    pub const NAME: Self = Self(1 << 0);
    pub const SUMMARY: Self = Self(1 << 1);
    pub const DESCRIPTION: Self = Self(1 << 2);
    pub const VERSION: Self = Self(1 << 3);
    pub const ICONS: Self = Self(1 << 4);
    pub const CATEGORIES: Self = Self(1 << 5);
    pub const KEYWORDS: Self = Self(1 << 6);
    pub const PROVIDES: Self = Self(1 << 7);
    pub const SCREENSHOTS: Self = Self(1 << 8);
    /// Release history
    pub const RELEASES: Self = Self(1 << 9);
    pub const URLS: Self = Self(1 << 10);
    /// Project license and project group
    pub const LICENSE: Self = Self(1 << 11);
    pub const DEVELOPER: Self = Self(1 << 12);
    /// Package names and launchables
    pub const PACKAGE: Self = Self(1 << 13);
    /// Download and installed size
    pub const SIZE: Self = Self(1 << 14);
    /// Kudos and custom metadata
    pub const KUDOS: Self = Self(1 << 15);
    pub const ORIGIN: Self = Self(1 << 16);

    /// Filled in by [`create_application`](super::create_application)
    pub const DEFAULT: Self = Self((1 << 10) - 1);
    pub const ALL: Self = Self((1 << 17) - 1);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Look up a single flag by its name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => return Some(Self::DEFAULT),
            "all" => return Some(Self::ALL),
            _ => {}
        }
        FLAG_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(flag, _)| *flag)
    }

    /// Names of the single flags contained in this set
    pub fn names(self) -> Vec<&'static str> {
        FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for RefineFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RefineFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RefineFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Flags in `self` but not in `rhs`
impl Sub for RefineFlags {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

impl fmt::Display for RefineFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.names().join("|"))
    }
}

/// Comma- or `|`-separated flag names, e.g. `urls,size`
impl FromStr for RefineFlags {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut flags = Self::NONE;
        for part in s.split([',', '|']).map(str::trim).filter(|p| !p.is_empty()) {
            let flag = Self::from_name(part).ok_or_else(|| format!("Unknown refine flag: {part}"))?;
            flags |= flag;
        }
        Ok(flags)
    }
}

impl Serialize for RefineFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

/// Fill the requested field categories of `app` from `node`
///
/// Categories already recorded in [`App::refined`] are skipped, and a field
/// that already holds a value is never replaced, so values set by the caller
/// before refinement win. The node must describe the same identifier as the
/// record. Callers must serialize refinement of one record.
pub fn refine(app: &mut App, node: &Node, flags: RefineFlags, locales: &Locales) -> Result<()> {
    let id = node
        .component_id()
        .ok_or(CatalogError::MissingIdentifier)?;
    if id != app.id {
        return Err(CatalogError::malformed(format!(
            "component {id} cannot refine {}",
            app.id
        )));
    }

    let pending = flags - app.refined;
    if pending.is_empty() {
        trace!(id, "Nothing left to refine");
        return Ok(());
    }

    if pending.contains(RefineFlags::NAME) && app.name.is_none() {
        app.name = parser::localized_text(node.children_of(Element::Name), locales);
    }
    if pending.contains(RefineFlags::SUMMARY) && app.summary.is_none() {
        app.summary = parser::localized_text(node.children_of(Element::Summary), locales);
    }
    if pending.contains(RefineFlags::DESCRIPTION) && app.description.is_none() {
        app.description =
            parser::localized_text(node.children_of(Element::Description), locales);
    }

    // version falls back to the newest release, so parse releases at most once
    let mut releases = None;
    if pending.contains(RefineFlags::RELEASES) && app.releases.is_empty() {
        app.releases = releases
            .get_or_insert_with(|| parser::parse_releases(node, locales))
            .clone();
    }
    if pending.contains(RefineFlags::VERSION) && app.version.is_none() {
        app.version = match node.attr("version").map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => Some(version.to_string()),
            None if !app.releases.is_empty() => app.releases.first().map(|r| r.version.clone()),
            None => releases
                .get_or_insert_with(|| parser::parse_releases(node, locales))
                .first()
                .map(|r| r.version.clone()),
        };
    }

    if pending.contains(RefineFlags::ICONS) && app.icons.is_empty() {
        app.icons = parser::parse_icons(node);
    }
    if pending.contains(RefineFlags::CATEGORIES) && app.categories.is_empty() {
        app.categories = parser::component_categories(node)
            .into_iter()
            .map(str::to_string)
            .collect();
    }
    if pending.contains(RefineFlags::KEYWORDS) && app.keywords.is_empty() {
        app.keywords = parser::parse_keywords(node, locales);
    }
    if pending.contains(RefineFlags::PROVIDES) && app.provides.is_empty() {
        app.provides = parser::component_provides(node);
    }
    if pending.contains(RefineFlags::SCREENSHOTS) && app.screenshots.is_empty() {
        app.screenshots = parser::parse_screenshots(node, locales);
    }
    if pending.contains(RefineFlags::URLS) && app.urls.is_empty() {
        app.urls = parser::parse_urls(node);
    }
    if pending.contains(RefineFlags::LICENSE) {
        if app.license.is_none() {
            app.license = node
                .children_of(Element::ProjectLicense)
                .find_map(Node::text)
                .map(str::to_string);
        }
        if app.project_group.is_none() {
            app.project_group = node
                .children_of(Element::ProjectGroup)
                .find_map(Node::text)
                .map(str::to_string);
        }
    }
    if pending.contains(RefineFlags::DEVELOPER) && app.developer_name.is_none() {
        app.developer_name =
            parser::localized_text(node.children_of(Element::DeveloperName), locales);
    }
    if pending.contains(RefineFlags::PACKAGE) {
        if app.pkgnames.is_empty() {
            app.pkgnames = parser::parse_pkgnames(node);
        }
        if app.launchables.is_empty() {
            app.launchables = parser::parse_launchables(node);
        }
    }
    if pending.contains(RefineFlags::SIZE) {
        let (download, installed) = parser::parse_sizes(node);
        app.size_download = app.size_download.or(download);
        app.size_installed = app.size_installed.or(installed);
    }
    if pending.contains(RefineFlags::KUDOS) {
        if app.kudos.is_empty() {
            app.kudos = parser::parse_kudos(node);
        }
        if app.metadata.is_empty() {
            app.metadata = parser::parse_metadata(node);
        }
    }
    if pending.contains(RefineFlags::ORIGIN) && app.origin.is_none() {
        app.origin = node.attr("origin").map(str::to_string);
    }

    app.refined |= pending;

    let ignored = parser::unknown_elements(node);
    if !ignored.is_empty() {
        trace!(id, ?ignored, "Ignored unknown component elements");
    }
    debug!(id, refined = %pending, "Refined application");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silo::{BuilderNode, ComponentKind};

    fn editor_node(version: &str) -> Node {
        let mut component = BuilderNode::new("component")
            .with_attr("type", "desktop-application")
            .with_attr("version", version)
            .with_attr("origin", "flathub");
        component.add_child(BuilderNode::new("id").with_text("org.example.Editor"));
        component.add_child(BuilderNode::new("name").with_text("Vector Editor"));
        component.add_child(BuilderNode::new("project_license").with_text("GPL-3.0+"));
        component.add_child(
            BuilderNode::new("url")
                .with_attr("type", "homepage")
                .with_text("https://example.org"),
        );
        component.add_child(
            BuilderNode::new("size")
                .with_attr("type", "download")
                .with_text("2048"),
        );
        let categories = component.add_child(BuilderNode::new("categories"));
        categories.add_child(BuilderNode::new("category").with_text("Graphics"));
        component.build()
    }

    #[test]
    fn test_flag_set_operations() {
        let flags = RefineFlags::ICONS | RefineFlags::SIZE;
        assert!(flags.contains(RefineFlags::ICONS));
        assert!(!flags.contains(RefineFlags::ICONS | RefineFlags::URLS));
        assert!(flags.intersects(RefineFlags::SIZE | RefineFlags::URLS));
        assert_eq!(flags - RefineFlags::ICONS, RefineFlags::SIZE);
        assert_eq!(flags & RefineFlags::SIZE, RefineFlags::SIZE);
        assert!(RefineFlags::ALL.contains(RefineFlags::DEFAULT | RefineFlags::ORIGIN));
        assert!(!RefineFlags::DEFAULT.contains(RefineFlags::URLS));
    }

    #[test]
    fn test_flags_parse_and_display() {
        let flags: RefineFlags = "urls, size|kudos".parse().unwrap();
        assert_eq!(flags, RefineFlags::URLS | RefineFlags::SIZE | RefineFlags::KUDOS);
        assert_eq!(flags.to_string(), "urls|size|kudos");
        assert_eq!(RefineFlags::NONE.to_string(), "none");
        assert!("urls,bogus".parse::<RefineFlags>().is_err());
        assert_eq!("all".parse::<RefineFlags>().unwrap(), RefineFlags::ALL);
    }

    #[test]
    fn test_refine_fills_requested_categories_only() {
        let node = editor_node("2.0");
        let mut app = App::new("org.example.Editor", ComponentKind::DesktopApplication);

        refine(&mut app, &node, RefineFlags::URLS | RefineFlags::SIZE, &Locales::untranslated())
            .unwrap();

        assert_eq!(app.url("homepage"), Some("https://example.org"));
        assert_eq!(app.size_download(), Some(2048));
        assert_eq!(app.name(), None);
        assert!(app.categories().is_empty());
        assert_eq!(app.refined(), RefineFlags::URLS | RefineFlags::SIZE);
    }

    #[test]
    fn test_refine_keeps_caller_values() {
        let node = editor_node("2.0");
        let mut app = App::new("org.example.Editor", ComponentKind::DesktopApplication);
        app.set_version("1.0");
        app.add_category("Office");

        refine(&mut app, &node, RefineFlags::ALL, &Locales::untranslated()).unwrap();

        assert_eq!(app.version(), Some("1.0"));
        assert_eq!(app.categories(), ["Office"]);
        assert_eq!(app.license(), Some("GPL-3.0+"));
        assert_eq!(app.origin(), Some("flathub"));
    }

    #[test]
    fn test_refine_twice_is_a_no_op() {
        let node = editor_node("2.0");
        let mut app = App::new("org.example.Editor", ComponentKind::DesktopApplication);
        refine(&mut app, &node, RefineFlags::ALL, &Locales::untranslated()).unwrap();
        let once = app.clone();
        refine(&mut app, &node, RefineFlags::ALL, &Locales::untranslated()).unwrap();
        assert_eq!(app, once);
    }

    #[test]
    fn test_refine_rejects_other_component() {
        let node = editor_node("2.0");
        let mut app = App::new("org.example.Other", ComponentKind::DesktopApplication);
        let err = refine(&mut app, &node, RefineFlags::NAME, &Locales::untranslated()).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedEntry { .. }));
        assert_eq!(app.refined(), RefineFlags::NONE);

        let nameless = BuilderNode::new("component").build();
        let err = refine(&mut app, &nameless, RefineFlags::NAME, &Locales::untranslated()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingIdentifier));
    }
}
