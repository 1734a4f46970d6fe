//! Application records
//!
//! An [`App`] is the structured, queryable form of one component node. It is
//! created by [`create_application`] and grown by [`refine`]; fields are only
//! ever added, never cleared. [`App::refined`] records which field categories
//! have been filled so repeated refinement does no work.

mod locale;
mod parser;
mod refine;
mod version;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::silo::ComponentKind;

pub use locale::Locales;
pub use parser::create_application;
pub use refine::{refine, RefineFlags};
pub use version::compare_versions;

pub(crate) use parser::{component_categories, component_provides, newest_release_timestamp};

/// Kudo marking a component as popular
pub const POPULAR_KUDO: &str = "GnomeSoftware::popular";

/// Custom metadata key holding the integer popularity score
pub const POPULARITY_KEY: &str = "GnomeSoftware::popularity";

/// Custom metadata key marking a featured component
pub const FEATURED_KEY: &str = "GnomeSoftware::FeatureTile";

/// Where an icon reference points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    /// Themed icon name
    Stock,
    /// File in the catalog's icon cache
    Cached,
    /// Absolute path on the local system
    Local,
    /// URL
    Remote,
    Unknown,
}

impl IconKind {
    fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("stock") | None => IconKind::Stock,
            Some("cached") => IconKind::Cached,
            Some("local") => IconKind::Local,
            Some("remote") => IconKind::Remote,
            Some(_) => IconKind::Unknown,
        }
    }
}

/// Icon reference; resolving it to pixels is up to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub kind: IconKind,
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<u32>,
}

impl Icon {
    pub fn stock(name: impl Into<String>) -> Self {
        Self {
            kind: IconKind::Stock,
            name: name.into(),
            width: None,
            height: None,
            scale: None,
        }
    }
}

/// A capability the application satisfies (`mediatype`, `binary`, `id`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Provide {
    pub kind: String,
    pub value: String,
}

impl Provide {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Source,
    Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub kind: ImageKind,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screenshot {
    /// Primary screenshot of the application
    pub is_default: bool,
    pub caption: Option<String>,
    pub images: Vec<Image>,
}

/// One release history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub version: String,
    /// Unix seconds
    pub timestamp: i64,
    pub urgency: Option<String>,
    /// Release notes markup
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Launchable {
    pub kind: String,
    pub value: String,
}

/// Structured representation of one catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct App {
    id: String,
    kind: ComponentKind,
    name: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    version: Option<String>,
    icons: Vec<Icon>,
    categories: Vec<String>,
    keywords: BTreeSet<String>,
    provides: BTreeSet<Provide>,
    screenshots: Vec<Screenshot>,
    releases: Vec<Release>,
    urls: BTreeMap<String, String>,
    license: Option<String>,
    project_group: Option<String>,
    developer_name: Option<String>,
    pkgnames: Vec<String>,
    launchables: Vec<Launchable>,
    size_download: Option<u64>,
    size_installed: Option<u64>,
    kudos: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
    origin: Option<String>,
    refined: RefineFlags,
}

/// Replace `slot` only with a non-blank value
fn set_nonempty(slot: &mut Option<String>, value: impl Into<String>) {
    let value = value.into();
    if !value.trim().is_empty() {
        *slot = Some(value);
    }
}

impl App {
    /// A bare record with only identity filled in
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            summary: None,
            description: None,
            version: None,
            icons: Vec::new(),
            categories: Vec::new(),
            keywords: BTreeSet::new(),
            provides: BTreeSet::new(),
            screenshots: Vec::new(),
            releases: Vec::new(),
            urls: BTreeMap::new(),
            license: None,
            project_group: None,
            developer_name: None,
            pkgnames: Vec::new(),
            launchables: Vec::new(),
            size_download: None,
            size_installed: None,
            kudos: BTreeSet::new(),
            metadata: BTreeMap::new(),
            origin: None,
            refined: RefineFlags::NONE,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier without a trailing `.desktop`
    pub fn base_id(&self) -> &str {
        base_id(&self.id)
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Description markup
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    pub fn provides(&self) -> &BTreeSet<Provide> {
        &self.provides
    }

    pub fn screenshots(&self) -> &[Screenshot] {
        &self.screenshots
    }

    /// Releases, newest first
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn newest_release(&self) -> Option<&Release> {
        self.releases.first()
    }

    /// URLs keyed by type (`homepage`, `bugtracker`, ...)
    pub fn urls(&self) -> &BTreeMap<String, String> {
        &self.urls
    }

    pub fn url(&self, kind: &str) -> Option<&str> {
        self.urls.get(kind).map(String::as_str)
    }

    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    pub fn project_group(&self) -> Option<&str> {
        self.project_group.as_deref()
    }

    pub fn developer_name(&self) -> Option<&str> {
        self.developer_name.as_deref()
    }

    pub fn pkgnames(&self) -> &[String] {
        &self.pkgnames
    }

    pub fn launchables(&self) -> &[Launchable] {
        &self.launchables
    }

    pub fn size_download(&self) -> Option<u64> {
        self.size_download
    }

    pub fn size_installed(&self) -> Option<u64> {
        self.size_installed
    }

    pub fn kudos(&self) -> &BTreeSet<String> {
        &self.kudos
    }

    /// Custom key/value metadata
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn is_popular(&self) -> bool {
        self.kudos.contains(POPULAR_KUDO)
    }

    pub fn is_featured(&self) -> bool {
        self.metadata.contains_key(FEATURED_KEY)
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Field categories already filled in
    pub fn refined(&self) -> RefineFlags {
        self.refined
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        set_nonempty(&mut self.name, name);
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        set_nonempty(&mut self.summary, summary);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        set_nonempty(&mut self.description, description);
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        set_nonempty(&mut self.version, version);
    }

    pub fn set_license(&mut self, license: impl Into<String>) {
        set_nonempty(&mut self.license, license);
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) {
        set_nonempty(&mut self.origin, origin);
    }

    pub fn add_icon(&mut self, icon: Icon) {
        if !self.icons.contains(&icon) {
            self.icons.push(icon);
        }
    }

    pub fn add_category(&mut self, category: impl Into<String>) {
        let category = category.into();
        if !category.is_empty() && !self.has_category(&category) {
            self.categories.push(category);
        }
    }

    pub fn add_keyword(&mut self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        if !keyword.is_empty() {
            self.keywords.insert(keyword);
        }
    }

    pub fn add_provide(&mut self, provide: Provide) {
        self.provides.insert(provide);
    }
}

/// Identifier without a trailing `.desktop`
pub fn base_id(id: &str) -> &str {
    id.strip_suffix(".desktop").unwrap_or(id)
}
