//! Component node model
//!
//! A silo is a flat list of `component` nodes. Each node has an element name,
//! ordered attributes, optional text and ordered children. Nodes are immutable
//! once they are part of a silo; build-time mutation goes through
//! [`BuilderNode`](super::builder::BuilderNode).

use serde::{Serialize, Serializer};
use std::fmt;

/// Attribute carrying the language of a translated element
pub const LANG_ATTR: &str = "xml:lang";

/// One node of the component tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub(super) element: String,
    pub(super) attrs: Vec<(String, String)>,
    pub(super) text: Option<String>,
    pub(super) children: Vec<Node>,
}

/// Tear the subtree down iteratively so deep trees cannot exhaust the stack
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl Node {
    pub(crate) fn from_parts(
        element: String,
        attrs: Vec<(String, String)>,
        text: Option<String>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            element,
            attrs,
            text,
            children,
        }
    }

    /// Element name (`component`, `name`, `release`, ...)
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Look up an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in insertion order
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Trimmed text content, `None` when absent or blank
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Language tag of a translated element
    pub fn lang(&self) -> Option<&str> {
        self.attr(LANG_ATTR)
    }

    /// Ordered children
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// First child with the given element name
    pub fn child(&self, element: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.element == element)
    }

    /// Every child with the given element name, in order
    pub fn children_named<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.element == element)
    }

    /// Text of the first child with the given element name
    pub fn child_text(&self, element: &str) -> Option<&str> {
        self.child(element).and_then(Node::text)
    }

    /// Component identifier (`<id>` child text)
    pub fn component_id(&self) -> Option<&str> {
        self.children_of(Element::Id).next().and_then(Node::text)
    }

    /// Component kind from the `type` attribute
    pub fn kind(&self) -> ComponentKind {
        self.attr("type")
            .map(ComponentKind::from_type)
            .unwrap_or(ComponentKind::Generic)
    }

    /// Classified children of a component node
    pub fn elements(&self) -> impl Iterator<Item = (Element<'_>, &Node)> {
        self.children
            .iter()
            .map(|c| (Element::from_name(&c.element), c))
    }

    /// Children classified as `element`, in order
    pub fn children_of<'a>(
        &'a self,
        element: Element<'a>,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.elements()
            .filter(move |(kind, _)| *kind == element)
            .map(|(_, node)| node)
    }
}

/// Child elements of a component that the engine understands.
///
/// Anything else lands in `Unknown` and is skipped by the parser, so new
/// fields in the catalog format do not break older readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element<'a> {
    Id,
    Name,
    Summary,
    Description,
    DeveloperName,
    Icon,
    Categories,
    Keywords,
    Provides,
    Screenshots,
    Releases,
    Url,
    ProjectLicense,
    ProjectGroup,
    Pkgname,
    Launchable,
    Kudos,
    Custom,
    Size,
    Unknown(&'a str),
}

impl<'a> Element<'a> {
    pub fn from_name(name: &'a str) -> Self {
        match name {
            "id" => Element::Id,
            "name" => Element::Name,
            "summary" => Element::Summary,
            "description" => Element::Description,
            "developer_name" => Element::DeveloperName,
            "icon" => Element::Icon,
            "categories" => Element::Categories,
            "keywords" => Element::Keywords,
            "provides" => Element::Provides,
            "screenshots" => Element::Screenshots,
            "releases" => Element::Releases,
            "url" => Element::Url,
            "project_license" => Element::ProjectLicense,
            "project_group" => Element::ProjectGroup,
            "pkgname" => Element::Pkgname,
            "launchable" => Element::Launchable,
            "kudos" => Element::Kudos,
            "custom" => Element::Custom,
            "size" => Element::Size,
            other => Element::Unknown(other),
        }
    }

    /// Element name as written in the catalog
    pub fn name(self) -> &'a str {
        match self {
            Element::Id => "id",
            Element::Name => "name",
            Element::Summary => "summary",
            Element::Description => "description",
            Element::DeveloperName => "developer_name",
            Element::Icon => "icon",
            Element::Categories => "categories",
            Element::Keywords => "keywords",
            Element::Provides => "provides",
            Element::Screenshots => "screenshots",
            Element::Releases => "releases",
            Element::Url => "url",
            Element::ProjectLicense => "project_license",
            Element::ProjectGroup => "project_group",
            Element::Pkgname => "pkgname",
            Element::Launchable => "launchable",
            Element::Kudos => "kudos",
            Element::Custom => "custom",
            Element::Size => "size",
            Element::Unknown(name) => name,
        }
    }
}

/// Kind tag of a component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    DesktopApplication,
    ConsoleApplication,
    WebApplication,
    Addon,
    Font,
    Codec,
    InputMethod,
    Firmware,
    Driver,
    Localization,
    Runtime,
    Generic,
    Unknown(String),
}

impl ComponentKind {
    /// Parse the `type` attribute of a component
    pub fn from_type(value: &str) -> Self {
        match value {
            "desktop-application" | "desktop" => ComponentKind::DesktopApplication,
            "console-application" => ComponentKind::ConsoleApplication,
            "web-application" => ComponentKind::WebApplication,
            "addon" => ComponentKind::Addon,
            "font" => ComponentKind::Font,
            "codec" => ComponentKind::Codec,
            "input-method" | "inputmethod" => ComponentKind::InputMethod,
            "firmware" => ComponentKind::Firmware,
            "driver" => ComponentKind::Driver,
            "localization" => ComponentKind::Localization,
            "runtime" => ComponentKind::Runtime,
            "generic" | "" => ComponentKind::Generic,
            other => ComponentKind::Unknown(other.to_string()),
        }
    }

    /// The `type` attribute spelling
    pub fn as_str(&self) -> &str {
        match self {
            ComponentKind::DesktopApplication => "desktop-application",
            ComponentKind::ConsoleApplication => "console-application",
            ComponentKind::WebApplication => "web-application",
            ComponentKind::Addon => "addon",
            ComponentKind::Font => "font",
            ComponentKind::Codec => "codec",
            ComponentKind::InputMethod => "input-method",
            ComponentKind::Firmware => "firmware",
            ComponentKind::Driver => "driver",
            ComponentKind::Localization => "localization",
            ComponentKind::Runtime => "runtime",
            ComponentKind::Generic => "generic",
            ComponentKind::Unknown(other) => other,
        }
    }
}

impl Serialize for ComponentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
