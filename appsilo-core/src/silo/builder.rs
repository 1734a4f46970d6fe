//! Build-time component nodes and the silo compiler

use tracing::{debug, warn};

use super::format::{self, SiloPayload, MAX_DEPTH};
use super::node::{ComponentKind, Node};
use crate::error::{CatalogError, Result};
use crate::extra_info;

/// A mutable component node, only available before compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuilderNode {
    element: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<BuilderNode>,
}

impl BuilderNode {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Set an attribute, replacing any previous value for the key
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content, `None` when absent or blank
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn kind(&self) -> ComponentKind {
        self.attr("type")
            .map(ComponentKind::from_type)
            .unwrap_or(ComponentKind::Generic)
    }

    pub fn children(&self) -> &[BuilderNode] {
        &self.children
    }

    pub fn children_named<'a>(
        &'a self,
        element: &'a str,
    ) -> impl Iterator<Item = &'a BuilderNode> + 'a {
        self.children.iter().filter(move |c| c.element == element)
    }

    pub fn child(&self, element: &str) -> Option<&BuilderNode> {
        self.children.iter().find(|c| c.element == element)
    }

    pub fn child_mut(&mut self, element: &str) -> Option<&mut BuilderNode> {
        self.children.iter_mut().find(|c| c.element == element)
    }

    /// Append a child and return a handle to it
    pub fn add_child(&mut self, child: BuilderNode) -> &mut BuilderNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// First child with the given element name, created empty if missing
    pub fn get_or_add_child(&mut self, element: &str) -> &mut BuilderNode {
        match self.children.iter().position(|c| c.element == element) {
            Some(pos) => &mut self.children[pos],
            None => self.add_child(BuilderNode::new(element)),
        }
    }

    /// Levels below this node; a childless node has depth 0
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children.iter().map(|c| (c, depth + 1)));
        }
        deepest
    }

    /// Freeze into an immutable node
    pub fn build(mut self) -> Node {
        enum Step {
            Enter(BuilderNode),
            Leave(Node, usize),
        }

        // post-order with an explicit stack; finished children wait in `done`
        let root = std::mem::take(&mut self);
        let mut stack = vec![Step::Enter(root)];
        let mut done: Vec<Node> = Vec::new();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(mut node) => {
                    let children = std::mem::take(&mut node.children);
                    let shell = Node::from_parts(
                        std::mem::take(&mut node.element),
                        std::mem::take(&mut node.attrs),
                        node.text.take(),
                        Vec::new(),
                    );
                    stack.push(Step::Leave(shell, children.len()));
                    stack.extend(children.into_iter().rev().map(Step::Enter));
                }
                Step::Leave(mut shell, arity) => {
                    shell.children = done.split_off(done.len().saturating_sub(arity));
                    done.push(shell);
                }
            }
        }
        done.pop().unwrap_or_default()
    }
}

/// Tear the subtree down iteratively so deep trees cannot exhaust the stack
impl Drop for BuilderNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Collects components and compiles them into silo bytes
#[derive(Debug, Clone)]
pub struct SiloBuilder {
    components: Vec<BuilderNode>,
    origin: Option<String>,
    built_at: Option<i64>,
    extra_info: bool,
}

impl Default for SiloBuilder {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            origin: None,
            built_at: None,
            extra_info: true,
        }
    }
}

impl SiloBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label recorded in the silo header
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Pin the build timestamp instead of using the current time
    pub fn with_built_at(mut self, unix_secs: i64) -> Self {
        self.built_at = Some(unix_secs);
        self
    }

    /// Skip the kind-derived annotations of [`extra_info::add_extra_info`]
    pub fn without_extra_info(mut self) -> Self {
        self.extra_info = false;
        self
    }

    pub fn add_component(&mut self, component: BuilderNode) {
        if component.element() != "component" {
            warn!(
                "Adding <{}> as a top-level component node",
                component.element()
            );
        }
        self.components.push(component);
    }

    pub fn extend(&mut self, components: impl IntoIterator<Item = BuilderNode>) {
        for component in components {
            self.add_component(component);
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Annotate, freeze and encode every component
    ///
    /// Fails with [`CatalogError::MalformedEntry`] when a component nests
    /// deeper than a silo may hold.
    pub fn compile(mut self) -> Result<Vec<u8>> {
        if let Some(deep) = self.components.iter().find(|c| c.depth() > MAX_DEPTH) {
            return Err(CatalogError::malformed(format!(
                "component {:?} nests deeper than {MAX_DEPTH} levels",
                deep.child("id").and_then(BuilderNode::text)
            )));
        }

        let extra = self.extra_info;
        let origin = self.origin.take();
        let components: Vec<Node> = std::mem::take(&mut self.components)
            .into_iter()
            .map(|mut component| {
                if extra {
                    extra_info::add_extra_info(&mut component);
                }
                if let Some(origin) = &origin {
                    if component.attr("origin").is_none() {
                        component.set_attr("origin", origin.as_str());
                    }
                }
                component.build()
            })
            .collect();

        debug!("Compiling silo with {} components", components.len());

        let payload = SiloPayload {
            built_at: self
                .built_at
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            origin,
            components,
        };
        format::encode(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silo::Silo;

    #[test]
    fn test_set_attr_replaces_existing_value() {
        let mut node = BuilderNode::new("icon").with_attr("type", "stock");
        node.set_attr("type", "cached");
        node.set_attr("width", "64");
        assert_eq!(node.attr("type"), Some("cached"));
        assert_eq!(node.attr("width"), Some("64"));
        assert_eq!(node.clone().build().attrs().count(), 2);
    }

    #[test]
    fn test_get_or_add_child_reuses_container() {
        let mut node = BuilderNode::new("component");
        node.get_or_add_child("keywords")
            .add_child(BuilderNode::new("keyword").with_text("paint"));
        node.get_or_add_child("keywords")
            .add_child(BuilderNode::new("keyword").with_text("draw"));

        assert_eq!(node.children_named("keywords").count(), 1);
        let keywords = node.child("keywords").unwrap();
        assert_eq!(keywords.children().len(), 2);
    }

    #[test]
    fn test_compile_records_header_fields() {
        let mut builder = SiloBuilder::new()
            .with_origin("flathub")
            .with_built_at(1_650_000_000);
        builder.add_component(
            BuilderNode::new("component")
                .with_attr("type", "font")
                .with_text(""),
        );
        let silo = Silo::load(&builder.compile().unwrap()).unwrap();
        assert_eq!(silo.origin(), Some("flathub"));
        assert_eq!(silo.built_at(), 1_650_000_000);
        assert_eq!(silo.len(), 1);

        // components inherit the silo origin
        let component = silo.components().next().unwrap();
        assert_eq!(component.attr("origin"), Some("flathub"));
    }

    fn chain(levels: usize) -> BuilderNode {
        let mut node = BuilderNode::new("leaf");
        for _ in 0..levels {
            let mut parent = BuilderNode::new("wrap");
            parent.add_child(node);
            node = parent;
        }
        node
    }

    #[test]
    fn test_build_keeps_child_order() {
        let mut component = BuilderNode::new("component");
        component.add_child(BuilderNode::new("id").with_text("org.example.App"));
        let shots = component.add_child(BuilderNode::new("screenshots"));
        shots.add_child(BuilderNode::new("screenshot").with_attr("type", "default"));
        shots.add_child(BuilderNode::new("screenshot"));
        component.add_child(BuilderNode::new("name").with_text("App"));

        assert_eq!(component.depth(), 2);
        let node = component.build();
        let elements: Vec<_> = node.children().iter().map(Node::element).collect();
        assert_eq!(elements, vec!["id", "screenshots", "name"]);
        let shots = node.child("screenshots").unwrap();
        assert_eq!(shots.children().len(), 2);
        assert_eq!(shots.children()[0].attr("type"), Some("default"));
    }

    #[test]
    fn test_deep_trees_build_without_recursing() {
        let node = chain(200_000).build();
        assert_eq!(node.element(), "wrap");
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_compile_rejects_overly_nested_component() {
        let mut builder = SiloBuilder::new().without_extra_info();
        builder.add_component(chain(MAX_DEPTH + 1));
        let err = builder.compile().unwrap_err();
        assert!(matches!(err, CatalogError::MalformedEntry { .. }));

        let mut builder = SiloBuilder::new().without_extra_info();
        builder.add_component(chain(MAX_DEPTH));
        let silo = Silo::load(&builder.compile().unwrap()).unwrap();
        assert_eq!(silo.len(), 1);
    }

    #[test]
    fn test_extra_info_runs_unless_disabled() {
        let font = || BuilderNode::new("component").with_attr("type", "font");

        let mut builder = SiloBuilder::new();
        builder.add_component(font());
        let silo = Silo::load(&builder.compile().unwrap()).unwrap();
        let component = silo.components().next().unwrap();
        assert!(component.child("categories").is_some());

        let mut builder = SiloBuilder::new().without_extra_info();
        builder.add_component(font());
        let silo = Silo::load(&builder.compile().unwrap()).unwrap();
        let component = silo.components().next().unwrap();
        assert!(component.child("categories").is_none());
    }
}
