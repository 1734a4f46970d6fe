//! Build-time annotations on component nodes
//!
//! These helpers write the denormalized keyword, category, icon and provide
//! entries that queries rely on for cheap membership tests. They run on
//! [`BuilderNode`]s before a silo is compiled and never touch a loaded silo.

use tracing::trace;

use crate::silo::{BuilderNode, ComponentKind};

/// Collapse runs of whitespace and trim; `None` if nothing is left
fn normalize(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Append `<container><element>text</element></container>` unless an
/// identical entry already exists. Returns whether anything was added.
fn add_to_container(
    component: &mut BuilderNode,
    container: &str,
    element: &str,
    text: &str,
) -> bool {
    let Some(value) = normalize(text) else {
        return false;
    };

    let parent = component.get_or_add_child(container);
    if parent
        .children_named(element)
        .any(|c| c.text() == Some(value.as_str()))
    {
        return false;
    }

    trace!("Adding <{container}/{element}> {value}");
    parent.add_child(BuilderNode::new(element).with_text(value));
    true
}

/// Add a search keyword
pub fn add_keyword(component: &mut BuilderNode, text: &str) -> bool {
    add_to_container(component, "keywords", "keyword", text)
}

/// Add a category tag
pub fn add_category(component: &mut BuilderNode, text: &str) -> bool {
    add_to_container(component, "categories", "category", text)
}

/// Add an `id` provide token
pub fn add_provide(component: &mut BuilderNode, text: &str) -> bool {
    add_provide_kind(component, "id", text)
}

/// Add a provide token of a specific kind (`binary`, `mediatype`, ...)
pub fn add_provide_kind(component: &mut BuilderNode, kind: &str, text: &str) -> bool {
    add_to_container(component, "provides", kind, text)
}

/// Add a stock icon reference
pub fn add_icon(component: &mut BuilderNode, text: &str) -> bool {
    let Some(name) = normalize(text) else {
        return false;
    };
    if component
        .children_named("icon")
        .any(|icon| icon.text() == Some(name.as_str()))
    {
        return false;
    }

    component.add_child(
        BuilderNode::new("icon")
            .with_attr("type", "stock")
            .with_text(name),
    );
    true
}

/// Stock icon only for components that ship none of their own
fn add_fallback_icon(component: &mut BuilderNode, name: &str) {
    if component.child("icon").is_none() {
        add_icon(component, name);
    }
}

/// Derive keywords, categories and icons from the component kind
pub fn add_extra_info(component: &mut BuilderNode) {
    let kind = component.kind();
    match kind {
        ComponentKind::WebApplication => {
            add_keyword(component, kind.as_str());
        }
        ComponentKind::Font => {
            add_category(component, "Addon");
            add_category(component, "Font");
            add_fallback_icon(component, "system-component-fonts");
        }
        ComponentKind::Driver => {
            add_category(component, "Addon");
            add_category(component, "Driver");
            add_fallback_icon(component, "system-component-driver");
        }
        ComponentKind::Localization => {
            add_category(component, "Addon");
            add_category(component, "Localization");
            add_fallback_icon(component, "system-component-language");
        }
        ComponentKind::Codec => {
            add_category(component, "Addon");
            add_category(component, "Codec");
            add_fallback_icon(component, "system-component-codecs");
        }
        ComponentKind::InputMethod => {
            add_keyword(component, kind.as_str());
            add_category(component, "Addon");
            add_category(component, "InputSource");
            add_fallback_icon(component, "system-component-input-sources");
        }
        ComponentKind::Firmware => {
            add_fallback_icon(component, "system-component-firmware");
        }
        ComponentKind::Runtime => {
            add_category(component, "Addon");
            add_category(component, "Runtime");
            add_fallback_icon(component, "system-component-runtime");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(node: &'a BuilderNode, container: &str, element: &'a str) -> Vec<&'a str> {
        node.child(container)
            .map(|c| c.children_named(element).filter_map(|e| e.text()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_keywords_are_normalized_and_deduplicated() {
        let mut node = BuilderNode::new("component");
        assert!(add_keyword(&mut node, "  vector   graphics "));
        assert!(!add_keyword(&mut node, "vector graphics"));
        assert!(add_keyword(&mut node, "Vector graphics"));
        assert!(!add_keyword(&mut node, "   "));

        assert_eq!(
            texts(&node, "keywords", "keyword"),
            vec!["vector graphics", "Vector graphics"]
        );
    }

    #[test]
    fn test_categories_and_provides_use_their_containers() {
        let mut node = BuilderNode::new("component");
        add_category(&mut node, "Graphics");
        add_category(&mut node, "Graphics");
        add_provide(&mut node, "org.example.Old");
        add_provide_kind(&mut node, "binary", "example");

        assert_eq!(texts(&node, "categories", "category"), vec!["Graphics"]);
        assert_eq!(texts(&node, "provides", "id"), vec!["org.example.Old"]);
        assert_eq!(texts(&node, "provides", "binary"), vec!["example"]);
    }

    #[test]
    fn test_icons_are_stock_and_unique() {
        let mut node = BuilderNode::new("component");
        assert!(add_icon(&mut node, "accessories-text-editor"));
        assert!(!add_icon(&mut node, "accessories-text-editor"));

        let icons: Vec<_> = node.children_named("icon").collect();
        assert_eq!(icons.len(), 1);
        assert_eq!(icons[0].attr("type"), Some("stock"));
    }

    #[test]
    fn test_font_gets_addon_categories_and_icon() {
        let mut node = BuilderNode::new("component").with_attr("type", "font");
        add_extra_info(&mut node);
        add_extra_info(&mut node);

        assert_eq!(texts(&node, "categories", "category"), vec!["Addon", "Font"]);
        let icon = node.child("icon").unwrap();
        assert_eq!(icon.text(), Some("system-component-fonts"));
    }

    #[test]
    fn test_existing_icon_is_not_replaced_by_stock_icon() {
        let mut node = BuilderNode::new("component").with_attr("type", "codec");
        node.add_child(
            BuilderNode::new("icon")
                .with_attr("type", "cached")
                .with_text("gstreamer.png"),
        );
        add_extra_info(&mut node);

        let icons: Vec<_> = node.children_named("icon").filter_map(|i| i.text()).collect();
        assert_eq!(icons, vec!["gstreamer.png"]);
        assert_eq!(texts(&node, "categories", "category"), vec!["Addon", "Codec"]);
    }

    #[test]
    fn test_input_method_and_web_app_get_kind_keyword() {
        let mut ime = BuilderNode::new("component").with_attr("type", "input-method");
        add_extra_info(&mut ime);
        assert_eq!(texts(&ime, "keywords", "keyword"), vec!["input-method"]);

        let mut web = BuilderNode::new("component").with_attr("type", "web-application");
        add_extra_info(&mut web);
        assert_eq!(texts(&web, "keywords", "keyword"), vec!["web-application"]);
        assert!(web.child("categories").is_none());
    }

    #[test]
    fn test_desktop_application_is_left_alone() {
        let mut node = BuilderNode::new("component").with_attr("type", "desktop-application");
        let before = node.clone();
        add_extra_info(&mut node);
        assert_eq!(node, before);
    }
}
