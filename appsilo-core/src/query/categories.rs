//! Category listing and category membership

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::{build_apps, scan, AppList, QueryContext};
use crate::app::component_categories;
use crate::error::Result;
use crate::silo::{Node, Silo};

/// A category tag and how many components carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub name: String,
    pub size: usize,
}

impl CategoryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
        }
    }
}

/// Append every distinct category in first-seen document order
///
/// Entries already present in `list` (same name) have their counts
/// increased instead of being duplicated.
#[instrument(skip_all)]
pub fn add_categories(silo: &Silo, ctx: &QueryContext, list: &mut Vec<CategoryEntry>) -> Result<()> {
    let mut found: Vec<CategoryEntry> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    scan(silo, ctx, |_, _, node| {
        for category in component_categories(node) {
            let pos = *positions.entry(category).or_insert_with(|| {
                found.push(CategoryEntry::new(category));
                found.len() - 1
            });
            found[pos].size += 1;
        }
    })?;

    debug!(categories = found.len(), "Collected categories");
    for entry in found {
        match list.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => existing.size += entry.size,
            None => list.push(entry),
        }
    }
    Ok(())
}

/// Whether a component belongs to `category`
///
/// `Audio::Video` style desktop groups require every part to be present.
fn in_category(node: &Node, parts: &[&str]) -> bool {
    let categories = component_categories(node);
    parts.iter().all(|part| categories.contains(part))
}

/// Append the components of one category in document order
#[instrument(skip(silo, ctx, list))]
pub fn add_category_apps(
    silo: &Silo,
    ctx: &QueryContext,
    category: &str,
    list: &mut AppList,
) -> Result<()> {
    let parts: Vec<&str> = category
        .split("::")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Ok(());
    }

    let mut members: Vec<&Node> = Vec::new();
    scan(silo, ctx, |_, _, node| {
        if in_category(node, &parts) {
            members.push(node);
        }
    })?;

    let added = list.extend(build_apps(ctx, members)?);
    debug!(added, "Listed category members");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::silo_from_yaml;

    const CATALOG: &str = r#"
- ID: org.example.Paint
  Categories: [Graphics, RasterGraphics]
- ID: org.example.Player
  Categories: [AudioVideo, Audio]
- ID: org.example.Draw
  Categories: [Graphics, VectorGraphics, Graphics]
- ID: org.example.Font
  Type: font
"#;

    #[test]
    fn test_categories_in_first_seen_order_with_counts() {
        let silo = silo_from_yaml(CATALOG);
        let mut list = Vec::new();
        add_categories(&silo, &QueryContext::default(), &mut list).unwrap();

        let summary: Vec<(&str, usize)> = list.iter().map(|c| (c.name.as_str(), c.size)).collect();
        assert_eq!(
            summary,
            vec![
                ("Graphics", 2),
                ("RasterGraphics", 1),
                ("AudioVideo", 1),
                ("Audio", 1),
                ("VectorGraphics", 1),
                ("Addon", 1),
                ("Font", 1),
            ]
        );
    }

    #[test]
    fn test_categories_merge_into_existing_entries() {
        let silo = silo_from_yaml(CATALOG);
        let mut list = vec![CategoryEntry {
            name: "Graphics".to_string(),
            size: 5,
        }];
        add_categories(&silo, &QueryContext::default(), &mut list).unwrap();
        assert_eq!(list[0].size, 7);
        assert_eq!(list.iter().filter(|c| c.name == "Graphics").count(), 1);
    }

    #[test]
    fn test_category_apps_in_document_order() {
        let silo = silo_from_yaml(CATALOG);
        let mut list = AppList::new();
        add_category_apps(&silo, &QueryContext::default(), "Graphics", &mut list).unwrap();
        assert_eq!(list.ids(), vec!["org.example.Paint", "org.example.Draw"]);
    }

    #[test]
    fn test_desktop_group_requires_all_parts() {
        let silo = silo_from_yaml(CATALOG);
        let mut list = AppList::new();
        add_category_apps(&silo, &QueryContext::default(), "Graphics::VectorGraphics", &mut list)
            .unwrap();
        assert_eq!(list.ids(), vec!["org.example.Draw"]);

        let mut none = AppList::new();
        add_category_apps(&silo, &QueryContext::default(), "", &mut none).unwrap();
        assert!(none.is_empty());
    }
}
