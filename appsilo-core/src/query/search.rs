//! Keyword search

use tracing::{debug, instrument};

use super::{build_apps, scan, AppList, QueryContext};
use crate::app::component_provides;
use crate::error::Result;
use crate::silo::{Element, Node, Silo};

/// Fields a search term can hit, one bit each
const FIELD_ID: u8 = 1 << 0;
const FIELD_NAME: u8 = 1 << 1;
const FIELD_SUMMARY: u8 = 1 << 2;
const FIELD_DESCRIPTION: u8 = 1 << 3;
const FIELD_KEYWORDS: u8 = 1 << 4;
const FIELD_PROVIDES: u8 = 1 << 5;

/// Case-fold and split terms on whitespace, dropping duplicates
pub fn normalize_terms<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for token in terms
        .iter()
        .flat_map(|t| t.as_ref().split_whitespace())
        .map(str::to_lowercase)
    {
        if !normalized.contains(&token) {
            normalized.push(token);
        }
    }
    normalized
}

/// Text content of description markup: tags are dropped, their
/// boundaries become spaces
fn markup_text(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

/// Lower-cased searchable text of one component, grouped by field
struct Haystack {
    fields: Vec<(u8, String)>,
}

impl Haystack {
    fn new(id: &str, node: &Node) -> Self {
        let mut fields = vec![(FIELD_ID, id.to_lowercase())];
        for (element, child) in node.elements() {
            match element {
                Element::Name => {
                    fields.extend(child.text().map(|t| (FIELD_NAME, t.to_lowercase())))
                }
                Element::Summary => {
                    fields.extend(child.text().map(|t| (FIELD_SUMMARY, t.to_lowercase())))
                }
                Element::Description => fields.extend(
                    child
                        .text()
                        .map(|t| (FIELD_DESCRIPTION, markup_text(t).to_lowercase())),
                ),
                Element::Keywords => fields.extend(
                    child
                        .children_named("keyword")
                        .filter_map(Node::text)
                        .map(|t| (FIELD_KEYWORDS, t.to_lowercase())),
                ),
                _ => {}
            }
        }
        fields.extend(
            component_provides(node)
                .into_iter()
                .map(|p| (FIELD_PROVIDES, p.value.to_lowercase())),
        );
        Self { fields }
    }

    /// Fields containing `term`
    fn hits(&self, term: &str) -> u8 {
        self.fields
            .iter()
            .filter(|(_, text)| text.contains(term))
            .fold(0, |mask, (field, _)| mask | field)
    }

    /// Number of distinct fields hit when every term matches somewhere
    fn score(&self, terms: &[String]) -> Option<u32> {
        let mut mask = 0u8;
        for term in terms {
            let hits = self.hits(term);
            if hits == 0 {
                return None;
            }
            mask |= hits;
        }
        Some(mask.count_ones())
    }
}

/// Append components matching every term, best matches first
///
/// A term matches a component when it is a substring of the identifier,
/// name, summary, description text, a keyword or a provides value (any
/// language). Description markup tags are not searchable. Components are ranked by how many distinct fields the terms
/// hit; ties keep document order. No terms means no results.
#[instrument(skip_all, fields(terms = terms.len()))]
pub fn search<S: AsRef<str>>(
    silo: &Silo,
    ctx: &QueryContext,
    terms: &[S],
    list: &mut AppList,
) -> Result<()> {
    let terms = normalize_terms(terms);
    if terms.is_empty() {
        debug!("Empty search, nothing to do");
        return Ok(());
    }

    let mut matches: Vec<(u32, &Node)> = Vec::new();
    scan(silo, ctx, |_, id, node| {
        if let Some(score) = Haystack::new(id, node).score(&terms) {
            matches.push((score, node));
        }
    })?;

    // stable: equal scores stay in document order
    matches.sort_by(|a, b| b.0.cmp(&a.0));

    let apps = build_apps(ctx, matches.into_iter().map(|(_, node)| node))?;
    let added = list.extend(apps);
    debug!(?terms, added, "Search finished");
    Ok(())
}
