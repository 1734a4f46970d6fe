//! Curated selections: popular, featured and recently updated components

use std::time::Duration;
use tracing::{debug, instrument};

use super::{build_apps, scan, AppList, QueryContext};
use crate::app::{newest_release_timestamp, FEATURED_KEY, POPULARITY_KEY, POPULAR_KUDO};
use crate::error::Result;
use crate::silo::{Element, Node, Silo};

fn has_kudo(node: &Node, kudo: &str) -> bool {
    node.children_of(Element::Kudos)
        .flat_map(|k| k.children_named("kudo"))
        .any(|k| k.text() == Some(kudo))
}

fn custom_value<'a>(node: &'a Node, key: &str) -> Option<&'a Node> {
    node.children_of(Element::Custom)
        .flat_map(|c| c.children_named("value"))
        .find(|v| v.attr("key") == Some(key))
}

/// Stored popularity score; absent or unparsable scores count as zero
fn popularity(node: &Node) -> i64 {
    let Some(raw) = custom_value(node, POPULARITY_KEY).and_then(Node::text) else {
        return 0;
    };
    raw.parse().unwrap_or_else(|_| {
        debug!("Ignoring non-numeric popularity '{raw}' on {:?}", node.component_id());
        0
    })
}

/// Append components flagged popular, highest popularity score first
#[instrument(skip_all)]
pub fn add_popular(silo: &Silo, ctx: &QueryContext, list: &mut AppList) -> Result<()> {
    let mut popular: Vec<(i64, &Node)> = Vec::new();
    scan(silo, ctx, |_, _, node| {
        if has_kudo(node, POPULAR_KUDO) {
            popular.push((popularity(node), node));
        }
    })?;
    popular.sort_by(|a, b| b.0.cmp(&a.0));

    let added = list.extend(build_apps(ctx, popular.into_iter().map(|(_, n)| n))?);
    debug!(added, "Listed popular applications");
    Ok(())
}

/// Append components flagged featured, in document order
#[instrument(skip_all)]
pub fn add_featured(silo: &Silo, ctx: &QueryContext, list: &mut AppList) -> Result<()> {
    let mut featured: Vec<&Node> = Vec::new();
    scan(silo, ctx, |_, _, node| {
        if custom_value(node, FEATURED_KEY).is_some() {
            featured.push(node);
        }
    })?;

    let added = list.extend(build_apps(ctx, featured)?);
    debug!(added, "Listed featured applications");
    Ok(())
}

/// Append components whose newest release is at most `age` old, newest first
#[instrument(skip(silo, ctx, list))]
pub fn add_recent(silo: &Silo, ctx: &QueryContext, list: &mut AppList, age: Duration) -> Result<()> {
    let age = i64::try_from(age.as_secs()).unwrap_or(i64::MAX);
    let cutoff = ctx.now().saturating_sub(age);

    let mut recent: Vec<(i64, &Node)> = Vec::new();
    scan(silo, ctx, |_, _, node| {
        if let Some(timestamp) = newest_release_timestamp(node) {
            if timestamp >= cutoff {
                recent.push((timestamp, node));
            }
        }
    })?;
    recent.sort_by(|a, b| b.0.cmp(&a.0));

    let added = list.extend(build_apps(ctx, recent.into_iter().map(|(_, n)| n))?);
    debug!(added, cutoff, "Listed recent applications");
    Ok(())
}
