//! Query engine
//!
//! Every query walks a [`Silo`] in document order and appends its results
//! to a caller-owned collection. Results are staged locally and only
//! appended once the whole query succeeded, so a cancelled query leaves the
//! caller's list untouched.
//!
//! Components that cannot be turned into records (no identifier, broken
//! data) are skipped with a warning; they never fail the query.

mod alternates;
mod categories;
mod search;
mod selections;

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::app::{create_application, refine, App, Locales, RefineFlags};
use crate::error::{CatalogError, Result};
use crate::silo::{Node, Silo};

pub use alternates::add_alternates;
pub use categories::{add_categories, add_category_apps, CategoryEntry};
pub use search::{normalize_terms, search};
pub use selections::{add_featured, add_popular, add_recent};

/// Default number of nodes between cancellation checks
pub const DEFAULT_CHECK_INTERVAL: usize = 64;

/// Per-query settings: locale preferences, cancellation, clock
#[derive(Debug, Clone)]
pub struct QueryContext {
    locales: Locales,
    cancel: CancellationToken,
    check_interval: usize,
    now: Option<i64>,
    refine: RefineFlags,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new(Locales::untranslated())
    }
}

impl QueryContext {
    pub fn new(locales: Locales) -> Self {
        Self {
            locales,
            cancel: CancellationToken::new(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            now: None,
            refine: RefineFlags::DEFAULT,
        }
    }

    /// Use a caller-owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Check for cancellation every `interval` nodes (at least every node)
    pub fn with_check_interval(mut self, interval: usize) -> Self {
        self.check_interval = interval.max(1);
        self
    }

    /// Evaluate time-relative queries as of `unix_secs` instead of now
    pub fn at_time(mut self, unix_secs: i64) -> Self {
        self.now = Some(unix_secs);
        self
    }

    /// Fields to fill on every returned record, on top of the defaults
    pub fn with_refine(mut self, flags: RefineFlags) -> Self {
        self.refine = RefineFlags::DEFAULT | flags;
        self
    }

    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn check_interval(&self) -> usize {
        self.check_interval
    }

    pub fn refine_flags(&self) -> RefineFlags {
        self.refine
    }

    pub(crate) fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| chrono::Utc::now().timestamp())
    }

    /// `Err(Cancelled)` once the token has been cancelled
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(CatalogError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn check_at(&self, idx: usize) -> Result<()> {
        if idx % self.check_interval == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

/// Visit every component that has an identifier, in document order
///
/// `visit` receives the document position, the identifier and the node.
pub(crate) fn scan<'a, F>(silo: &'a Silo, ctx: &QueryContext, mut visit: F) -> Result<()>
where
    F: FnMut(usize, &'a str, &'a Node),
{
    ctx.check()?;
    for (idx, node) in silo.components().enumerate() {
        ctx.check_at(idx)?;
        match node.component_id() {
            Some(id) => visit(idx, id, node),
            None => warn!(position = idx, "Skipping component without an identifier"),
        }
    }
    ctx.check()
}

/// Turn matched nodes into records, skipping ones that fail to parse
pub(crate) fn build_apps<'a, I>(ctx: &QueryContext, nodes: I) -> Result<Vec<App>>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut apps = Vec::new();
    for (idx, node) in nodes.into_iter().enumerate() {
        ctx.check_at(idx)?;
        let built = create_application(node, &ctx.locales).and_then(|mut app| {
            refine(&mut app, node, ctx.refine, &ctx.locales)?;
            Ok(app)
        });
        match built {
            Ok(app) => apps.push(app),
            Err(e) => warn!("Skipping component {:?}: {e}", node.component_id()),
        }
    }
    ctx.check()?;
    Ok(apps)
}

/// Ordered application records without duplicate identifiers
#[derive(Debug, Clone, Default)]
pub struct AppList {
    apps: Vec<App>,
    ids: HashSet<String>,
}

impl AppList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an app with the same identifier is already listed
    pub fn add(&mut self, app: App) -> bool {
        if self.ids.contains(app.id()) {
            return false;
        }
        self.ids.insert(app.id().to_string());
        self.apps.push(app);
        true
    }

    /// Append every app in order, returning how many were new
    pub fn extend(&mut self, apps: impl IntoIterator<Item = App>) -> usize {
        let mut added = 0;
        for app in apps {
            if self.add(app) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, idx: usize) -> Option<&App> {
        self.apps.get(idx)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, App> {
        self.apps.iter()
    }

    pub fn as_slice(&self) -> &[App] {
        &self.apps
    }

    /// Identifiers in list order
    pub fn ids(&self) -> Vec<&str> {
        self.apps.iter().map(App::id).collect()
    }

    pub fn into_vec(self) -> Vec<App> {
        self.apps
    }
}

impl Serialize for AppList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.apps)
    }
}

impl<'a> IntoIterator for &'a AppList {
    type Item = &'a App;
    type IntoIter = std::slice::Iter<'a, App>;

    fn into_iter(self) -> Self::IntoIter {
        self.apps.iter()
    }
}

impl IntoIterator for AppList {
    type Item = App;
    type IntoIter = std::vec::IntoIter<App>;

    fn into_iter(self) -> Self::IntoIter {
        self.apps.into_iter()
    }
}
