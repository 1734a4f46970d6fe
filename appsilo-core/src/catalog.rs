//! Shared catalog handle with atomic snapshot swaps
//!
//! Readers pin the current [`Silo`] with [`Catalog::snapshot`] and keep
//! using it for the whole query, even if a reload swaps in a newer silo
//! meanwhile. Loads decode first and only swap on success, so a corrupt
//! blob never replaces a good snapshot.

use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::{create_application, App};
use crate::error::Result;
use crate::query::{self, AppList, CategoryEntry, QueryContext};
use crate::silo::Silo;

/// The currently authoritative silo
#[derive(Debug)]
pub struct Catalog {
    current: ArcSwap<Silo>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// A catalog serving an empty store until something is loaded
    pub fn new() -> Self {
        Self::from_silo(Silo::empty())
    }

    pub fn from_silo(silo: Silo) -> Self {
        Self {
            current: ArcSwap::from_pointee(silo),
        }
    }

    /// Open a compiled silo file as the initial snapshot
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_silo(Silo::open(path)?))
    }

    /// Pin the current silo
    pub fn snapshot(&self) -> Arc<Silo> {
        self.current.load_full()
    }

    /// Replace the current silo, returning the previous one
    pub fn swap(&self, silo: Silo) -> Arc<Silo> {
        let previous = self.current.swap(Arc::new(silo));
        let current = self.current.load();
        info!(
            components = current.len(),
            checksum = current.checksum(),
            previous = previous.checksum(),
            "Swapped catalog snapshot"
        );
        previous
    }

    /// Decode `bytes` and make them current
    ///
    /// On error the previous snapshot stays in place.
    pub fn load(&self, bytes: &[u8]) -> Result<()> {
        let silo = Silo::load(bytes).inspect_err(|e| {
            warn!("Keeping previous catalog snapshot: {e}");
        })?;
        self.swap(silo);
        Ok(())
    }

    /// Read a compiled silo file and make it current
    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let silo = Silo::open(path).inspect_err(|e| {
            warn!("Keeping previous catalog snapshot, {} failed: {e}", path.display());
        })?;
        self.swap(silo);
        Ok(())
    }

    /// Build the record for one identifier, refined per the context
    pub fn lookup(&self, ctx: &QueryContext, id: &str) -> Result<Option<App>> {
        let silo = self.snapshot();
        let Some(node) = silo.find_by_id(id) else {
            return Ok(None);
        };
        let mut app = create_application(node, ctx.locales())?;
        crate::app::refine(&mut app, node, ctx.refine_flags(), ctx.locales())?;
        Ok(Some(app))
    }

    pub fn search<S: AsRef<str>>(&self, ctx: &QueryContext, terms: &[S]) -> Result<AppList> {
        let mut list = AppList::new();
        query::search(&self.snapshot(), ctx, terms, &mut list)?;
        Ok(list)
    }

    pub fn categories(&self, ctx: &QueryContext) -> Result<Vec<CategoryEntry>> {
        let mut list = Vec::new();
        query::add_categories(&self.snapshot(), ctx, &mut list)?;
        Ok(list)
    }

    pub fn category_apps(&self, ctx: &QueryContext, category: &str) -> Result<AppList> {
        let mut list = AppList::new();
        query::add_category_apps(&self.snapshot(), ctx, category, &mut list)?;
        Ok(list)
    }

    pub fn popular(&self, ctx: &QueryContext) -> Result<AppList> {
        let mut list = AppList::new();
        query::add_popular(&self.snapshot(), ctx, &mut list)?;
        Ok(list)
    }

    pub fn featured(&self, ctx: &QueryContext) -> Result<AppList> {
        let mut list = AppList::new();
        query::add_featured(&self.snapshot(), ctx, &mut list)?;
        Ok(list)
    }

    pub fn recent(&self, ctx: &QueryContext, age: Duration) -> Result<AppList> {
        let mut list = AppList::new();
        query::add_recent(&self.snapshot(), ctx, &mut list, age)?;
        Ok(list)
    }

    pub fn alternates(&self, ctx: &QueryContext, app: &App) -> Result<AppList> {
        let mut list = AppList::new();
        query::add_alternates(&self.snapshot(), ctx, app, &mut list)?;
        Ok(list)
    }
}
