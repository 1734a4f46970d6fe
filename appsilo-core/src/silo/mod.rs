//! Document store over a compiled component silo
//!
//! A [`Silo`] is the loaded, immutable form of a compiled catalog. It owns
//! the component nodes in document order plus an identifier index, and has
//! no mutation API: a refresh builds a new silo and swaps it in through
//! [`Catalog`](crate::catalog::Catalog).
//!
//! ```text
//! catalog source (YAML)
//!        │  source::import_yaml
//!        ▼
//! SiloBuilder ── extra_info::add_extra_info
//!        │  compile()
//!        ▼
//!   silo bytes ──► Silo::load ──► queries / parser / refinement
//! ```

pub mod builder;
mod format;
mod node;
pub mod source;

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CatalogError, Result};

pub use builder::{BuilderNode, SiloBuilder};
pub use format::{FORMAT_VERSION, MAGIC};
pub use node::{ComponentKind, Element, Node, LANG_ATTR};

use format::SiloPayload;

/// Immutable, indexed set of component nodes
#[derive(Debug, Default)]
pub struct Silo {
    built_at: i64,
    origin: Option<String>,
    checksum: String,
    components: Vec<Node>,
    by_id: HashMap<String, usize>,
}

impl Silo {
    /// A store with no components
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode and index a compiled silo
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let (payload, checksum) = format::decode(bytes)?;
        let silo = Self::from_payload(payload, checksum);
        info!(
            components = silo.len(),
            checksum = %silo.checksum,
            "Loaded silo"
        );
        Ok(silo)
    }

    /// Read a compiled silo from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Self::load(&bytes)
    }

    fn from_payload(payload: SiloPayload, checksum: String) -> Self {
        let mut by_id = HashMap::with_capacity(payload.components.len());
        for (idx, component) in payload.components.iter().enumerate() {
            if let Some(id) = component.component_id() {
                // First occurrence wins
                by_id.entry(id.to_string()).or_insert(idx);
            }
        }

        Self {
            built_at: payload.built_at,
            origin: payload.origin,
            checksum,
            components: payload.components,
            by_id,
        }
    }

    /// Look up a component by identifier
    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.by_id.get(id).map(|&idx| &self.components[idx])
    }

    /// Components in document order
    pub fn components(&self) -> impl Iterator<Item = &Node> {
        self.components.iter()
    }

    /// Number of component nodes, including ones without an identifier
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Build time (unix seconds)
    pub fn built_at(&self) -> i64 {
        self.built_at
    }

    /// Origin label recorded at build time
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Hex SHA-256 of the payload, empty for [`Silo::empty`]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}
