//! Appsilo core library
//!
//! An application-metadata catalog engine: compiled component silos are
//! loaded into an immutable [`silo::Silo`], turned into [`app::App`]
//! records on demand and queried by keyword, category and curated
//! selections.

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extra_info;
pub mod query;
pub mod silo;

pub use app::{create_application, refine, App, Locales, RefineFlags};
pub use catalog::Catalog;
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use query::{AppList, CategoryEntry, QueryContext};
pub use silo::{Silo, SiloBuilder};
