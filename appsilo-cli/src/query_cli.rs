//! Catalog query commands
//!
//! Each query runs on a blocking worker; Ctrl-C cancels it through the
//! query context's cancellation token.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::sync::Arc;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info};

use appsilo_core::{App, AppList, Catalog, CatalogConfig, CategoryEntry, QueryContext, RefineFlags};

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Search applications by keyword
    Search {
        /// Search terms; every term must match
        #[clap(required = true)]
        terms: Vec<String>,
    },

    /// List categories with their application counts
    Categories,

    /// List the applications of a category (`Audio::Video` groups allowed)
    Category {
        /// Category name
        name: String,
    },

    /// List popular applications
    Popular,

    /// List featured applications
    Featured,

    /// List recently updated applications
    Recent {
        /// Maximum release age in seconds (defaults to the config value)
        #[clap(long)]
        age: Option<u64>,
    },

    /// List alternate identities of an application
    Alternates {
        /// Application identifier
        id: String,
    },

    /// Show one application
    Show {
        /// Application identifier
        id: String,

        /// Fill every optional field, not only the defaults
        #[clap(long)]
        all: bool,
    },
}

/// Table row for application lists
#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

impl From<&App> for AppRow {
    fn from(app: &App) -> Self {
        Self {
            id: app.id().to_string(),
            name: app.name().unwrap_or("-").to_string(),
            version: app.version().unwrap_or("-").to_string(),
            summary: truncate(app.summary().unwrap_or_default(), 50),
        }
    }
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    name: String,
    #[tabled(rename = "Apps")]
    size: usize,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn render<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string()
}

/// Run a query off the async runtime, cancelling it on Ctrl-C
async fn run_query<T, F>(ctx: QueryContext, query: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&QueryContext) -> appsilo_core::Result<T> + Send + 'static,
{
    let token = ctx.cancellation().clone();
    let mut task = tokio::task::spawn_blocking(move || query(&ctx));

    tokio::select! {
        joined = &mut task => Ok(joined.context("Query task failed")??),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, cancelling query");
            token.cancel();
            Ok(task.await.context("Query task failed")??)
        }
    }
}

fn print_apps(list: &AppList, json: bool, empty: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(list)?);
    } else if list.is_empty() {
        println!("{empty}");
    } else {
        let rows: Vec<AppRow> = list.iter().map(AppRow::from).collect();
        println!("{}", render(&rows));
        println!("{} application(s)", list.len());
    }
    Ok(())
}

fn print_categories(categories: &[CategoryEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(categories)?);
    } else if categories.is_empty() {
        println!("No categories found.");
    } else {
        let rows: Vec<CategoryRow> = categories
            .iter()
            .map(|c| CategoryRow {
                name: c.name.clone(),
                size: c.size,
            })
            .collect();
        println!("{}", render(&rows));
    }
    Ok(())
}

fn print_app(app: &App, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(app)?);
        return Ok(());
    }

    let joined = |items: Vec<&str>| items.join(", ");
    let mut rows = vec![
        FieldRow {
            field: "ID",
            value: app.id().to_string(),
        },
        FieldRow {
            field: "Kind",
            value: app.kind().to_string(),
        },
    ];
    let optional = [
        ("Name", app.name()),
        ("Summary", app.summary()),
        ("Version", app.version()),
        ("License", app.license()),
        ("Developer", app.developer_name()),
        ("Origin", app.origin()),
        ("Homepage", app.url("homepage")),
    ];
    rows.extend(optional.into_iter().filter_map(|(field, value)| {
        value.map(|v| FieldRow {
            field,
            value: truncate(v, 70),
        })
    }));
    let lists = [
        ("Categories", joined(app.categories().iter().map(String::as_str).collect())),
        ("Keywords", joined(app.keywords().iter().map(String::as_str).collect())),
        ("Provides", joined(app.provides().iter().map(|p| p.value.as_str()).collect())),
        ("Packages", joined(app.pkgnames().iter().map(String::as_str).collect())),
    ];
    rows.extend(
        lists
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(field, value)| FieldRow {
                field,
                value: truncate(&value, 70),
            }),
    );
    if let Some(release) = app.newest_release() {
        rows.push(FieldRow {
            field: "Latest release",
            value: format!("{} ({})", release.version, release.timestamp),
        });
    }
    rows.push(FieldRow {
        field: "Refined",
        value: app.refined().to_string(),
    });

    println!("{}", render(&rows));
    Ok(())
}

pub async fn execute(
    command: QueryCommand,
    catalog: Arc<Catalog>,
    config: &CatalogConfig,
    json: bool,
) -> Result<()> {
    let ctx = config.to_query_context();
    debug!(locales = ?ctx.locales().tags(), "Running query");

    match command {
        QueryCommand::Search { terms } => {
            let list = run_query(ctx, move |ctx| catalog.search(ctx, &terms)).await?;
            print_apps(&list, json, "No applications found.")
        }
        QueryCommand::Categories => {
            let categories = run_query(ctx, move |ctx| catalog.categories(ctx)).await?;
            print_categories(&categories, json)
        }
        QueryCommand::Category { name } => {
            let list = run_query(ctx, move |ctx| catalog.category_apps(ctx, &name)).await?;
            print_apps(&list, json, "No applications in this category.")
        }
        QueryCommand::Popular => {
            let list = run_query(ctx, move |ctx| catalog.popular(ctx)).await?;
            print_apps(&list, json, "No popular applications.")
        }
        QueryCommand::Featured => {
            let list = run_query(ctx, move |ctx| catalog.featured(ctx)).await?;
            print_apps(&list, json, "No featured applications.")
        }
        QueryCommand::Recent { age } => {
            let age = age.map(Duration::from_secs).unwrap_or(config.recent_age());
            let list = run_query(ctx, move |ctx| catalog.recent(ctx, age)).await?;
            print_apps(&list, json, "No recently updated applications.")
        }
        QueryCommand::Alternates { id } => {
            let lookup_id = id.clone();
            let list = run_query(ctx, move |ctx| {
                match catalog.lookup(ctx, &lookup_id)? {
                    Some(app) => catalog.alternates(ctx, &app).map(Some),
                    None => Ok(None),
                }
            })
            .await?;
            match list {
                Some(list) => print_apps(&list, json, "No alternates found."),
                None => bail!("Application '{id}' not found in catalog"),
            }
        }
        QueryCommand::Show { id, all } => {
            let ctx = if all {
                ctx.with_refine(RefineFlags::ALL)
            } else {
                ctx
            };
            let lookup_id = id.clone();
            let app = run_query(ctx, move |ctx| catalog.lookup(ctx, &lookup_id)).await?;
            let app = app.with_context(|| format!("Application '{id}' not found in catalog"))?;
            print_app(&app, json)
        }
    }
}
