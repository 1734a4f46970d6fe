//! appsilo - compile and query application-metadata catalogs

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use appsilo_core::silo::{source, SiloBuilder};
use appsilo_core::{Catalog, CatalogConfig};

mod query_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "appsilo",
    about = "Compile and query application-metadata catalogs",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Compiled silo to query (defaults to silo_path from the config)
    #[clap(long, global = true)]
    silo: Option<PathBuf>,

    /// Override configuration file path
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Preferred locale, most preferred first (repeatable)
    #[clap(long = "locale", global = true)]
    locales: Vec<String>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit structured JSON logs on stderr
    #[clap(long, global = true)]
    trace: bool,

    /// Output results as JSON
    #[clap(long, global = true)]
    json: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Compile YAML catalog sources into a silo
    Compile {
        /// YAML catalog files
        #[clap(required = true)]
        inputs: Vec<PathBuf>,

        /// Output silo path
        #[clap(short, long)]
        output: PathBuf,

        /// Origin label (defaults to the first source's header)
        #[clap(long)]
        origin: Option<String>,

        /// Skip kind-derived keywords, categories and icons
        #[clap(long)]
        no_extra_info: bool,
    },

    #[clap(flatten)]
    Query(query_cli::QueryCommand),
}

/// Initialize tracing with CLI flags
///
/// Logs always go to stderr so JSON results on stdout stay clean.
fn initialize_tracing(log_level: &LogLevel, structured: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if structured {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<CatalogConfig> {
    match path {
        Some(path) => CatalogConfig::load_from_path(path),
        None => CatalogConfig::load(),
    }
}

/// Locales from `LANGUAGE` (colon-separated) then `LANG`
fn environment_locales() -> Vec<String> {
    let mut locales: Vec<String> = std::env::var("LANGUAGE")
        .map(|v| v.split(':').map(str::to_string).collect())
        .unwrap_or_default();
    if let Ok(lang) = std::env::var("LANG") {
        locales.push(lang);
    }
    locales.retain(|l| !l.trim().is_empty());
    locales
}

fn compile(
    inputs: &[PathBuf],
    output: &PathBuf,
    origin: Option<String>,
    no_extra_info: bool,
) -> Result<()> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in inputs {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read catalog source: {}", input.display()))?;
        let source = source::import_yaml(&text)
            .with_context(|| format!("Failed to parse catalog source: {}", input.display()))?;
        debug!(
            "Read {} components from {}",
            source.components.len(),
            input.display()
        );
        sources.push(source);
    }

    let mut builder = SiloBuilder::new();
    if let Some(origin) = origin.or_else(|| sources.iter().find_map(|s| s.origin.clone())) {
        builder = builder.with_origin(origin);
    }
    if no_extra_info {
        builder = builder.without_extra_info();
    }
    for source in sources {
        builder.extend(source.components);
    }

    let count = builder.len();
    let bytes = builder.compile().context("Failed to compile silo")?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write silo: {}", output.display()))?;

    info!("Compiled {count} components into {}", output.display());
    println!(
        "Compiled {count} component(s) into {} ({} bytes)",
        output.display(),
        bytes.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level, cli.trace);

    match cli.command {
        Command::Compile {
            inputs,
            output,
            origin,
            no_extra_info,
        } => compile(&inputs, &output, origin, no_extra_info),

        Command::Query(command) => {
            let mut config = load_config(cli.config.as_ref())?;
            if !cli.locales.is_empty() {
                config.locales = cli.locales;
            } else if config.locales.is_empty() {
                config.locales = environment_locales();
            }

            let silo_path = cli
                .silo
                .or_else(|| config.silo_path.clone())
                .context("No silo given; pass --silo or set silo_path in the config")?;
            let catalog = Catalog::open(&silo_path)
                .with_context(|| format!("Failed to open silo: {}", silo_path.display()))?;

            query_cli::execute(command, Arc::new(catalog), &config, cli.json).await
        }
    }
}
