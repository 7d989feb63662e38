//! CLI for the pit-factors point-in-time factor manager.
//!
//! Lists and describes the registered factors and serves factor queries
//! through a cached engine configured from a TOML file.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pit_factors::{EngineConfig, FactorCategory, FactorInfo, FactorRegistry, FillNa, Universe};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pit-factors")]
#[command(about = "Point-in-time factor panels with a growing cache", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file; defaults apply when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List all available factors
    List,
    /// Show information about a specific factor
    Info {
        /// Factor name
        factor: String,
    },
    /// Query a factor over a date range and print it
    Query {
        /// Factor name
        factor: String,
        /// First date, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last date, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        /// Value substituted for missing cells in the printed output
        #[arg(long)]
        fillna: Option<f64>,
        /// Comma-separated codes replacing the configured universe
        #[arg(long, value_delimiter = ',')]
        codes: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> pit_factors::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.log_filter);

    let registry = Arc::new(FactorRegistry::with_defaults()?);
    match cli.command {
        Commands::List => list_factors(&registry),
        Commands::Info { factor } => show_factor_info(&registry, &factor),
        Commands::Query {
            factor,
            start,
            end,
            fillna,
            codes,
        } => {
            let mut engine = config.build_engine(registry)?;
            let fill = fillna.map(FillNa::Value);
            let panel = if codes.is_empty() {
                engine.query(&factor, start, end, fill.as_ref())?
            } else {
                engine.query_in(&factor, start, end, &Universe::new(codes), fill.as_ref())?
            };
            println!("{}", panel.to_frame(&factor)?);
            engine.close()?;
        }
    }
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Group factor metadata by category, names sorted within each group.
fn group_by_category(infos: Vec<FactorInfo>) -> BTreeMap<FactorCategory, Vec<FactorInfo>> {
    let mut grouped: BTreeMap<FactorCategory, Vec<FactorInfo>> = BTreeMap::new();
    for info in infos {
        grouped.entry(info.category).or_default().push(info);
    }
    for factors in grouped.values_mut() {
        factors.sort_by(|a, b| a.name.cmp(&b.name));
    }
    grouped
}

/// List all available factors grouped by category.
fn list_factors(registry: &FactorRegistry) {
    println!("Available Factors ({} total)\n", registry.len());
    for (category, factors) in group_by_category(registry.all_info()) {
        println!("{category}:");
        for info in factors {
            println!("  {} - {}", info.name, info.description);
        }
        println!();
    }
}

/// Show detailed information about a specific factor.
fn show_factor_info(registry: &FactorRegistry, factor_name: &str) {
    let Some(descriptor) = registry.get(factor_name) else {
        eprintln!("Error: Factor '{factor_name}' not found");
        eprintln!("\nAvailable factors:");
        for name in registry.names() {
            eprintln!("  {name}");
        }
        return;
    };

    let info = descriptor.info();
    println!("Factor: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    println!("Valid from: {}", info.validity_start);
    if info.dependencies.is_empty() {
        println!("Dependencies: none");
    } else {
        println!("Dependencies:");
        for dependency in &info.dependencies {
            println!("  - {dependency}");
        }
    }
}
