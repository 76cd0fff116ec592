//! Flood Consequence Calculator
//!
//! Estimates structure and content damage for an asset inventory under a
//! flood scenario.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use flood_consequences::compute::{CategorySource, ConsequenceRun, summarize};
use flood_consequences::config::RunConfig;
use flood_consequences::db::{self, SqliteHazardStore};
use flood_consequences::ingest;
use flood_consequences::sink;
use flood_consequences::{
    Epoch, FrequencyTableProvider, HazardProvider, HazardQuery, HazardRecord, HazardType,
    Interpolation, ReturnPeriod,
};

#[derive(Parser)]
#[command(name = "flood-consequences")]
#[command(about = "Structure and content damage from flood hazard scenarios")]
struct Cli {
    /// Path to the SQLite hazard database
    #[arg(short, long, default_value = "hazards.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct Scenario {
    /// Return period in years (5, 20, 100, 250, 500)
    #[arg(short, long, default_value = "100")]
    return_period: ReturnPeriod,

    /// Epoch: current or future
    #[arg(short, long, default_value = "current")]
    epoch: Epoch,

    /// Hazard type: fluvial or pluvial
    #[arg(short = 't', long, default_value = "fluvial")]
    hazard_type: HazardType,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest hazard tables (CSV) from a directory
    Ingest {
        /// Directory containing hazard CSV files
        source_dir: PathBuf,

        /// Clear existing records before ingestion
        #[arg(long)]
        clear: bool,
    },

    /// Resolve the hazard for one identity
    Hazard {
        identity: String,

        #[command(flatten)]
        scenario: Scenario,

        /// Interpolate missing return periods log-linearly
        #[arg(long)]
        interpolate: bool,
    },

    /// Compute consequences for an asset inventory
    Compute {
        /// YAML run configuration with damage functions
        #[arg(short, long)]
        config: PathBuf,

        /// Inventory CSV
        #[arg(short, long)]
        inventory: PathBuf,

        #[command(flatten)]
        scenario: Scenario,

        /// Category points CSV (x, y, code) for assets without an occupancy
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Snapping distance for category points
        #[arg(long, default_value_t = 1.0)]
        category_tolerance: f64,

        /// Write results as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (overrides the config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Print every row, not just the summary
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all identities in the database
    ListIdentities,

    /// Initialize empty database with schema
    Init,

    /// Load sample hazard records for testing
    LoadSample,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Ingest { source_dir, clear } => {
            if clear {
                println!("Clearing existing records...");
                db::clear_hazard_records(&conn)?;
            }

            let stats = ingest::ingest_to_database(&conn, &source_dir)?;
            println!("{}", stats);
        }

        Commands::Hazard {
            identity,
            scenario,
            interpolate,
        } => {
            let interpolation = if interpolate {
                Interpolation::LogLinear
            } else {
                Interpolation::Strict
            };
            let provider = FrequencyTableProvider::new(SqliteHazardStore::from_connection(conn))
                .with_interpolation(interpolation);
            let query = HazardQuery::new(
                identity,
                scenario.return_period,
                scenario.epoch,
                scenario.hazard_type,
            );
            match provider.resolve(&query) {
                Ok(event) => println!("{}: {}", query.identity, event),
                Err(e) if e.is_missing() => println!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Compute {
            config,
            inventory,
            scenario,
            categories,
            category_tolerance,
            output,
            workers,
            verbose,
        } => {
            let config = RunConfig::load(&config)?;
            let assets = ingest::read_inventory_csv(&inventory)?;
            let provider = FrequencyTableProvider::new(SqliteHazardStore::from_connection(conn))
                .with_interpolation(config.interpolation);

            let mut run = ConsequenceRun::new(
                provider,
                config.occupancies()?,
                scenario.return_period,
                scenario.epoch,
                scenario.hazard_type,
            );
            if let Some(path) = categories {
                let lookup = ingest::read_category_points_csv(&path, category_tolerance)?;
                run = run.with_categories(CategorySource {
                    lookup: Box::new(lookup),
                    table: config.category_table(),
                });
            }

            let workers = workers.or(config.workers).unwrap_or(1);
            let table = run.run_parallel(&assets, workers)?;

            if verbose {
                println!("{}", sink::format_table(&table));
            }
            println!("{}", summarize(&table));

            if let Some(path) = output {
                sink::write_json(&table, &path)?;
                println!("Results written to {}", path.display());
            }
        }

        Commands::ListIdentities => {
            let identities = db::list_identities(&conn)?;
            if identities.is_empty() {
                println!("No hazard records in database. Run 'ingest' or 'load-sample' first.");
            } else {
                println!("{} identities ({} magnitudes):", identities.len(), db::count_records(&conn)?);
                for identity in identities {
                    println!("  {}", identity);
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Load illustrative hazard records without any source tables
fn load_sample_data(conn: &Connection) -> Result<()> {
    use Epoch::{Current, Future};
    use HazardType::{Fluvial, Pluvial};
    use ReturnPeriod::{FiveHundred, Hundred, Twenty};

    db::clear_hazard_records(conn)?;

    let records = [
        HazardRecord::new("riverside-001")
            .with(Current, Fluvial, Twenty, 0.6)
            .with(Current, Fluvial, Hundred, 1.8)
            .with(Current, Fluvial, FiveHundred, 2.9)
            .with(Future, Fluvial, Hundred, 2.3)
            .with(Future, Fluvial, FiveHundred, 3.4),
        HazardRecord::new("riverside-002")
            .with(Current, Fluvial, Hundred, 0.9)
            .with(Future, Fluvial, Hundred, 1.2),
        HazardRecord::new("uptown-014")
            .with(Current, Pluvial, Twenty, 0.1)
            .with(Current, Pluvial, Hundred, 0.35)
            .with(Future, Pluvial, Hundred, 0.5),
    ];
    for record in &records {
        db::upsert_hazard_record(conn, record)?;
    }

    println!("Loaded {} sample identities", records.len());
    Ok(())
}
