//! floodrisk CLI - flood exposure batch runner

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floodrisk_core::io::read_geotiff;
use floodrisk_core::{AttributeValue, Raster};
use floodrisk_pipeline::{
    resume_state, ArtifactKey, ArtifactStore, BatchReport, CountryRecord, CountryRegistry, FsStore,
    JobKey, JobOutcome, JobState, PipelineConfig, RegionJobRunner,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "floodrisk")]
#[command(author, version, about = "Population and wealth exposed to coastal flooding", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage for the selected countries
    Run {
        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Only process these ISO3 codes
        #[arg(long = "country")]
        countries: Vec<String>,
    },
    /// Write cleaned national outlines and regions only
    Boundaries {
        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Only process these ISO3 codes
        #[arg(long = "country")]
        countries: Vec<String>,
    },
    /// Report how far each region job has progressed
    Status {
        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Only report these ISO3 codes
        #[arg(long = "country")]
        countries: Vec<String>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {}", e))
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn progress(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn load(config: &Path) -> Result<(PipelineConfig, CountryRegistry)> {
    let config = PipelineConfig::from_file(config)
        .with_context(|| format!("Failed to load config {}", config.display()))?;
    let registry = CountryRegistry::from_path(&config.countries_csv)
        .with_context(|| format!("Failed to read {}", config.countries_csv.display()))?;
    Ok((config, registry))
}

/// Countries to process: the requested ones, or every selected one
fn select<'r>(
    config: &PipelineConfig,
    registry: &'r CountryRegistry,
    requested: &[String],
) -> Result<Vec<&'r CountryRecord>> {
    if requested.is_empty() {
        return Ok(registry.selected(&config.skip_income_groups).collect());
    }
    requested
        .iter()
        .map(|iso3| {
            registry
                .get(&iso3.to_uppercase())
                .with_context(|| format!("{} is not in the country registry", iso3))
        })
        .collect()
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved under: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_summary(report: &BatchReport, scenarios: usize) {
    let expected: usize = report.countries.iter().map(|c| c.regions * scenarios).sum();
    println!("Countries: {}", report.countries.len());
    println!("  Rows written: {} of {} region jobs", report.completed(), expected);
    println!("  Skipped: {}", report.skipped());
    println!("  Failed: {}", report.failed());

    for country in &report.countries {
        if let Some(reason) = &country.skipped {
            println!("  {} skipped: {}", country.iso3, reason);
        }
    }
    for job in report.jobs() {
        if let JobOutcome::Failed(error) = &job.outcome {
            println!("  {} failed: {}", job.job, error);
        }
    }
    for (iso3, error) in &report.failed_countries {
        println!("  {} failed: {}", iso3, error);
    }
}

fn region_ids(store: &FsStore, country: &CountryRecord) -> Result<Vec<String>> {
    let regions = store.read_features(&ArtifactKey::Regions {
        iso3: country.iso3.clone(),
    })?;
    let field = country.gid_field();
    Ok(regions
        .iter()
        .filter_map(|f| f.get_property(&field).and_then(AttributeValue::as_str))
        .map(str::to_string)
        .collect())
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run(config_path: &Path, requested: &[String]) -> Result<()> {
    let (config, registry) = load(config_path)?;
    let countries = select(&config, &registry, requested)?;
    let scenarios = config.scenarios.len();
    let root = config.base_path.clone();
    info!(countries = countries.len(), scenarios, "starting batch");

    let start = Instant::now();
    let store = FsStore::from_config(&config);
    let mut runner = RegionJobRunner::new(config, store)?;
    let pb = progress(countries.len())?;

    let report = runner.run_countries(countries, |country| {
        pb.set_message(country.iso3.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    print_summary(&report, scenarios);
    done("Exposure tables", &root, start.elapsed());
    Ok(())
}

fn boundaries(config_path: &Path, requested: &[String]) -> Result<()> {
    let (config, registry) = load(config_path)?;
    let countries = select(&config, &registry, requested)?;
    let root = config.base_path.clone();

    let start = Instant::now();
    let store = FsStore::from_config(&config);
    let mut runner = RegionJobRunner::new(config, store)?;
    let pb = progress(countries.len())?;

    let mut failed = 0usize;
    for country in countries {
        pb.set_message(country.iso3.clone());
        if let Err(e) = runner.prepare_boundaries(country) {
            warn!(iso3 = %country.iso3, error = %e, "boundaries failed");
            failed += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if failed > 0 {
        println!("{} countries failed", failed);
    }
    done("Boundaries", &root, start.elapsed());
    Ok(())
}

fn status(config_path: &Path, requested: &[String]) -> Result<()> {
    let (config, registry) = load(config_path)?;
    let countries = select(&config, &registry, requested)?;
    let store = FsStore::from_config(&config);

    let mut totals: BTreeMap<JobState, usize> = BTreeMap::new();
    for country in countries {
        let regions = match region_ids(&store, country) {
            Ok(ids) => ids,
            Err(e) => {
                println!("{}: {}", country.iso3, e);
                continue;
            }
        };
        let mut finished = 0usize;
        for scenario in &config.scenarios {
            for gid_id in &regions {
                let state = resume_state(&store, &JobKey::new(&country.iso3, gid_id, scenario));
                finished += usize::from(state.is_terminal());
                *totals.entry(state).or_default() += 1;
            }
        }
        println!(
            "{}: {}/{} region jobs finished",
            country.iso3,
            finished,
            regions.len() * config.scenarios.len()
        );
    }

    println!("\nBy state:");
    for (state, count) in totals {
        println!("  {:<20} {}", state, count);
    }
    Ok(())
}

fn raster_info(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...")?;
    let raster: Raster<f64> = read_geotiff(input).context("Failed to read raster")?;
    pb.finish_and_clear();

    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.transform().cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run { config, countries } => run(&config, &countries),
        Commands::Boundaries { config, countries } => boundaries(&config, &countries),
        Commands::Status { config, countries } => status(&config, &countries),
        Commands::Info { input } => raster_info(&input),
    }
}
