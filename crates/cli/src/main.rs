//! HydroForce CLI - hydrofabric subsetting and NWM forcing extraction

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hydroforce_core::GridSpec;
use hydroforce_network::{
    subset_upstream, trace_upstream, upstream_counts, write_geojson, write_upstream_report,
    GpkgReader, Hydrofabric,
};
use hydroforce_nwm::filenames::Geography;
use hydroforce_nwm::retro::{RetroObjectType, RETRO_BASE_HTTPS};
use hydroforce_nwm::{create_file_list, create_retro_file_list, grid_crs, grid_projection};
use hydroforce_zonal::{aggregate, write_series, WeightMap};

mod config;
use config::{Config, ForcingSource};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hydroforce")]
#[command(author, version, about = "Hydrofabric subsetting and NWM forcing extraction", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace upstream of a catchment and write the hydrofabric subset
    Subset {
        /// JSON run configuration
        config: PathBuf,
        /// Also write the per-catchment upstream count report
        #[arg(long)]
        report: bool,
    },
    /// Build the catchment weight map for the forcing grid
    Weights {
        /// JSON run configuration
        config: PathBuf,
        /// Rebuild even if the weight file already exists
        #[arg(long)]
        force: bool,
    },
    /// Extract per-catchment forcing series (builds weights if needed)
    Forcing {
        /// JSON run configuration
        config: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: &Path, verbose_flag: bool) -> Result<Config> {
    let config = Config::from_file(path).context("Failed to load configuration")?;
    setup_logging(verbose_flag || config.run.verbose);
    Ok(config)
}

fn read_hydrofabric(config: &Config) -> Result<Hydrofabric> {
    let pb = spinner("Reading hydrofabric...");
    let reader = GpkgReader::open(&config.hydrofab.geopkg)
        .context("Failed to open hydrofabric geopackage")?;
    let fabric = reader
        .read_hydrofabric()
        .context("Failed to read divide/nexus layers")?;
    pb.finish_and_clear();
    info!(
        divides = fabric.divides().len(),
        nexuses = fabric.nexuses().len(),
        "hydrofabric loaded"
    );
    Ok(fabric)
}

/// Geography selection, defaulting to CONUS when the config leaves it out
/// (local file lists usually do).
fn geography(config: &Config) -> Result<Geography> {
    match config.forcing.geoinput {
        Some(code) => Ok(Geography::from_code(code)?),
        None => Ok(Geography::Conus),
    }
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Resolve the forcing file list to local paths.
///
/// Operational and retrospective sources generate archive object names and
/// map each to `local_dir/<basename>`; downloading is outside this tool.
fn resolve_file_list(config: &Config) -> Result<Vec<PathBuf>> {
    match config.forcing.source {
        ForcingSource::Local => Ok(config.forcing.file_list.clone().unwrap_or_default()),
        ForcingSource::Operational => {
            let request = config.file_request()?;
            let names = create_file_list(&request)?;
            let dir = config.forcing.local_dir.clone().unwrap_or_default();
            Ok(names.iter().map(|n| dir.join(basename(n))).collect())
        }
        ForcingSource::Retrospective => {
            let (start, end) = config.retro_range()?;
            let names = create_retro_file_list(
                start,
                end,
                RETRO_BASE_HTTPS,
                &[RetroObjectType::Forcing],
                &[],
            )?;
            let dir = config.forcing.local_dir.clone().unwrap_or_default();
            Ok(names.iter().map(|n| dir.join(basename(n))).collect())
        }
    }
}

/// Grid template file: explicit config entry, else the first resolved file.
fn template_path(config: &Config, files: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = &config.forcing.template_file {
        return Ok(path.clone());
    }
    files
        .first()
        .cloned()
        .context("No forcing files resolved; cannot determine the grid template")
}

/// Load the cached weight map, or rasterize a fresh one from the template
/// grid and the hydrofabric divides.
fn load_or_build_weights(config: &Config, files: &[PathBuf], force: bool) -> Result<WeightMap> {
    let path = &config.storage.weights_file;
    if path.is_file() && !force {
        info!(file = %path.display(), "reusing existing weight map");
        return Ok(WeightMap::load(path)?);
    }

    let geography = geography(config)?;
    let template = template_path(config, files)?;
    let (rows, cols, transform) = hydroforce_nwm::read_grid_template(&template)
        .context("Failed to read the grid template file")?;
    let grid = GridSpec::new(rows, cols, transform, grid_crs(geography))?;
    info!(rows, cols, "grid template read");

    let fabric = read_hydrofabric(config)?;
    let polygons: Vec<(String, geo_types::MultiPolygon<f64>)> = fabric
        .divides()
        .iter()
        .map(|d| (d.id.clone(), d.geometry.clone()))
        .collect();

    let pb = spinner(&format!("Rasterizing {} catchments...", polygons.len()));
    let weights = WeightMap::build(
        &polygons,
        fabric.crs(),
        &grid,
        Some(&grid_projection(geography)),
    )?;
    pb.finish_and_clear();

    let empty = weights.empty_catchments();
    if !empty.is_empty() {
        warn!(count = empty.len(), "catchments rasterized to zero cells");
    }

    weights.save(path)?;
    info!(file = %path.display(), catchments = weights.len(), "weight map written");
    Ok(weights)
}

// ─── Subcommands ────────────────────────────────────────────────────────

fn run_subset(config_path: &Path, report: bool, verbose: bool) -> Result<()> {
    let config = load_config(config_path, verbose)?;
    let Some(catchment_id) = config.hydrofab.catchment_id.clone() else {
        bail!("subset requires hydrofab.catchment_id in the configuration");
    };

    let t_read = Instant::now();
    let fabric = read_hydrofabric(&config)?;
    let read_elapsed = t_read.elapsed();

    let t_trace = Instant::now();
    let upstream = trace_upstream(&fabric, &catchment_id)
        .with_context(|| format!("Failed to trace upstream of '{}'", catchment_id))?;
    info!(
        catchments = upstream.catchments.len(),
        nexuses = upstream.nexuses.len(),
        "upstream closure traced"
    );

    let subset = subset_upstream(&fabric, &upstream);
    let out_dir = config
        .storage
        .output_dir
        .join(format!("{}_upstream_subset", catchment_id));
    let (divides_path, nexus_path) = write_geojson(&subset, &out_dir)?;
    let trace_elapsed = t_trace.elapsed();

    let mut report_elapsed = None;
    if report {
        let t_report = Instant::now();
        let counts = upstream_counts(&fabric);
        let report_path = config.storage.output_dir.join("upstream_counts.txt");
        write_upstream_report(&counts, &report_path)?;
        println!("Upstream count report: {}", report_path.display());
        report_elapsed = Some(t_report.elapsed());
    }

    println!(
        "Subset of {} catchments / {} nexuses upstream of {}:",
        subset.divides.len(),
        subset.nexuses.len(),
        catchment_id
    );
    println!("  {}", divides_path.display());
    println!("  {}", nexus_path.display());
    println!("Timings:");
    println!("  read hydrofabric: {:.2?}", read_elapsed);
    println!("  trace + subset: {:.2?}", trace_elapsed);
    if let Some(elapsed) = report_elapsed {
        println!("  upstream report: {:.2?}", elapsed);
    }
    Ok(())
}

fn run_weights(config_path: &Path, force: bool, verbose: bool) -> Result<()> {
    let config = load_config(config_path, verbose)?;
    let started = Instant::now();
    let files = resolve_file_list(&config)?;
    let weights = load_or_build_weights(&config, &files, force)?;
    println!(
        "Weight map for {} catchments: {}",
        weights.len(),
        config.storage.weights_file.display()
    );
    println!("  Processing time: {:.2?}", started.elapsed());
    Ok(())
}

fn run_forcing(config_path: &Path, verbose: bool) -> Result<()> {
    let config = load_config(config_path, verbose)?;
    let variables = config.variables();
    let format = config.output_format()?;

    let t_list = Instant::now();
    let files = resolve_file_list(&config)?;
    if files.is_empty() {
        bail!("forcing file list resolved to zero files");
    }
    info!(files = files.len(), "forcing file list resolved");
    let list_elapsed = t_list.elapsed();

    let t_weights = Instant::now();
    let weights = load_or_build_weights(&config, &files, false)?;
    let weights_elapsed = t_weights.elapsed();

    // Validate the template grid against the weight map before the batch
    // starts; silent shape drift would corrupt every mean.
    match hydroforce_nwm::read_grid_template(&template_path(&config, &files)?) {
        Ok((rows, cols, _)) => {
            weights
                .grid()
                .check_shape(rows, cols)
                .context("Forcing grid does not match the weight map's grid")?;
        }
        Err(e) => warn!(error = %e, "could not pre-validate the grid template"),
    }

    let t_extract = Instant::now();
    let pb = spinner(&format!(
        "Extracting {} variables over {} files...",
        variables.len(),
        files.len()
    ));
    let outcome = aggregate(
        &weights,
        &variables,
        &files,
        config.run.threads,
        |path: &Path| hydroforce_nwm::read_forcing(path, &variables),
    )?;
    pb.finish_and_clear();
    let extract_elapsed = t_extract.elapsed();

    let t_write = Instant::now();
    let written = write_series(
        &outcome,
        &config.storage.output_dir,
        &config.hydrofab.vpu,
        format,
    )?;
    let write_elapsed = t_write.elapsed();

    println!(
        "Processed {} of {} files ({} failed); wrote {} catchment series to {}",
        outcome.processed,
        files.len(),
        outcome.failures.len(),
        written.len(),
        config.storage.output_dir.display()
    );
    for failure in &outcome.failures {
        println!("  failed: {} ({})", failure.file.display(), failure.reason);
    }
    println!("Timings:");
    println!("  file list: {:.2?}", list_elapsed);
    println!("  weights: {:.2?}", weights_elapsed);
    println!("  extraction: {:.2?}", extract_elapsed);
    println!("  write: {:.2?}", write_elapsed);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Subset { config, report } => run_subset(&config, report, cli.verbose),
        Commands::Weights { config, force } => run_weights(&config, force, cli.verbose),
        Commands::Forcing { config } => run_forcing(&config, cli.verbose),
    }
}
