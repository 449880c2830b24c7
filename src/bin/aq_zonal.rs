use anyhow::{Context, Result};
use aq_zonal_rust::io::{self, IdColumn, MapPlotter, TimeSeriesPlotter};
use aq_zonal_rust::{
    AggregateRecord, HexagonTessellator, HotspotDetector, Region, RunConfig, TemporalAggregator, ZonalAggregator,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

#[derive(Parser, Debug)]
#[command(name = "aq-zonal", version, about = "Zonal and temporal aggregation of air-quality observations")]
struct Args {
    /// Path to TOML run configuration
    #[arg(short, long, global = true, default_value = "config/run.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mean per administrative region over the configured window
    Zonal,
    /// Mean per H3 cell covering the configured boundary
    Hexgrid {
        /// Override [hexgrid] resolution
        #[arg(long)]
        resolution: Option<u8>,
    },
    /// Daily means inside a buffer around the configured location
    Temporal {
        /// Override [temporal] radius_meters
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Rank a previously exported aggregate and find peaks in a daily series
    Hotspots {
        /// Aggregate CSV or shapefile written by zonal, hexgrid or temporal
        input: PathBuf,

        /// Override [output] top_n
        #[arg(long)]
        top: Option<usize>,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = RunConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load run config {}", args.config.display()))?;
    info!(config = %args.config.display(), label = %config.label, pollutant = %config.pollutant, "aq-zonal starting");

    match args.command {
        Command::Zonal => run_zonal(&config),
        Command::Hexgrid { resolution } => run_hexgrid(&config, resolution.unwrap_or(config.hexgrid.resolution)),
        Command::Temporal { radius } => run_temporal(&config, radius),
        Command::Hotspots { input, top } => run_hotspots(&config, &input, top.unwrap_or(config.output.top_n)),
    }
}

fn run_zonal(config: &RunConfig) -> Result<()> {
    let window = config.time_window().context("Invalid [window]")?;
    let observations = io::load_observations(&config.input.observations)
        .with_context(|| format!("Failed to read observations {}", config.input.observations.display()))?;
    let regions_path = config
        .input
        .regions
        .as_ref()
        .context("[input] regions is required for zonal aggregation")?;
    let regions: Vec<Region> = io::load_regions(regions_path, &config.input.id_field, config.input.crs)
        .with_context(|| format!("Failed to read regions {}", regions_path.display()))?
        .into_iter()
        .map(Region::from)
        .collect();

    let records = ZonalAggregator::new(config.empty_region_policy()).aggregate(&regions, &observations, &window)?;
    let stem = io::spatial_stem(&config.label, &config.pollutant, &window);
    write_outputs(config, &stem, &records)?;
    print_summary("zonal", &records, config.output.top_n);
    Ok(())
}

fn run_hexgrid(config: &RunConfig, resolution: u8) -> Result<()> {
    let window = config.time_window().context("Invalid [window]")?;
    let observations = io::load_observations(&config.input.observations)
        .with_context(|| format!("Failed to read observations {}", config.input.observations.display()))?;
    let boundary_path = config
        .input
        .boundary
        .as_ref()
        .context("[input] boundary is required for hexgrid aggregation")?;
    let boundary = io::load_boundary(boundary_path, config.input.crs)
        .with_context(|| format!("Failed to read boundary {}", boundary_path.display()))?;

    let cells = HexagonTessellator::new(config.tessellation()).tessellate(&boundary, resolution)?;
    let regions: Vec<Region> = cells.into_iter().map(Region::from).collect();
    let records = ZonalAggregator::new(config.hexgrid.empty_cells).aggregate(&regions, &observations, &window)?;

    let stem = io::hexagon_stem(&config.label, &config.pollutant, &window);
    write_outputs(config, &stem, &records)?;
    print_summary("hexgrid", &records, config.output.top_n);
    Ok(())
}

fn run_temporal(config: &RunConfig, radius: Option<f64>) -> Result<()> {
    let (center, temporal) = config.temporal_center().context("Invalid [temporal]")?;
    let observations = io::load_observations(&config.input.observations)
        .with_context(|| format!("Failed to read observations {}", config.input.observations.display()))?;

    let aggregator = match temporal.metric_crs {
        Some(crs) => TemporalAggregator::with_metric_crs(crs),
        None => TemporalAggregator::new(),
    };
    let records = aggregator.aggregate(center, radius.unwrap_or(temporal.radius_meters), &observations)?;

    let stem = io::temporal_stem(&config.label, &config.pollutant);
    io::export_aggregate(&config.output.dir, &stem, &records)?;
    if config.map.enabled && !records.is_empty() {
        let path = config.output.dir.join(format!("{}_timeseries.png", stem));
        TimeSeriesPlotter::default().save(&records, &path)?;
    }
    print_summary("temporal", &records, config.output.top_n);
    Ok(())
}

fn run_hotspots(config: &RunConfig, input: &Path, top: usize) -> Result<()> {
    let records = io::load_aggregate(input)
        .with_context(|| format!("Failed to read aggregate {}", input.display()))?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("aggregate")
        .to_string();
    std::fs::create_dir_all(&config.output.dir)?;

    let ranked = HotspotDetector::top_n(&records, top);
    let ranked_path = config.output.dir.join(format!("{}_ranked.csv", stem));
    io::write_ranked_csv(BufWriter::new(File::create(&ranked_path)?), &ranked)?;
    info!(path = %ranked_path.display(), count = ranked.len(), "wrote ranking");

    println!("{}", format!("Top {} of {}", ranked.len(), records.len()).bold());
    for (i, record) in ranked.iter().enumerate() {
        println!("  {:>3}. {:<20} {}", i + 1, record.key.to_string(), format_mean(record.mean_value).yellow());
    }

    // peaks only make sense along an ordered series
    if IdColumn::for_records(&records) == IdColumn::Date {
        let peaks = HotspotDetector::find_record_peaks(&records)
            .context("Peak detection needs a mean on every date of the series")?;
        let peaks_path = config.output.dir.join(format!("{}_peaks.csv", stem));
        io::write_peaks_csv(BufWriter::new(File::create(&peaks_path)?), &peaks, &records)?;
        info!(path = %peaks_path.display(), count = peaks.len(), "wrote peaks");

        println!("{}", format!("{} peak(s)", peaks.len()).bold());
        for peak in &peaks {
            let date = records[peak.index].key.to_string();
            println!("  {} {}", date, format_mean(Some(peak.value)).red());
        }
    }
    Ok(())
}

/// CSV, GeoJSON and shapefile, plus the map when enabled
fn write_outputs(config: &RunConfig, stem: &str, records: &[AggregateRecord]) -> Result<()> {
    let paths = io::export_aggregate(&config.output.dir, stem, records)
        .with_context(|| format!("Failed to export {} into {}", stem, config.output.dir.display()))?;
    println!("{} {}", "wrote".green(), paths.csv.display());
    println!("{} {}", "wrote".green(), paths.geojson.display());
    if let Some(shapefile) = &paths.shapefile {
        println!("{} {}", "wrote".green(), shapefile.display());
    }

    if config.map.enabled && records.iter().any(|r| r.geometry.is_some()) {
        let plotter = MapPlotter::new(config.map.vmin, config.map.vmax, config.map.width)?;
        let path = config.output.dir.join(format!("{}.png", stem));
        plotter.save(records, config.input.crs, &path)?;
        println!("{} {}", "wrote".green(), path.display());
    }
    Ok(())
}

fn format_mean(mean: Option<f64>) -> String {
    mean.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn print_summary(step: &str, records: &[AggregateRecord], top: usize) {
    let with_data = records.iter().filter(|r| !r.is_empty()).count();
    let samples: usize = records.iter().map(|r| r.sample_count).sum();
    println!(
        "{} {} records ({} with data, {} samples)",
        step.cyan().bold(),
        records.len(),
        with_data,
        samples
    );
    for record in HotspotDetector::top_n(records, top) {
        println!(
            "  {:<20} {:>10} {:>6}",
            record.key.to_string(),
            format_mean(record.mean_value),
            record.sample_count
        );
    }
}
