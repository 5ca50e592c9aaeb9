use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use polygonize::{Pipeline, PipelineSettings, io::save_mask_preview, load_raster};
use polygonize_cli::BatchConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Polygonize a single classified GeoTIFF into GeoJSON
    Polygonize {
        /// Path to the input GeoTIFF
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the GeoJSON file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Load pipeline settings from a .toml or .json file; cannot be combined with the flags below
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Pixel value treated as foreground
        #[arg(long, default_value = "255", conflicts_with = "settings")]
        mask_value: i64,
        /// Drop polygons smaller than this many pixels
        #[arg(long, default_value = "0", conflicts_with = "settings")]
        min_area: u64,
        /// Simplification tolerance in pixels (0 disables simplification)
        #[arg(long, default_value = "0.0", conflicts_with = "settings")]
        simplify: f64,
        /// Use Douglas-Peucker instead of topology-preserving simplification
        #[arg(long, conflicts_with = "settings")]
        no_preserve_topology: bool,
        /// Keep every n-th row and column (quick preview)
        #[arg(long, default_value = "1", conflicts_with = "settings")]
        decimation: u32,
        /// Polygonize every region, not only the foreground
        #[arg(long, conflicts_with = "settings")]
        all_features: bool,
    },
    /// Run a batch job file
    Run {
        /// Path to the TOML or JSON batch file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write a skeleton batch file for a set of rasters
    Init {
        /// Path of the batch file to write (.toml or .json)
        #[arg(short, long)]
        output: PathBuf,
        /// Directory the batch writes its GeoJSON files to
        #[arg(long, default_value = "vectors")]
        output_dir: String,
        /// Rasters to include
        inputs: Vec<PathBuf>,
    },
    /// Count foreground and nodata pixels
    Count {
        /// Path to the input GeoTIFF
        #[arg(short, long)]
        input: PathBuf,
        /// Pixel value treated as foreground
        #[arg(long, default_value = "255")]
        mask_value: i64,
    },
    /// Save the foreground mask as a PNG
    Preview {
        /// Path to the input GeoTIFF
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the PNG to write
        #[arg(short, long)]
        output: PathBuf,
        /// Pixel value treated as foreground
        #[arg(long, default_value = "255")]
        mask_value: i64,
        /// Keep every n-th row and column
        #[arg(long, default_value = "1")]
        decimation: u32,
    },
    /// Print the JSON schema of batch files
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Polygonize {
            input,
            output,
            settings,
            mask_value,
            min_area,
            simplify,
            no_preserve_topology,
            decimation,
            all_features,
        } => {
            let settings = match settings {
                Some(path) => PipelineSettings::from_file(path)?,
                None => PipelineSettings {
                    mask_value,
                    min_area_pixels: min_area,
                    simplify_tolerance_pixels: simplify,
                    preserve_topology: !no_preserve_topology,
                    decimation,
                    all_features,
                    steps: None,
                },
            };
            polygonize_raster(&input, &output, &settings)?;
        }
        Commands::Run { config } => run_batch(&config)?,
        Commands::Init {
            output,
            output_dir,
            inputs,
        } => {
            let config = BatchConfig::skeleton(output_dir, &inputs);
            config.to_file(&output)?;
            info!("Batch file with {} rasters saved to {:?}", config.rasters.len(), output);
        }
        Commands::Count { input, mask_value } => count(&input, mask_value)?,
        Commands::Preview {
            input,
            output,
            mask_value,
            decimation,
        } => {
            let raster = load_raster(&input, decimation)?;
            save_mask_preview(&raster.foreground_mask(mask_value), &output)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&BatchConfig::schema())?);
        }
    }

    Ok(())
}

fn polygonize_raster(input: &Path, output: &Path, settings: &PipelineSettings) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings)?;
    let summary = pipeline.run(input, output)?;

    if summary.stats.skipped > 0 {
        warn!("{} shapes skipped on processing errors", summary.stats.skipped);
    }
    info!(
        "✅ {} features written to {:?} ({})",
        summary.features_written, output, summary.crs
    );
    Ok(())
}

fn run_batch(config_path: &Path) -> Result<()> {
    let config = BatchConfig::from_file(config_path)?;
    config.validate()?;
    info!("Batch {:?}: {} rasters", config_path, config.rasters.len());

    std::fs::create_dir_all(&config.output_dir)?;

    let mut failed = Vec::new();
    for job in &config.rasters {
        let output = config.output_path(job);
        info!("Processing raster '{}' -> {:?}", job.name, output);

        if let Err(e) = polygonize_raster(Path::new(&job.path), &output, config.settings_for(job)) {
            error!("Raster '{}' failed: {}", job.name, e);
            failed.push(job.name.as_str());
        }
    }

    if !failed.is_empty() {
        return Err(eyre!("{} of {} rasters failed: {}", failed.len(), config.rasters.len(), failed.join(", ")));
    }

    info!("✅ Batch completed!");
    Ok(())
}

fn count(input: &Path, mask_value: i64) -> Result<()> {
    let raster = load_raster(input, 1)?;
    let counts = raster.pixel_counts(mask_value);

    println!("Raster:     {}x{} ({})", raster.width(), raster.height(), raster.crs);
    println!("Total:      {}", counts.total);
    println!("Foreground: {} ({:.2}%)", counts.foreground, counts.foreground_fraction() * 100.0);
    println!("Nodata:     {}", counts.nodata);
    Ok(())
}
