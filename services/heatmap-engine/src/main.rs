//! Heatmap tile engine CLI.
//!
//! Renders single tiles from NDJSON event files and reports what the
//! configuration defines.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use heatmap_engine::{parse_timestamp, Engine, EngineConfig, RawTileParams};
use renderer::RenderedTile;
use serde_json::json;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "heatmap-engine")]
#[command(about = "Spatio-temporal heatmap tile renderer")]
struct Args {
    /// Engine configuration (YAML)
    #[arg(short, long, env = "HEATMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one tile to raw RGBA8 bytes
    Render {
        /// Heatmap name; created on the fly when not configured
        #[arg(long)]
        heatmap: String,

        #[arg(short, long)]
        z: i64,

        #[arg(short, long)]
        x: i64,

        #[arg(short, long)]
        y: i64,

        /// Epoch ms or RFC 3339; defaults to now
        #[arg(short, long)]
        timestamp: Option<String>,

        /// Bucket width in ms
        #[arg(long, default_value_t = 0)]
        bucket_span: i64,

        #[arg(long, default_value_t = 1)]
        bucket_count: i64,

        #[arg(long)]
        time_decay: Option<f64>,

        #[arg(long)]
        scale: Option<f64>,

        #[arg(long)]
        radiator: Option<String>,

        /// Palette name or #RRGGBB seed
        #[arg(long)]
        palette: Option<String>,

        #[arg(long)]
        opacity: Option<f64>,

        /// NDJSON event files
        #[arg(short, long, required = true)]
        events: Vec<PathBuf>,

        /// Output file for the raw RGBA8 pixels
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print configured heatmaps, radiators and palettes as JSON
    Inspect,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = Engine::from_config(config)?;

    match args.command {
        Command::Render {
            heatmap,
            z,
            x,
            y,
            timestamp,
            bucket_span,
            bucket_count,
            time_decay,
            scale,
            radiator,
            palette,
            opacity,
            events,
            output,
        } => {
            if engine.heatmaps().get_heat_map(&heatmap).is_none() {
                engine.add_heat_map(&heatmap, None, None)?;
            }

            let mut ingested = 0;
            for path in &events {
                let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
                let report = engine
                    .ingest_ndjson(&heatmap, BufReader::new(file))
                    .with_context(|| format!("ingesting {}", path.display()))?;
                ingested += report.events;
            }

            let params = RawTileParams {
                x,
                y,
                z,
                timestamp: timestamp.as_deref().map(parse_timestamp).transpose()?.unwrap_or(0),
                bucket_span,
                bucket_count,
                time_decay,
                scale,
                radiator,
                palette,
                opacity,
            };

            let summary = match engine.get_tile(&heatmap, &params)? {
                RenderedTile::Raster(raster) => {
                    std::fs::write(&output, raster.pixels())
                        .with_context(|| format!("writing {}", output.display()))?;
                    info!(output = %output.display(), "Wrote tile");
                    json!({
                        "heatmap": heatmap,
                        "tile": format!("{}/{}/{}", z, x, y),
                        "outcome": "raster",
                        "width": raster.width(),
                        "height": raster.height(),
                        "events": raster.events(),
                        "peak": raster.peak(),
                        "ingested": ingested,
                        "output": output.display().to_string(),
                    })
                }
                RenderedTile::NoData => json!({
                    "heatmap": heatmap,
                    "tile": format!("{}/{}/{}", z, x, y),
                    "outcome": "no_data",
                    "ingested": ingested,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Inspect => {
            println!("{}", serde_json::to_string_pretty(&engine.summary())?);
        }
    }

    if args.metrics {
        eprintln!("{}", prometheus_handle.render());
    }

    Ok(())
}
