//! Command-line front end: read a saved list, keep what lies inside the
//! drawn polygons, describe it and export it.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use placesift::export::{write_tabular_csv, FeatureCollection};
use placesift::input::read_saved_places;
use placesift::pip::{polygons_from_geojson, DrawnPolygon};
use placesift::{Config, MatchedProvider, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Geocode a saved-places list and keep the places inside drawn polygons")]
struct Args {
    /// Saved list: Takeout CSV, or Saved Places GeoJSON (.json/.geojson)
    #[arg(short, long)]
    input: PathBuf,

    /// GeoJSON Polygon/MultiPolygon, Feature or FeatureCollection
    #[arg(short, long)]
    polygon: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider that must be configured (google, nominatim, arcgis); repeatable
    #[arg(long = "require")]
    require: Vec<MatchedProvider>,

    /// Skip generated descriptions
    #[arg(long)]
    no_enrich: bool,

    /// Write the GeoJSON feature collection here (stdout when no output is given)
    #[arg(long)]
    geojson_out: Option<PathBuf>,

    /// Write name/description/category/WKT rows here
    #[arg(long)]
    csv_out: Option<PathBuf>,
}

fn progress_bar(label: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );
    pb.set_prefix(label);
    Ok(pb)
}

fn read_polygons(path: &Path) -> Result<Vec<DrawnPolygon>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read polygon file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&data).context("Polygon file is not valid JSON")?;
    let polygons = polygons_from_geojson(&value).context("Unusable polygon geometry")?;
    info!("Loaded {} polygons from {}", polygons.len(), path.display());
    Ok(polygons)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if args.no_enrich {
        config.enrichment.enabled = false;
    }

    for warning in config.check(&args.require) {
        if warning.required {
            error!("{}", warning.message);
        } else {
            warn!("{}", warning.message);
        }
    }

    let rows = read_saved_places(&args.input)
        .with_context(|| format!("Failed to read saved places from {}", args.input.display()))?;
    let polygons = read_polygons(&args.polygon)?;

    let pipeline = Pipeline::from_config(&config)?
        .with_progress(progress_bar("geocode")?, progress_bar("describe")?);

    let report = if config.enrichment.enabled {
        pipeline.run(rows, &polygons).await
    } else {
        pipeline.run_without_enrichment(rows, &polygons).await
    };

    let collection = FeatureCollection::from_enriched(&report.enriched);
    match &args.geojson_out {
        Some(path) => {
            fs::write(path, collection.to_json_pretty()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} features to {}", collection.features.len(), path.display());
        }
        None if args.csv_out.is_none() => println!("{}", collection.to_json_pretty()?),
        None => {}
    }

    if let Some(path) = &args.csv_out {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        write_tabular_csv(BufWriter::new(file), &report.enriched)?;
        info!("Wrote {} rows to {}", report.enriched.len(), path.display());
    }

    for place in report.unresolved() {
        eprintln!(
            "unresolved: row {} '{}'",
            place.index + 1,
            place.row.query().unwrap_or("<empty>")
        );
    }
    eprintln!(
        "{} rows, {} kept, {} outside, {} unresolved, {} degenerate polygons",
        report.resolved.len(),
        report.filter.kept.len(),
        report.filter.outside,
        report.filter.skipped_unresolved.len(),
        report.filter.degenerate_polygons
    );

    Ok(())
}
