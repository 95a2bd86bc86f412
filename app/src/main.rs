use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use clap::{ArgAction, Parser};
use env_logger::Builder;
use log::LevelFilter;

mod config;
mod driver;
mod error;
#[cfg(test)]
mod fixtures;
mod pretreatment;

use config::{Config, OnError};
use error::Error;

#[derive(Parser, Debug)]
#[command(
    name = "fpc-pretreat",
    about = "Pretreats LiDAR tiles: validation, survey date filtering and height normalization",
    version = "0.0.1"
)]
struct Cli {
    /// YAML configuration file; command line options take precedence
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Process a single file of the input directory
    #[arg(long, value_name = "FILE")]
    input_filename: Option<String>,

    /// Spatial reference assigned to the tiles, e.g. EPSG:2154. Written to the
    /// output as GeoTIFF keys only for EPSG codes on point formats 0 to 5;
    /// otherwise the source CRS records are kept
    #[arg(long, value_name = "SRS")]
    spatial_reference: Option<String>,

    /// Stop at the first failing tile
    #[arg(long)]
    fail_fast: bool,

    #[arg(long, value_name = "DAYS")]
    deviation_day: Option<f64>,

    #[arg(long, value_name = "DATETIME")]
    gpstime_ref: Option<String>,

    #[arg(long, value_name = "NAME")]
    filter_dimension: Option<String>,

    #[arg(long, value_name = "VALUES", value_delimiter = ',')]
    keep_values: Option<Vec<i64>>,

    /// Skip height normalization
    #[arg(long)]
    no_normalize: bool,

    #[arg(long, value_name = "METERS")]
    height_filter: Option<f64>,

    #[arg(long)]
    no_extrapolation: bool,

    #[arg(long)]
    minor_version: Option<u8>,

    /// -v for debug, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        let io = &mut config.io;
        if let Some(dir) = &self.input_dir {
            io.input_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.output_dir {
            io.output_dir = Some(dir.clone());
        }
        if let Some(name) = &self.input_filename {
            io.input_filename = Some(name.clone());
        }
        if let Some(srs) = &self.spatial_reference {
            io.spatial_reference = Some(srs.clone());
        }
        if self.fail_fast {
            io.on_error = OnError::Abort;
        }

        let pretreatment = &mut config.pretreatment;
        if let Some(days) = self.deviation_day {
            pretreatment.filter_deviation.deviation_day = Some(days);
        }
        if let Some(gpstime_ref) = &self.gpstime_ref {
            pretreatment.filter_deviation.gpstime_ref = gpstime_ref.clone();
        }
        if let Some(dimension) = &self.filter_dimension {
            pretreatment.filter.dimension = Some(dimension.clone());
        }
        if let Some(values) = &self.keep_values {
            pretreatment.filter.keep_values = values.clone();
        }
        if self.no_normalize {
            pretreatment.normalize_height.enabled = false;
        }
        if let Some(height) = self.height_filter {
            pretreatment.normalize_height.height_filter = height;
        }
        if self.no_extrapolation {
            pretreatment.normalize_height.allow_extrapolation = false;
        }
        if let Some(minor) = self.minor_version {
            pretreatment.normalize_height.minor_version = minor;
        }
    }
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(args: &Cli) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => Config::from_yaml(path)?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    let config = config.validate()?;

    log::info!("input folder: {}", config.input_dir.display());
    log::info!("output folder: {}", config.output_dir.display());
    log::info!("deviation_day: {:?}", config.deviation_day);
    log::info!("gpstime_ref: {}", config.gpstime_ref);
    log::info!(
        "LAZ support: {}",
        if pcd_parser::capabilities().laz {
            "available"
        } else {
            "unavailable"
        }
    );

    let start = std::time::Instant::now();
    let summary = driver::run(&config)?;
    log::info!("Elapsed: {:?}", start.elapsed());

    summary.into_result()
}

fn main() {
    let args = Cli::parse();

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level_filter(args.verbose))
        .init();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
