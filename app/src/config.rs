use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pcd_parser::parsers::las::parse_epsg;
use pcd_transformer::builder::NormalizeHeightParams;
use pcd_transformer::transform::deviation_day::DeviationDayFilter;

use crate::error::Error;
use crate::pretreatment::NormalizeSettings;

/// What the batch does when a tile fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Continue,
    Abort,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Single file inside `input_dir`; every entry of the directory when unset.
    #[serde(default)]
    pub input_filename: Option<String>,
    #[serde(default)]
    pub spatial_reference: Option<String>,
    #[serde(default)]
    pub on_error: OnError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDeviationConfig {
    /// `null` or `.nan` disables the filter.
    #[serde(default)]
    pub deviation_day: Option<f64>,
    #[serde(default = "default_gpstime_ref")]
    pub gpstime_ref: String,
}

fn default_gpstime_ref() -> String {
    // origin of adjusted standard GPS time (GPS epoch + 1e9 s)
    "2011-09-14 01:46:40".to_string()
}

impl Default for FilterDeviationConfig {
    fn default() -> Self {
        Self {
            deviation_day: None,
            gpstime_ref: default_gpstime_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_dimension")]
    pub dimension: Option<String>,
    #[serde(default = "default_keep_values")]
    pub keep_values: Vec<i64>,
}

fn default_filter_dimension() -> Option<String> {
    Some("Classification".to_string())
}

fn default_keep_values() -> Vec<i64> {
    vec![1, 2, 3, 4, 5, 9]
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            dimension: default_filter_dimension(),
            keep_values: default_keep_values(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeHeightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_height_filter")]
    pub height_filter: f64,
    #[serde(default = "default_true")]
    pub allow_extrapolation: bool,
    #[serde(default = "default_minor_version")]
    pub minor_version: u8,
}

fn default_true() -> bool {
    true
}

fn default_height_filter() -> f64 {
    60.0
}

fn default_minor_version() -> u8 {
    4
}

impl Default for NormalizeHeightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            height_filter: default_height_filter(),
            allow_extrapolation: true,
            minor_version: default_minor_version(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PretreatmentConfig {
    #[serde(default)]
    pub filter_deviation: FilterDeviationConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub normalize_height: NormalizeHeightConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub pretreatment: PretreatmentConfig,
}

/// A configuration that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub input_filename: Option<String>,
    pub spatial_reference: Option<String>,
    pub on_error: OnError,
    pub deviation_day: Option<f64>,
    pub gpstime_ref: String,
    /// `None` when height normalization is disabled.
    pub normalize: Option<NormalizeSettings>,
}

impl Config {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Checks every setting without touching the input tiles.
    pub fn validate(self) -> Result<ValidatedConfig, Error> {
        let Config { io, pretreatment } = self;

        let input_dir = io
            .input_dir
            .ok_or_else(|| Error::Configuration("io.input_dir is required".to_string()))?;
        let output_dir = io
            .output_dir
            .ok_or_else(|| Error::Configuration("io.output_dir is required".to_string()))?;

        if !input_dir.is_dir() {
            return Err(Error::Configuration(format!(
                "input directory does not exist: {}",
                input_dir.display()
            )));
        }

        let input_filename = match io.input_filename {
            Some(name) if name.trim().is_empty() => {
                return Err(Error::Configuration(
                    "io.input_filename must not be empty".to_string(),
                ))
            }
            other => other,
        };

        if let Some(srs) = &io.spatial_reference {
            parse_epsg(srs).map_err(|e| Error::Configuration(e.to_string()))?;
        }

        let deviation = pretreatment.filter_deviation;
        DeviationDayFilter::new(deviation.deviation_day, &deviation.gpstime_ref)
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let normalize = if pretreatment.normalize_height.enabled {
            let settings = pretreatment.normalize_height;
            if !settings.height_filter.is_finite() {
                return Err(Error::Configuration(format!(
                    "height_filter must be finite, got {}",
                    settings.height_filter
                )));
            }
            if settings.minor_version > 4 {
                return Err(Error::Configuration(format!(
                    "minor_version must be between 0 and 4, got {}",
                    settings.minor_version
                )));
            }
            if same_directory(&input_dir, &output_dir) {
                return Err(Error::Configuration(
                    "output_dir must differ from input_dir when normalizing heights".to_string(),
                ));
            }

            Some(NormalizeSettings {
                params: NormalizeHeightParams {
                    filter_dimension: pretreatment.filter.dimension,
                    filter_values: pretreatment.filter.keep_values,
                    height_filter: settings.height_filter,
                    allow_extrapolation: settings.allow_extrapolation,
                },
                minor_version: settings.minor_version,
            })
        } else {
            None
        };

        Ok(ValidatedConfig {
            input_dir,
            output_dir,
            input_filename,
            spatial_reference: io.spatial_reference,
            on_error: io.on_error,
            deviation_day: deviation.deviation_day,
            gpstime_ref: deviation.gpstime_ref,
            normalize,
        })
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    let a = fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let b = fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    a == b
}
