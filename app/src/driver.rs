use std::fs;
use std::path::{Path, PathBuf};

use pcd_parser::check_lidar_file;
use pcd_transformer::{builder::PipelineBuilder, runner::PointCloudTransformer, Transformer as _};

use crate::config::{OnError, ValidatedConfig};
use crate::error::Error;
use crate::pretreatment::normalize_height;

#[derive(Debug, Clone, PartialEq)]
pub struct TileReport {
    pub path: PathBuf,
    pub loaded: usize,
    /// Points left after every stage.
    pub kept: usize,
    pub version: (u8, u8),
    pub point_format: u8,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<TileReport>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    pub fn into_result(self) -> Result<(), Error> {
        if self.failed.is_empty() {
            return Ok(());
        }
        let total = self.total();
        Err(Error::BatchFailed {
            failed: self
                .failed
                .into_iter()
                .map(|(path, _)| path.display().to_string())
                .collect(),
            total,
        })
    }
}

/// The configured file, or every file of the input directory sorted by name.
pub fn input_files(config: &ValidatedConfig) -> Result<Vec<PathBuf>, Error> {
    if let Some(name) = &config.input_filename {
        return Ok(vec![config.input_dir.join(name)]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&config.input_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            log::debug!("Skipping directory {}", path.display());
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

pub fn process_tile(path: &Path, config: &ValidatedConfig) -> Result<TileReport, Error> {
    let point_cloud = check_lidar_file(path, config.spatial_reference.as_deref())?;
    let loaded = point_cloud.len();
    let version = point_cloud.metadata.layout.version;
    let point_format = point_cloud.metadata.layout.point_format;

    let date_filter =
        PipelineBuilder::filter_deviation_day(config.deviation_day, &config.gpstime_ref);
    let point_cloud = PointCloudTransformer::from_builder(&date_filter)?.execute(point_cloud)?;

    let (kept, output) = match &config.normalize {
        Some(settings) => {
            let file_name = path.file_name().ok_or_else(|| {
                Error::Configuration(format!("not a file path: {}", path.display()))
            })?;
            let output_path = config.output_dir.join(file_name);
            let point_cloud = normalize_height(point_cloud, &output_path, settings)?;
            (point_cloud.len(), Some(output_path))
        }
        None => (point_cloud.len(), None),
    };

    Ok(TileReport {
        path: path.to_path_buf(),
        loaded,
        kept,
        version,
        point_format,
        output,
    })
}

/// Runs every tile through the pretreatment stages.
///
/// With `OnError::Abort` the first failing tile stops the batch and its error
/// is returned. Otherwise failures are logged and collected in the summary.
pub fn run(config: &ValidatedConfig) -> Result<BatchSummary, Error> {
    if config.normalize.is_some() {
        fs::create_dir_all(&config.output_dir)?;
    }

    let files = input_files(config)?;
    if files.is_empty() {
        log::warn!("No input files in {}", config.input_dir.display());
    }

    let mut summary = BatchSummary::default();
    for path in files {
        log::info!("Processing {}", path.display());
        let start = std::time::Instant::now();

        match process_tile(&path, config) {
            Ok(report) => {
                println!("SUCCESS: {} points loaded", report.loaded);
                println!("Version: {}.{}", report.version.0, report.version.1);
                println!("Point format: {}", report.point_format);
                log::info!(
                    "{}: {} points kept in {:?}",
                    path.display(),
                    report.kept,
                    start.elapsed()
                );
                if let Some(output) = &report.output {
                    log::info!("Output: {}", output.display());
                }
                summary.processed.push(report);
            }
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                if config.on_error == OnError::Abort {
                    return Err(e);
                }
                summary.failed.push((path, e.to_string()));
            }
        }
    }

    println!(
        "Processed {} of {} tiles",
        summary.processed.len(),
        summary.total()
    );
    for (path, reason) in &summary.failed {
        println!("FAILED: {} ({})", path.display(), reason);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fixtures::{forest_tile, write_tile, GPSTIME_REF};

    fn validated(input_dir: &Path, output_dir: &Path) -> ValidatedConfig {
        let mut config = Config::default();
        config.io.input_dir = Some(input_dir.to_path_buf());
        config.io.output_dir = Some(output_dir.to_path_buf());
        config.pretreatment.filter_deviation.deviation_day = Some(2.0);
        config.pretreatment.filter_deviation.gpstime_ref = GPSTIME_REF.to_string();
        config.validate().unwrap()
    }

    #[test]
    fn full_pipeline_writes_each_tile() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_tile(&input.path().join("b.las"), &forest_tile());
        write_tile(&input.path().join("a.las"), &forest_tile());

        let summary = run(&validated(input.path(), output.path())).unwrap();

        let names: Vec<_> = summary
            .processed
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.las", "b.las"]);

        let report = &summary.processed[0];
        assert_eq!(report.loaded, 43);
        // two off-date points, the noise point and the 75 m point removed
        assert_eq!(report.kept, 39);
        assert_eq!(report.version, (1, 2));
        assert_eq!(report.point_format, 1);

        let written = check_lidar_file(output.path().join("a.las"), None).unwrap();
        assert_eq!(written.len(), 39);
        assert!(summary.into_result().is_ok());
    }

    #[test]
    fn bad_tile_does_not_stop_the_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_tile(&input.path().join("a.las"), &forest_tile());
        fs::write(input.path().join("b.txt"), "not a tile").unwrap();
        write_tile(&input.path().join("c.las"), &forest_tile());

        let summary = run(&validated(input.path(), output.path())).unwrap();

        assert_eq!(summary.processed.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].0.ends_with("b.txt"));
        assert!(output.path().join("c.las").exists());

        let err = summary.into_result().unwrap_err();
        assert!(matches!(err, Error::BatchFailed { total: 3, .. }));
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.txt"), "not a tile").unwrap();
        write_tile(&input.path().join("b.las"), &forest_tile());

        let mut config = validated(input.path(), output.path());
        config.on_error = OnError::Abort;

        assert!(matches!(run(&config), Err(Error::Parse(_))));
        assert!(!output.path().join("b.las").exists());
    }

    #[test]
    fn single_file_without_normalization() {
        let input = tempfile::tempdir().unwrap();
        let output = input.path().join("out");
        write_tile(&input.path().join("a.las"), &forest_tile());
        write_tile(&input.path().join("b.las"), &forest_tile());

        let mut config = validated(input.path(), &output);
        config.input_filename = Some("b.las".to_string());
        config.normalize = None;

        let summary = run(&config).unwrap();
        assert_eq!(summary.processed.len(), 1);
        assert_eq!(summary.processed[0].kept, 41);
        assert_eq!(summary.processed[0].output, None);
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_file_is_reported() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let mut config = validated(input.path(), output.path());
        config.input_filename = Some("missing.las".to_string());

        let summary = run(&config).unwrap();
        assert!(summary.failed[0].1.contains("File not found"));
    }
}
