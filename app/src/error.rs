use thiserror::Error;

use pcd_exporter::ExportError;
use pcd_parser::ParseError;
use pcd_transformer::TransformError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{} of {} tiles failed: {}", .failed.len(), .total, .failed.join(", "))]
    BatchFailed { failed: Vec<String>, total: usize },
}
