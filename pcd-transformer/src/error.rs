use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{0}")]
    InvalidParameter(String),
    #[error("Invalid GPS time: {0}")]
    InvalidGpsTime(f64),
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),
    #[error("Input point cloud does not have any points classified as ground")]
    NoGroundPoints,
    #[error("Triangulation failed: {0}")]
    Triangulation(String),
}
