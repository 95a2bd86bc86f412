use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("LAS read error for {}: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("{0}")]
    DependencyMissing(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
