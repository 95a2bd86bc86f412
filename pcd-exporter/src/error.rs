use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Las(#[from] las::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid extra dimension name '{0}': must be 1 to 32 ASCII bytes")]
    InvalidDimensionName(String),
    #[error("{0}")]
    InvalidOption(String),
}
