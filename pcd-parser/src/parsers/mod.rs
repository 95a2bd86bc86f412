use std::path::Path;

use pcd_core::pointcloud::point::PointCloud;

use crate::error::ParseError;

pub mod las;

pub trait ParserProvider {
    fn get_parser(&self) -> Box<dyn Parser>;
}

pub trait Parser {
    fn parse(&self) -> Result<PointCloud, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Las,
    Laz,
}

pub fn get_extension(extension: &str) -> Result<Extension, ParseError> {
    match extension.to_lowercase().as_str() {
        "las" => Ok(Extension::Las),
        "laz" => Ok(Extension::Laz),
        other => Err(ParseError::InvalidInput(format!(
            "Unsupported extension: .{}",
            other
        ))),
    }
}

pub fn extension_of(path: &Path) -> Result<Extension, ParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    get_extension(extension)
}
