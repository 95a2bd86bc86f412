use std::path::Path;

use pcd_core::pointcloud::point::PointCloud;

use crate::error::ParseError;
use crate::parsers::{extension_of, las::LasParserProvider, Extension, ParserProvider as _};

/// Codec features compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub laz: bool,
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        laz: cfg!(feature = "laz"),
    }
}

impl Capabilities {
    pub fn require(&self, extension: Extension) -> Result<(), ParseError> {
        match extension {
            Extension::Laz if !self.laz => Err(ParseError::DependencyMissing(
                "LAZ decompression is not available: rebuild pcd-parser with the `laz` feature"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Validates and loads a LiDAR file (`.las` or `.laz`).
///
/// The path must be non-empty, must exist and must carry a `.las`/`.laz`
/// extension. An empty file is accepted with a warning, as is a header whose
/// point count disagrees with the points actually read.
pub fn check_lidar_file(
    input_file: impl AsRef<Path>,
    spatial_reference: Option<&str>,
) -> Result<PointCloud, ParseError> {
    let input_file = input_file.as_ref();

    if input_file.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(ParseError::InvalidInput(
            "Path must be a non-empty string".to_string(),
        ));
    }

    if !input_file.exists() {
        return Err(ParseError::NotFound(input_file.to_path_buf()));
    }

    let extension = extension_of(input_file)?;
    capabilities().require(extension)?;

    let provider = LasParserProvider {
        filename: input_file.to_path_buf(),
        spatial_reference: spatial_reference.map(str::to_string),
    };
    let point_cloud = provider.get_parser().parse()?;

    let num_points = point_cloud.len();
    point_count_matches(point_cloud.metadata.layout.header_point_count, num_points);

    if num_points == 0 {
        log::warn!("Empty file: {}", input_file.display());
    }

    log::info!(
        "Valid LiDAR: {} ({} points)",
        input_file.display(),
        num_points
    );

    Ok(point_cloud)
}

/// Warns when a non-zero header count disagrees with the points read.
fn point_count_matches(header_count: u64, num_points: usize) -> bool {
    if header_count != 0 && header_count != num_points as u64 {
        log::warn!(
            "Header points mismatch: {} vs {}",
            header_count,
            num_points
        );
        return false;
    }
    true
}
