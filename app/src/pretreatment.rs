use std::path::Path;

use pcd_core::pointcloud::point::PointCloud;
use pcd_exporter::las::{write_las, LasWriteOptions};
use pcd_transformer::{
    builder::{NormalizeHeightParams, PipelineBuilder},
    runner::PointCloudTransformer,
    Transformer as _,
};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeSettings {
    pub params: NormalizeHeightParams,
    /// LAS 1.x minor version of the written file.
    pub minor_version: u8,
}

/// Replaces elevations by height above ground and writes the result.
///
/// The cloud is optionally filtered by classification, heights above the
/// ceiling are dropped, and the height is stored in a `Z_ref` dimension next
/// to `HeightAboveGround`. Returns the written cloud.
pub fn normalize_height(
    point_cloud: PointCloud,
    output_path: &Path,
    settings: &NormalizeSettings,
) -> Result<PointCloud, Error> {
    let builder = PipelineBuilder::normalize_height(&settings.params);
    let transformer = PointCloudTransformer::from_builder(&builder)?;

    let start = std::time::Instant::now();
    let input_points = point_cloud.len();
    let point_cloud = transformer.execute(point_cloud)?;
    log::info!(
        "normalize_height: {} of {} points kept in {:?}",
        point_cloud.len(),
        input_points,
        start.elapsed()
    );

    write_las(
        output_path,
        &point_cloud,
        &LasWriteOptions {
            minor_version: settings.minor_version,
        },
    )?;

    Ok(point_cloud)
}
