use pcd_core::pointcloud::{dimension::Dimension, point::PointCloud};

use super::Transform;
use crate::error::TransformError;

/// Copies the values of one dimension into a named extra dimension, creating it
/// when needed.
pub struct Ferry {
    from: String,
    to: String,
}

impl Ferry {
    pub fn new(from: &str, to: &str) -> Result<Self, TransformError> {
        if to.trim().is_empty() {
            return Err(TransformError::InvalidParameter(
                "ferry target dimension name is empty".to_string(),
            ));
        }
        if Dimension::from_standard_name(to).is_some() {
            return Err(TransformError::InvalidParameter(format!(
                "ferry target '{}' is a standard dimension",
                to
            )));
        }
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

impl Transform for Ferry {
    fn name(&self) -> &'static str {
        "ferry"
    }

    fn transform(&self, mut point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let source = point_cloud
            .dimension(&self.from)
            .ok_or_else(|| TransformError::UnknownDimension(self.from.clone()))?;
        let target = point_cloud.add_extra_dimension(&self.to);

        for point in &mut point_cloud.points {
            let value = point.value(source).unwrap_or(0.0);
            point.extra[target] = value;
        }

        log::info!("ferry {} => {}", self.from, self.to);
        Ok(point_cloud)
    }
}
