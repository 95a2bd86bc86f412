use pcd_core::pointcloud::point::PointCloud;

use crate::error::TransformError;

pub mod deviation_day;
pub mod ferry;
pub mod hag;
pub mod range;

pub trait Transform {
    fn name(&self) -> &'static str;

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError>;
}

/// Applies its transforms one after the other; the first failure aborts the chain.
pub struct CompositeTransform {
    transforms: Vec<Box<dyn Transform>>,
}

impl CompositeTransform {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for CompositeTransform {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let mut intermediate = point_cloud;

        for transform in &self.transforms {
            let before = intermediate.len();
            let start = std::time::Instant::now();
            intermediate = transform.transform(intermediate)?;
            log::debug!(
                "{}: {} -> {} points in {:?}",
                transform.name(),
                before,
                intermediate.len(),
                start.elapsed()
            );

            if before > 0 && intermediate.is_empty() {
                log::warn!("{}: no points left", transform.name());
            }
        }

        Ok(intermediate)
    }
}
