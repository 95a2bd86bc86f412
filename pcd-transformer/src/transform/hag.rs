use spade::{
    DelaunayTriangulation, FloatTriangulation as _, HasPosition, Point2, Triangulation as _,
};

use pcd_core::pointcloud::point::PointCloud;

use super::Transform;
use crate::error::TransformError;

pub const GROUND_CLASSIFICATION: u8 = 2;
pub const HEIGHT_ABOVE_GROUND: &str = "HeightAboveGround";

#[derive(Debug, Clone, Copy)]
struct GroundVertex {
    x: f64,
    y: f64,
    z: f64,
}

impl HasPosition for GroundVertex {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Height above ground from a TIN over the ground points (classification 2).
///
/// Points inside the ground hull get `z - ground(x, y)` with the ground
/// interpolated linearly on the enclosing triangle. Points outside the hull use
/// the nearest ground vertex when extrapolation is allowed, otherwise 0.
pub struct HagDelaunay {
    pub allow_extrapolation: bool,
}

impl Transform for HagDelaunay {
    fn name(&self) -> &'static str {
        "hag_delaunay"
    }

    fn transform(&self, mut point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let index = point_cloud.add_extra_dimension(HEIGHT_ABOVE_GROUND);
        if point_cloud.is_empty() {
            return Ok(point_cloud);
        }

        let ground: Vec<GroundVertex> = point_cloud
            .points
            .iter()
            .filter(|p| p.attributes.classification == GROUND_CLASSIFICATION)
            .map(|p| GroundVertex {
                x: p.x,
                y: p.y,
                z: p.z,
            })
            .collect();
        if ground.is_empty() {
            return Err(TransformError::NoGroundPoints);
        }
        let num_ground = ground.len();

        let tin = DelaunayTriangulation::<GroundVertex>::bulk_load_stable(ground)
            .map_err(|e| TransformError::Triangulation(format!("{:?}", e)))?;
        let barycentric = tin.barycentric();

        let mut outside_hull = 0;
        for point in &mut point_cloud.points {
            let position = Point2::new(point.x, point.y);
            let ground_z = match barycentric.interpolate(|v| v.data().z, position) {
                Some(z) => Some(z),
                None => {
                    outside_hull += 1;
                    if self.allow_extrapolation {
                        tin.nearest_neighbor(position).map(|v| v.data().z)
                    } else {
                        None
                    }
                }
            };
            point.extra[index] = ground_z.map_or(0.0, |g| point.z - g);
        }

        log::info!(
            "hag_delaunay: {} ground points, {} points outside the ground hull",
            num_ground,
            outside_hull
        );

        Ok(point_cloud)
    }
}
