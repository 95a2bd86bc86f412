use std::fmt;

use serde::{Deserialize, Serialize};

use pcd_core::pointcloud::point::PointCloud;

use super::Transform;
use crate::error::TransformError;

/// Closed interval, unbounded on a side whose limit is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Interval {
    pub fn exact(value: f64) -> Self {
        Self {
            min: Some(value),
            max: Some(value),
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "[{}:{}]", bound(self.min), bound(self.max))
    }
}

/// Keeps the points whose dimension value falls in any of the intervals.
/// Points lacking the dimension value are dropped.
pub struct RangeFilter {
    dimension: String,
    intervals: Vec<Interval>,
}

impl RangeFilter {
    pub fn new(dimension: &str, intervals: Vec<Interval>) -> Result<Self, TransformError> {
        if intervals.is_empty() {
            return Err(TransformError::InvalidParameter(format!(
                "range filter on '{}' needs at least one interval",
                dimension
            )));
        }
        if let Some(interval) = intervals
            .iter()
            .find(|i| matches!((i.min, i.max), (Some(min), Some(max)) if min > max))
        {
            return Err(TransformError::InvalidParameter(format!(
                "empty interval {} on '{}'",
                interval, dimension
            )));
        }

        Ok(Self {
            dimension: dimension.to_string(),
            intervals,
        })
    }

    pub fn limits(&self) -> String {
        self.intervals
            .iter()
            .map(|i| format!("{}{}", self.dimension, i))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Transform for RangeFilter {
    fn name(&self) -> &'static str {
        "range"
    }

    fn transform(&self, mut point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let dimension = point_cloud
            .dimension(&self.dimension)
            .ok_or_else(|| TransformError::UnknownDimension(self.dimension.clone()))?;

        let mask: Vec<bool> = point_cloud
            .points
            .iter()
            .map(|p| {
                p.value(dimension)
                    .map_or(false, |v| self.intervals.iter().any(|i| i.contains(v)))
            })
            .collect();

        let before = point_cloud.len();
        point_cloud.retain_by_mask(&mask);
        log::info!(
            "range {}: kept {} of {} points",
            self.limits(),
            point_cloud.len(),
            before
        );

        Ok(point_cloud)
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::point::{Metadata, Point};

    use super::*;

    fn classified_cloud(classes: &[u8]) -> PointCloud {
        let points = classes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut p = Point::new(i as f64, 0.0, 0.0);
                p.attributes.classification = *c;
                p
            })
            .collect();
        PointCloud::new(points, Metadata::default())
    }

    #[test]
    fn interval_bounds_are_inclusive() {
        assert!(Interval::exact(2.0).contains(2.0));
        assert!(!Interval::exact(2.0).contains(2.5));
        assert!(Interval::at_most(60.0).contains(60.0));
        assert!(Interval::at_most(60.0).contains(-3.0));
        assert!(!Interval::at_most(60.0).contains(60.01));
    }

    #[test]
    fn keeps_listed_classes_in_order() {
        let intervals = [1.0, 2.0, 3.0, 4.0, 5.0, 9.0]
            .iter()
            .map(|v| Interval::exact(*v))
            .collect();
        let filter = RangeFilter::new("Classification", intervals).unwrap();
        let pc = filter
            .transform(classified_cloud(&[2, 7, 5, 18, 9, 1, 6]))
            .unwrap();

        let xs: Vec<f64> = pc.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn limits_are_rendered_like_pdal() {
        let filter = RangeFilter::new(
            "Classification",
            vec![Interval::exact(1.0), Interval::exact(2.0)],
        )
        .unwrap();
        assert_eq!(filter.limits(), "Classification[1:1],Classification[2:2]");
        let filter = RangeFilter::new("HeightAboveGround", vec![Interval::at_most(60.0)]).unwrap();
        assert_eq!(filter.limits(), "HeightAboveGround[:60]");
    }

    #[test]
    fn unknown_dimension_is_an_error() {
        let filter = RangeFilter::new("Foo", vec![Interval::exact(1.0)]).unwrap();
        assert!(matches!(
            filter.transform(classified_cloud(&[1])),
            Err(TransformError::UnknownDimension(_))
        ));
    }

    #[test]
    fn invalid_intervals_are_rejected() {
        assert!(RangeFilter::new("Z", vec![]).is_err());
        let inverted = Interval {
            min: Some(5.0),
            max: Some(1.0),
        };
        assert!(RangeFilter::new("Z", vec![inverted]).is_err());
    }
}
