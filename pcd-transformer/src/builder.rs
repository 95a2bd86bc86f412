use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::transform::{
    deviation_day::DeviationDayFilter,
    ferry::Ferry,
    hag::{HagDelaunay, HEIGHT_ABOVE_GROUND},
    range::{Interval, RangeFilter},
    CompositeTransform, Transform,
};

pub const Z_REF: &str = "Z_ref";

/// One step of a processing pipeline, in a serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageDescriptor {
    Range {
        dimension: String,
        intervals: Vec<Interval>,
    },
    HagDelaunay {
        allow_extrapolation: bool,
    },
    Ferry {
        from: String,
        to: String,
    },
    DeviationDay {
        deviation_day: Option<f64>,
        gpstime_ref: String,
    },
}

impl StageDescriptor {
    pub fn build(&self) -> Result<Box<dyn Transform>, TransformError> {
        let transform: Box<dyn Transform> = match self {
            StageDescriptor::Range {
                dimension,
                intervals,
            } => Box::new(RangeFilter::new(dimension, intervals.clone())?),
            StageDescriptor::HagDelaunay {
                allow_extrapolation,
            } => Box::new(HagDelaunay {
                allow_extrapolation: *allow_extrapolation,
            }),
            StageDescriptor::Ferry { from, to } => Box::new(Ferry::new(from, to)?),
            StageDescriptor::DeviationDay {
                deviation_day,
                gpstime_ref,
            } => Box::new(DeviationDayFilter::new(*deviation_day, gpstime_ref)?),
        };
        Ok(transform)
    }
}

pub trait TransformBuilder {
    fn build(&self) -> Result<Box<dyn Transform>, TransformError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeHeightParams {
    /// Dimension used to pre-filter the input, `None` to keep every point.
    pub filter_dimension: Option<String>,
    pub filter_values: Vec<i64>,
    pub height_filter: f64,
    pub allow_extrapolation: bool,
}

impl Default for NormalizeHeightParams {
    fn default() -> Self {
        Self {
            filter_dimension: None,
            filter_values: Vec::new(),
            height_filter: 60.0,
            allow_extrapolation: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineBuilder {
    stages: Vec<StageDescriptor>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: StageDescriptor) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Drops points acquired too far from the survey's modal date.
    pub fn filter_deviation_day(deviation_day: Option<f64>, gpstime_ref: &str) -> Self {
        Self::new().stage(StageDescriptor::DeviationDay {
            deviation_day,
            gpstime_ref: gpstime_ref.to_string(),
        })
    }

    /// Classification pre-filter (when configured), height above ground,
    /// height ceiling, then a copy of the height into `Z_ref`.
    pub fn normalize_height(params: &NormalizeHeightParams) -> Self {
        let mut builder = Self::new();

        if let Some(dimension) = &params.filter_dimension {
            if !dimension.trim().is_empty() && !params.filter_values.is_empty() {
                builder = builder.stage(StageDescriptor::Range {
                    dimension: dimension.clone(),
                    intervals: params
                        .filter_values
                        .iter()
                        .map(|v| Interval::exact(*v as f64))
                        .collect(),
                });
            }
        }

        builder
            .stage(StageDescriptor::HagDelaunay {
                allow_extrapolation: params.allow_extrapolation,
            })
            .stage(StageDescriptor::Range {
                dimension: HEIGHT_ABOVE_GROUND.to_string(),
                intervals: vec![Interval::at_most(params.height_filter)],
            })
            .stage(StageDescriptor::Ferry {
                from: HEIGHT_ABOVE_GROUND.to_string(),
                to: Z_REF.to_string(),
            })
    }
}

impl TransformBuilder for PipelineBuilder {
    fn build(&self) -> Result<Box<dyn Transform>, TransformError> {
        match serde_json::to_string(&self.stages) {
            Ok(json) => log::debug!("pipeline: {}", json),
            Err(e) => log::debug!("pipeline could not be serialized: {}", e),
        }

        let transforms = self
            .stages
            .iter()
            .map(StageDescriptor::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(CompositeTransform::new(transforms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_height_stages_are_ordered() {
        let params = NormalizeHeightParams {
            filter_dimension: Some("Classification".to_string()),
            filter_values: vec![1, 2, 3, 4, 5, 9],
            ..Default::default()
        };
        let builder = PipelineBuilder::normalize_height(&params);
        let stages = builder.stages();

        assert_eq!(stages.len(), 4);
        assert!(matches!(&stages[0], StageDescriptor::Range { dimension, intervals }
            if dimension == "Classification" && intervals.len() == 6));
        assert_eq!(
            stages[1],
            StageDescriptor::HagDelaunay {
                allow_extrapolation: true
            }
        );
        assert_eq!(
            stages[2],
            StageDescriptor::Range {
                dimension: HEIGHT_ABOVE_GROUND.to_string(),
                intervals: vec![Interval::at_most(60.0)],
            }
        );
        assert_eq!(
            stages[3],
            StageDescriptor::Ferry {
                from: HEIGHT_ABOVE_GROUND.to_string(),
                to: Z_REF.to_string(),
            }
        );
    }

    #[test]
    fn classification_filter_is_skipped_when_unset() {
        let builder = PipelineBuilder::normalize_height(&NormalizeHeightParams::default());
        assert_eq!(builder.stages().len(), 3);

        let params = NormalizeHeightParams {
            filter_dimension: Some("Classification".to_string()),
            filter_values: Vec::new(),
            ..Default::default()
        };
        assert_eq!(PipelineBuilder::normalize_height(&params).stages().len(), 3);
    }

    #[test]
    fn descriptors_serialize_with_a_type_tag() {
        let json = serde_json::to_value(StageDescriptor::HagDelaunay {
            allow_extrapolation: true,
        })
        .unwrap();
        assert_eq!(json["type"], "hag_delaunay");
        assert_eq!(json["allow_extrapolation"], true);
    }

    #[test]
    fn invalid_descriptor_fails_to_build() {
        let builder = PipelineBuilder::new().stage(StageDescriptor::DeviationDay {
            deviation_day: Some(2.0),
            gpstime_ref: "yesterday".to_string(),
        });
        assert!(builder.build().is_err());
    }
}
