use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use pcd_core::pointcloud::point::PointCloud;

use super::Transform;
use crate::error::TransformError;
use crate::gpstime::{gps_times, gpstime_to_datetime, parse_gpstime_ref};

/// Outcome of a deviation-day pass, for logging and reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationDayReport {
    pub total: usize,
    pub kept: usize,
    pub distinct_dates: usize,
    /// `None` when the filter was a pass-through.
    pub modal_date: Option<NaiveDate>,
}

impl DeviationDayReport {
    pub fn removed(&self) -> usize {
        self.total - self.kept
    }

    pub fn percentage_removed(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.removed() as f64 / self.total as f64 * 100.0
        }
    }
}

/// Keeps the points acquired within `deviation_day` days of the most frequent
/// acquisition date.
///
/// A missing or non-finite threshold disables the filter, as does a tile whose
/// number of distinct dates does not exceed the threshold. The threshold is
/// truncated to whole days.
pub struct DeviationDayFilter {
    deviation_day: Option<i64>,
    gpstime_ref: NaiveDateTime,
}

impl DeviationDayFilter {
    pub fn new(deviation_day: Option<f64>, gpstime_ref: &str) -> Result<Self, TransformError> {
        let deviation_day = match deviation_day {
            Some(days) if days.is_finite() => {
                if days < 0.0 {
                    return Err(TransformError::InvalidParameter(format!(
                        "deviation_day must not be negative, got {}",
                        days
                    )));
                }
                Some(days.trunc() as i64)
            }
            _ => None,
        };

        Ok(Self {
            deviation_day,
            gpstime_ref: parse_gpstime_ref(gpstime_ref)?,
        })
    }

    pub fn apply(
        &self,
        mut point_cloud: PointCloud,
    ) -> Result<(PointCloud, DeviationDayReport), TransformError> {
        let total = point_cloud.len();
        let mut report = DeviationDayReport {
            total,
            kept: total,
            distinct_dates: 0,
            modal_date: None,
        };

        let Some(deviation_day) = self.deviation_day else {
            log::info!("filter_deviation_day: no threshold, keeping all points");
            return Ok((point_cloud, report));
        };

        let dates = gps_times(&point_cloud)
            .into_iter()
            .map(|t| gpstime_to_datetime(self.gpstime_ref, t).map(|dt| dt.date()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut histogram: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for date in &dates {
            *histogram.entry(*date).or_default() += 1;
        }
        report.distinct_dates = histogram.len();

        if histogram.len() as i64 <= deviation_day {
            log::info!(
                "filter_deviation_day: {} distinct dates (<= {}), keeping all points",
                histogram.len(),
                deviation_day
            );
            return Ok((point_cloud, report));
        }

        let Some(modal_date) = modal_date(&histogram) else {
            return Ok((point_cloud, report));
        };

        let mask: Vec<bool> = dates
            .iter()
            .map(|d| d.signed_duration_since(modal_date).num_days().abs() <= deviation_day)
            .collect();
        point_cloud.retain_by_mask(&mask);

        report.kept = point_cloud.len();
        report.modal_date = Some(modal_date);

        log::info!(
            "filter_deviation_day: {:.1}% removed (> {} days around {})",
            report.percentage_removed(),
            deviation_day,
            modal_date
        );
        if report.kept == 0 {
            log::warn!("filter_deviation_day: no points left");
        }

        Ok((point_cloud, report))
    }
}

impl Transform for DeviationDayFilter {
    fn name(&self) -> &'static str {
        "deviation_day"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        self.apply(point_cloud).map(|(pc, _)| pc)
    }
}

// Highest count wins; on a tie the earliest date wins.
fn modal_date(histogram: &BTreeMap<NaiveDate, usize>) -> Option<NaiveDate> {
    let mut best: Option<(NaiveDate, usize)> = None;
    for (date, count) in histogram {
        match best {
            Some((_, best_count)) if best_count >= *count => {}
            _ => best = Some((*date, *count)),
        }
    }
    best.map(|(date, _)| date)
}

pub fn filter_deviation_day(
    point_cloud: PointCloud,
    deviation_day: Option<f64>,
    gpstime_ref: &str,
) -> Result<(PointCloud, DeviationDayReport), TransformError> {
    DeviationDayFilter::new(deviation_day, gpstime_ref)?.apply(point_cloud)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pcd_core::pointcloud::point::{Metadata, Point};

    use super::*;
    use crate::builder::PipelineBuilder;
    use crate::runner::{PointCloudTransformer, Transformer as _};

    const GPSTIME_REF: &str = "2023-01-01 12:00:00";

    fn ref_dt() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    // One point per entry, acquired at noon on the given day of January 2023.
    fn january_cloud(days: &[u32]) -> PointCloud {
        let points = days
            .iter()
            .enumerate()
            .map(|(i, day)| {
                let acquired = NaiveDate::from_ymd_opt(2023, 1, *day)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap();
                let mut p = Point::new(i as f64 * 100.0, i as f64 * 100.0, i as f64 * 10.0);
                p.attributes.gps_time = Some((acquired - ref_dt()).num_seconds() as f64);
                p.attributes.intensity = i as u16;
                p.attributes.return_number = 1;
                p
            })
            .collect();
        PointCloud::new(points, Metadata::default())
    }

    fn days_of(pc: &PointCloud) -> Vec<i64> {
        pc.points
            .iter()
            .map(|p| {
                let dt = gpstime_to_datetime(ref_dt(), p.attributes.gps_time.unwrap()).unwrap();
                dt.date()
                    .signed_duration_since(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap())
                    .num_days()
            })
            .collect()
    }

    #[test]
    fn filter_deviation_day_removes_out_of_date_points() {
        let pc = january_cloud(&[15, 15, 15, 15, 15, 16, 20, 14, 10, 16]);

        let (pc, report) = filter_deviation_day(pc, Some(2.0), GPSTIME_REF).unwrap();

        let xs: Vec<f64> = pc.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 100.0, 200.0, 300.0, 400.0, 500.0, 700.0, 900.0]);
        assert_eq!(pc.metadata.point_count, 8);
        assert_eq!(report.removed(), 2);
        assert_eq!(report.distinct_dates, 5);
        assert_eq!(report.modal_date, NaiveDate::from_ymd_opt(2023, 1, 15));
        assert!((report.percentage_removed() - 20.0).abs() < 1e-9);

        // every attribute still belongs to its original point
        for p in &pc.points {
            let index = (p.x / 100.0) as u16;
            assert_eq!(p.attributes.intensity, index);
            assert_eq!(p.y, p.x);
            assert_eq!(p.z, index as f64 * 10.0);
        }
    }

    #[test]
    fn filter_runs_as_a_pipeline_stage() {
        let days = [15, 15, 15, 15, 15, 16, 20, 14, 10, 16];
        let builder = PipelineBuilder::filter_deviation_day(Some(2.0), GPSTIME_REF);
        let transformer = PointCloudTransformer::from_builder(&builder).unwrap();

        let staged = transformer.execute(january_cloud(&days)).unwrap();
        let (direct, _) =
            filter_deviation_day(january_cloud(&days), Some(2.0), GPSTIME_REF).unwrap();
        assert_eq!(staged.points, direct.points);
        assert_eq!(staged.len(), 8);
    }

    #[test]
    fn survivors_are_inside_window_and_removed_are_outside() {
        let days = [1, 3, 3, 3, 4, 6, 7, 9, 9, 12, 2, 3];
        let (pc, report) =
            filter_deviation_day(january_cloud(&days), Some(3.0), GPSTIME_REF).unwrap();
        let mode = 3;

        let kept_days = days_of(&pc);
        assert!(kept_days.iter().all(|d| (d - mode).abs() <= 3));

        let removed: Vec<i64> = days
            .iter()
            .map(|d| *d as i64)
            .filter(|d| (d - mode).abs() > 3)
            .collect();
        assert_eq!(removed.len(), report.removed());
        assert_eq!(kept_days.len() + removed.len(), days.len());
    }

    #[test]
    fn few_distinct_dates_is_a_no_op() {
        let pc = january_cloud(&[1, 20, 20, 1]);
        let expected = pc.points.clone();

        let (pc, report) = filter_deviation_day(pc, Some(2.0), GPSTIME_REF).unwrap();
        assert_eq!(pc.points, expected);
        assert_eq!(report.modal_date, None);
        assert_eq!(report.removed(), 0);
    }

    #[test]
    fn missing_or_non_finite_threshold_is_a_no_op() {
        for threshold in [None, Some(f64::NAN), Some(f64::INFINITY)] {
            let pc = january_cloud(&[1, 5, 9, 13, 13]);
            let expected = pc.points.clone();
            let (pc, _) = filter_deviation_day(pc, threshold, GPSTIME_REF).unwrap();
            assert_eq!(pc.points, expected);
        }
    }

    #[test]
    fn second_pass_removes_nothing() {
        let pc = january_cloud(&[15, 15, 15, 15, 15, 16, 20, 14, 10, 16]);
        let filter = DeviationDayFilter::new(Some(2.0), GPSTIME_REF).unwrap();

        let (once, _) = filter.apply(pc).unwrap();
        let expected = once.points.clone();
        let (twice, report) = filter.apply(once).unwrap();
        assert_eq!(twice.points, expected);
        assert_eq!(report.removed(), 0);
    }

    #[test]
    fn ties_go_to_the_earliest_date() {
        // 3 and 10 both appear twice; the window around 3 keeps days 1..=5
        let (pc, report) =
            filter_deviation_day(january_cloud(&[10, 3, 10, 3, 1, 20]), Some(2.0), GPSTIME_REF)
                .unwrap();
        assert_eq!(report.modal_date, NaiveDate::from_ymd_opt(2023, 1, 3));
        assert_eq!(days_of(&pc), vec![3, 3, 1]);
    }

    #[test]
    fn fractional_threshold_is_truncated() {
        let (pc, _) =
            filter_deviation_day(january_cloud(&[5, 5, 7, 8, 2]), Some(2.9), GPSTIME_REF).unwrap();
        assert_eq!(days_of(&pc), vec![5, 5, 7]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            DeviationDayFilter::new(Some(-1.0), GPSTIME_REF),
            Err(TransformError::InvalidParameter(_))
        ));
        assert!(matches!(
            DeviationDayFilter::new(Some(2.0), "2023/01/01"),
            Err(TransformError::InvalidParameter(_))
        ));
    }

    #[test]
    fn empty_cloud_passes_through() {
        let (pc, report) =
            filter_deviation_day(PointCloud::default(), Some(0.0), GPSTIME_REF).unwrap();
        assert!(pc.is_empty());
        assert_eq!(report.total, 0);
    }
}
