use chrono::{NaiveDateTime, TimeDelta};

use pcd_core::pointcloud::point::PointCloud;

use crate::error::TransformError;

pub const GPSTIME_REF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_gpstime_ref(gpstime_ref: &str) -> Result<NaiveDateTime, TransformError> {
    parse_gpstime_ref_with_format(gpstime_ref, GPSTIME_REF_FORMAT)
}

pub fn parse_gpstime_ref_with_format(
    gpstime_ref: &str,
    date_format: &str,
) -> Result<NaiveDateTime, TransformError> {
    NaiveDateTime::parse_from_str(gpstime_ref.trim(), date_format).map_err(|e| {
        TransformError::InvalidParameter(format!(
            "gpstime_ref '{}' does not match '{}': {}",
            gpstime_ref, date_format, e
        ))
    })
}

/// Absolute time of a GPS time offset (in seconds) from `reference`, rounded to
/// the microsecond.
pub fn gpstime_to_datetime(
    reference: NaiveDateTime,
    gps_time: f64,
) -> Result<NaiveDateTime, TransformError> {
    if !gps_time.is_finite() {
        return Err(TransformError::InvalidGpsTime(gps_time));
    }

    let micros = (gps_time * 1e6).round();
    if micros.abs() >= i64::MAX as f64 {
        return Err(TransformError::InvalidGpsTime(gps_time));
    }

    reference
        .checked_add_signed(TimeDelta::microseconds(micros as i64))
        .ok_or(TransformError::InvalidGpsTime(gps_time))
}

/// GPS time of every point in point order. Points without GPS time count as 0.0.
pub(crate) fn gps_times(point_cloud: &PointCloud) -> Vec<f64> {
    let missing = point_cloud
        .points
        .iter()
        .filter(|p| p.attributes.gps_time.is_none())
        .count();
    if missing > 0 {
        log::warn!(
            "No 'gps_time' attribute found on {} points; using zeros.",
            missing
        );
    }

    point_cloud
        .points
        .iter()
        .map(|p| p.attributes.gps_time.unwrap_or(0.0))
        .collect()
}

/// Converts the GPS time of every point to an absolute date-time, using
/// `start_date` as origin.
pub fn convert_gpstime_to_time(
    point_cloud: &PointCloud,
    start_date: NaiveDateTime,
) -> Result<Vec<NaiveDateTime>, TransformError> {
    let times = gps_times(point_cloud)
        .into_iter()
        .map(|t| gpstime_to_datetime(start_date, t))
        .collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "Converted gps_time to absolute datetimes for {} points",
        times.len()
    );
    Ok(times)
}
