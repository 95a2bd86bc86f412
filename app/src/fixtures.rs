use std::path::Path;

use chrono::NaiveDate;
use las::{
    point::{Classification, Format},
    Builder, Writer,
};

pub const GPSTIME_REF: &str = "2023-01-01 00:00:00";

/// Seconds after `GPSTIME_REF` for noon on the given day of January 2023.
pub fn january_noon(day: u32) -> f64 {
    let acquired = NaiveDate::from_ymd_opt(2023, 1, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let reference = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (acquired - reference).num_seconds() as f64
}

pub fn point(x: f64, y: f64, z: f64, classification: u8, gps_time: f64) -> las::Point {
    las::Point {
        x,
        y,
        z,
        classification: Classification::new(classification).unwrap(),
        return_number: 1,
        number_of_returns: 1,
        gps_time: Some(gps_time),
        ..Default::default()
    }
}

pub fn write_tile(path: &Path, points: &[las::Point]) {
    let mut builder = Builder::from((1, 2));
    builder.point_format = Format::new(1).unwrap();
    let mut writer = Writer::from_path(path, builder.into_header().unwrap()).unwrap();
    for p in points {
        writer.write_point(p.clone()).unwrap();
    }
    writer.close().unwrap();
}

/// A 50 m square of ground points at z = 100 surveyed on January 15th, with
/// vegetation at various heights and a few points from other days.
pub fn forest_tile() -> Vec<las::Point> {
    let mut points = Vec::new();
    for yi in 0..6 {
        for xi in 0..6 {
            points.push(point(
                xi as f64 * 10.0,
                yi as f64 * 10.0,
                100.0,
                2,
                january_noon(15),
            ));
        }
    }
    points.push(point(15.0, 15.0, 108.0, 5, january_noon(15)));
    points.push(point(25.0, 35.0, 130.0, 4, january_noon(16)));
    points.push(point(35.0, 25.0, 175.0, 5, january_noon(15)));
    points.push(point(5.0, 45.0, 103.0, 3, january_noon(14)));
    points.push(point(45.0, 5.0, 112.0, 7, january_noon(15)));
    // acquired on another survey
    points.push(point(22.0, 22.0, 110.0, 5, january_noon(1)));
    points.push(point(32.0, 12.0, 104.0, 1, january_noon(28)));
    points
}
