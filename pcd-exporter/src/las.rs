use std::fs;
use std::path::Path;

use las::{
    point::{Classification, Format, ScanDirection},
    Builder, GpsTimeType, Header, Transform, Vector, Vlr, Writer,
};

use pcd_core::pointcloud::point::{Point, PointCloud, RawVlr};

use crate::error::ExportError;
use crate::extra_bytes::{build_descriptors, encode_values, is_extra_bytes_vlr};
use crate::extra_bytes::{EXTRA_BYTES_RECORD_ID, EXTRA_BYTES_USER_ID};
use crate::geokeys::{geo_key_directory, is_projection_vlr};

pub static SCALE_FACTOR: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct LasWriteOptions {
    /// LAS 1.x minor version of the output header.
    pub minor_version: u8,
}

impl Default for LasWriteOptions {
    fn default() -> Self {
        Self { minor_version: 4 }
    }
}

/// Writes the cloud to `path` as LAS, or LAZ when the extension is `.laz`.
///
/// Every named extra dimension is stored as an f64 after the source file's own
/// extra bytes and declared in an Extra Bytes VLR. A partially written file is
/// removed on failure.
pub fn write_las(
    path: impl AsRef<Path>,
    point_cloud: &PointCloud,
    options: &LasWriteOptions,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let header = build_header(point_cloud, options)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let start = std::time::Instant::now();
    let result = write_points(path, header, point_cloud);
    if result.is_err() && path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to remove partial output {}: {}", path.display(), e);
        }
    }
    result?;

    log::info!(
        "Wrote {} points to {} in {:?}",
        point_cloud.len(),
        path.display(),
        start.elapsed()
    );
    Ok(())
}

fn write_points(path: &Path, header: Header, point_cloud: &PointCloud) -> Result<(), ExportError> {
    let format = header.point_format().clone();
    let raw_len = point_cloud.metadata.layout.extra_bytes as usize;
    let extra_count = point_cloud.metadata.extra_dimensions.len();

    // every point must be encodable before the file is created
    let transforms = header.transforms();
    for point in &point_cloud.points {
        to_las_point(point, &format, raw_len, extra_count)?;
        transforms.x.inverse(point.x)?;
        transforms.y.inverse(point.y)?;
        transforms.z.inverse(point.z)?;
    }

    let mut writer = Writer::from_path(path, header)?;
    let result = point_cloud
        .points
        .iter()
        .try_for_each(|point| {
            writer.write_point(to_las_point(point, &format, raw_len, extra_count)?)?;
            Ok::<_, ExportError>(())
        })
        .and_then(|()| writer.close().map_err(ExportError::from));

    if result.is_err() {
        // the writer panics when dropped unclosed
        std::mem::forget(writer);
    }
    result
}

// Waveform packets are not carried over, so the waveform formats fall back to
// their counterpart without them.
fn waveform_free(point_format: u8) -> u8 {
    match point_format {
        4 => 1,
        5 => 3,
        9 => 6,
        10 => 7,
        other => other,
    }
}

fn build_header(point_cloud: &PointCloud, options: &LasWriteOptions) -> Result<Header, ExportError> {
    let metadata = &point_cloud.metadata;
    let layout = &metadata.layout;

    if options.minor_version > 4 {
        return Err(ExportError::InvalidOption(format!(
            "Unsupported LAS minor version: {}",
            options.minor_version
        )));
    }

    let mut point_format = layout.point_format;
    if layout.has_waveform {
        log::warn!("Waveform data is not preserved in the output");
        point_format = waveform_free(point_format);
    }
    if point_format > 5 && options.minor_version < 4 {
        return Err(ExportError::InvalidOption(format!(
            "Point format {} requires LAS 1.4, got 1.{}",
            point_format, options.minor_version
        )));
    }

    let extra_count = metadata.extra_dimensions.len();
    let mut format = Format::new(point_format)?;
    format.extra_bytes = layout.extra_bytes + 8 * extra_count as u16;

    let mut builder = Builder::from((1, options.minor_version));
    builder.point_format = format;
    builder.transforms = transforms(point_cloud);
    builder.gps_time_type = if layout.standard_gps_time {
        GpsTimeType::Standard
    } else {
        GpsTimeType::Week
    };
    builder.system_identifier = layout.system_identifier.clone();
    builder.generating_software = format!("pcd-exporter {}", env!("CARGO_PKG_VERSION"));

    let geo_keys = match metadata.epsg {
        Some(epsg) if point_format <= 5 => Some(geo_key_directory(epsg)),
        Some(epsg) => {
            log::warn!(
                "EPSG:{} is not written for point format {}, keeping the source CRS records",
                epsg,
                point_format
            );
            None
        }
        None => {
            if let Some(srs) = &metadata.spatial_reference {
                log::warn!(
                    "Spatial reference '{}' is not an EPSG code and is not written, keeping the source CRS records",
                    srs
                );
            }
            None
        }
    };

    let existing_descriptors = layout
        .vlrs
        .iter()
        .find(|vlr| is_extra_bytes_vlr(vlr))
        .map(|vlr| vlr.data.as_slice());

    for vlr in &layout.vlrs {
        if is_extra_bytes_vlr(vlr) || (geo_keys.is_some() && is_projection_vlr(vlr)) {
            continue;
        }
        builder.vlrs.push(to_las_vlr(vlr));
    }
    if let Some(geo_keys) = &geo_keys {
        builder.vlrs.push(to_las_vlr(geo_keys));
    }

    if layout.extra_bytes > 0 || extra_count > 0 {
        let data = build_descriptors(
            existing_descriptors,
            layout.extra_bytes as usize,
            &metadata.extra_dimensions,
        )?;
        builder.vlrs.push(Vlr {
            user_id: EXTRA_BYTES_USER_ID.to_string(),
            record_id: EXTRA_BYTES_RECORD_ID,
            description: "Extra Bytes".to_string(),
            data,
        });
    }

    if options.minor_version >= 4 {
        builder.evlrs = layout.evlrs.iter().map(to_las_vlr).collect();
    } else if !layout.evlrs.is_empty() {
        log::warn!(
            "Dropping {} EVLRs not supported by LAS 1.{}",
            layout.evlrs.len(),
            options.minor_version
        );
    }

    Ok(builder.into_header()?)
}

// Source scale and offset when known, millimetre precision around the bounds
// otherwise.
fn transforms(point_cloud: &PointCloud) -> Vector<Transform> {
    let metadata = &point_cloud.metadata;
    let axis = |i: usize| {
        if metadata.scale[i] > 0.0 {
            Transform {
                scale: metadata.scale[i],
                offset: metadata.offset[i],
            }
        } else {
            Transform {
                scale: SCALE_FACTOR,
                offset: if point_cloud.is_empty() {
                    0.0
                } else {
                    metadata.bounding_volume.min[i].floor()
                },
            }
        }
    };
    Vector {
        x: axis(0),
        y: axis(1),
        z: axis(2),
    }
}

fn to_las_vlr(vlr: &RawVlr) -> Vlr {
    Vlr {
        user_id: vlr.user_id.clone(),
        record_id: vlr.record_id,
        description: vlr.description.clone(),
        data: vlr.data.clone(),
    }
}

fn to_las_point(
    point: &Point,
    format: &Format,
    raw_len: usize,
    extra_count: usize,
) -> Result<las::Point, ExportError> {
    let attributes = &point.attributes;
    let color = point.color.unwrap_or_default();

    Ok(las::Point {
        x: point.x,
        y: point.y,
        z: point.z,
        intensity: attributes.intensity,
        return_number: attributes.return_number,
        number_of_returns: attributes.number_of_returns,
        scan_direction: if attributes.scan_direction_left_to_right {
            ScanDirection::LeftToRight
        } else {
            ScanDirection::RightToLeft
        },
        is_edge_of_flight_line: attributes.is_edge_of_flight_line,
        classification: Classification::new(attributes.classification)?,
        is_synthetic: attributes.is_synthetic,
        is_key_point: attributes.is_key_point,
        is_withheld: attributes.is_withheld,
        is_overlap: attributes.is_overlap,
        scanner_channel: attributes.scanner_channel,
        scan_angle: attributes.scan_angle,
        user_data: attributes.user_data,
        point_source_id: attributes.point_source_id,
        gps_time: format
            .has_gps_time
            .then(|| attributes.gps_time.unwrap_or(0.0)),
        color: format.has_color.then(|| las::Color {
            red: color.r,
            green: color.g,
            blue: color.b,
        }),
        waveform: None,
        nir: format.has_nir.then(|| attributes.nir.unwrap_or(0)),
        extra_bytes: encode_values(&point.extra_bytes, raw_len, &point.extra, extra_count),
    })
}
