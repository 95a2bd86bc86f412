use std::path::PathBuf;

use las::{point::ScanDirection, GpsTimeType, Reader, Vlr};

use pcd_core::pointcloud::point::{
    Color, EpsgCode, LasLayout, Metadata, Point, PointAttributes, PointCloud, RawVlr,
};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

mod extra_bytes;

use extra_bytes::ExtraBytesSplit;

pub struct LasParserProvider {
    pub filename: PathBuf,
    pub spatial_reference: Option<String>,
}

impl ParserProvider for LasParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(LasParser {
            filename: self.filename.clone(),
            spatial_reference: self.spatial_reference.clone(),
        })
    }
}

pub struct LasParser {
    pub filename: PathBuf,
    /// Assigned to the cloud in place of whatever the file declares.
    pub spatial_reference: Option<String>,
}

impl LasParser {
    fn read_failure(&self, source: las::Error) -> ParseError {
        ParseError::ReadFailure {
            path: self.filename.clone(),
            source,
        }
    }
}

impl Parser for LasParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        let epsg = match &self.spatial_reference {
            Some(srs) => parse_epsg(srs)?,
            None => None,
        };

        let start = std::time::Instant::now();
        let mut reader = Reader::from_path(&self.filename).map_err(|e| self.read_failure(e))?;
        log::debug!("Open LAS time: {:?}", start.elapsed());

        let header = reader.header();
        let format = header.point_format();
        let version = header.version();
        let transforms = header.transforms();

        let mut layout = LasLayout {
            version: (version.major, version.minor),
            point_format: format.to_u8().map_err(|e| self.read_failure(e))?,
            has_gps_time: format.has_gps_time,
            has_color: format.has_color,
            has_nir: format.has_nir,
            is_extended: format.is_extended,
            has_waveform: format.has_waveform,
            extra_bytes: format.extra_bytes,
            header_point_count: header.number_of_points(),
            standard_gps_time: matches!(header.gps_time_type(), GpsTimeType::Standard),
            system_identifier: header.system_identifier().to_string(),
            generating_software: header.generating_software().to_string(),
            vlrs: header.vlrs().iter().map(convert_vlr).collect(),
            evlrs: header.evlrs().iter().map(convert_vlr).collect(),
        };

        let extra_split = ExtraBytesSplit::new(&layout.vlrs, layout.extra_bytes);
        if let Some(split) = &extra_split {
            split.apply_to_vlrs(&mut layout.vlrs);
            layout.extra_bytes = split.raw_len();
        }

        // the header count is not trusted for the allocation
        let capacity = std::fs::metadata(&self.filename)
            .map(|m| m.len() / u64::from(format.len().max(1)))
            .unwrap_or(0)
            .min(layout.header_point_count) as usize;

        let metadata = Metadata {
            epsg,
            spatial_reference: self.spatial_reference.clone(),
            scale: [transforms.x.scale, transforms.y.scale, transforms.z.scale],
            offset: [transforms.x.offset, transforms.y.offset, transforms.z.offset],
            layout,
            extra_dimensions: extra_split
                .as_ref()
                .map(ExtraBytesSplit::names)
                .unwrap_or_default(),
            ..Default::default()
        };

        let start = std::time::Instant::now();
        let mut points = Vec::with_capacity(capacity);
        for las_point in reader.points() {
            let las_point = las_point.map_err(|e| self.read_failure(e))?;
            let mut point = convert_las_point(las_point);
            if let Some(split) = &extra_split {
                (point.extra_bytes, point.extra) = split.split(&point.extra_bytes);
            }
            points.push(point);
        }
        log::debug!("Build PointCloud time: {:?}", start.elapsed());

        Ok(PointCloud::new(points, metadata))
    }
}

fn convert_las_point(las_point: las::Point) -> Point {
    let color = las_point.color.map(|c| Color {
        r: c.red,
        g: c.green,
        b: c.blue,
    });

    let attributes = PointAttributes {
        intensity: las_point.intensity,
        return_number: las_point.return_number,
        number_of_returns: las_point.number_of_returns,
        classification: u8::from(las_point.classification),
        scan_direction_left_to_right: las_point.scan_direction == ScanDirection::LeftToRight,
        is_edge_of_flight_line: las_point.is_edge_of_flight_line,
        is_synthetic: las_point.is_synthetic,
        is_key_point: las_point.is_key_point,
        is_withheld: las_point.is_withheld,
        is_overlap: las_point.is_overlap,
        scanner_channel: las_point.scanner_channel,
        scan_angle: las_point.scan_angle,
        user_data: las_point.user_data,
        point_source_id: las_point.point_source_id,
        gps_time: las_point.gps_time,
        nir: las_point.nir,
    };

    Point {
        x: las_point.x,
        y: las_point.y,
        z: las_point.z,
        color,
        attributes,
        extra_bytes: las_point.extra_bytes,
        extra: Vec::new(),
    }
}

fn convert_vlr(vlr: &Vlr) -> RawVlr {
    RawVlr {
        user_id: vlr.user_id.clone(),
        record_id: vlr.record_id,
        description: vlr.description.clone(),
        data: vlr.data.clone(),
    }
}

/// Extracts the code of an `EPSG:<code>` spatial reference. Other non-empty
/// strings (e.g. WKT) are accepted as-is and yield `None`.
pub fn parse_epsg(spatial_reference: &str) -> Result<Option<EpsgCode>, ParseError> {
    let srs = spatial_reference.trim();
    if srs.is_empty() {
        return Err(ParseError::InvalidInput(
            "Spatial reference must not be empty".to_string(),
        ));
    }

    match srs.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => srs[5..]
            .trim()
            .parse::<EpsgCode>()
            .map(Some)
            .map_err(|_| {
                ParseError::InvalidInput(format!("Invalid EPSG spatial reference: {}", srs))
            }),
        _ => Ok(None),
    }
}
