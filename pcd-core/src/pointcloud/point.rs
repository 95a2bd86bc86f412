use crate::pointcloud::dimension::{normalize_name, Dimension};

pub type EpsgCode = u16;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointAttributes {
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    pub classification: u8,
    pub scan_direction_left_to_right: bool,
    pub is_edge_of_flight_line: bool,
    pub is_synthetic: bool,
    pub is_key_point: bool,
    pub is_withheld: bool,
    pub is_overlap: bool,
    pub scanner_channel: u8,
    pub scan_angle: f32,
    pub user_data: u8,
    pub point_source_id: u16,
    pub gps_time: Option<f64>,
    pub nir: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

// Coordinates are kept in their real-world form (scale and offset already applied).
// `extra` holds one value per named extra dimension of the owning cloud, in the
// order of `Metadata::extra_dimensions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub color: Option<Color>,
    pub attributes: PointAttributes,
    pub extra_bytes: Vec<u8>,
    pub extra: Vec<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Value of a dimension as `f64`, `None` when the point does not carry it
    /// (e.g. GPS time on a point format without time).
    pub fn value(&self, dimension: Dimension) -> Option<f64> {
        let attributes = &self.attributes;
        match dimension {
            Dimension::X => Some(self.x),
            Dimension::Y => Some(self.y),
            Dimension::Z => Some(self.z),
            Dimension::Intensity => Some(attributes.intensity as f64),
            Dimension::ReturnNumber => Some(attributes.return_number as f64),
            Dimension::NumberOfReturns => Some(attributes.number_of_returns as f64),
            Dimension::Classification => Some(attributes.classification as f64),
            Dimension::ScanAngle => Some(attributes.scan_angle as f64),
            Dimension::UserData => Some(attributes.user_data as f64),
            Dimension::PointSourceId => Some(attributes.point_source_id as f64),
            Dimension::GpsTime => attributes.gps_time,
            Dimension::Red => self.color.map(|c| c.r as f64),
            Dimension::Green => self.color.map(|c| c.g as f64),
            Dimension::Blue => self.color.map(|c| c.b as f64),
            Dimension::Infrared => attributes.nir.map(|n| n as f64),
            Dimension::Extra(index) => self.extra.get(index).copied(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub metadata: Metadata,
}

impl PointCloud {
    pub fn new(points: Vec<Point>, metadata: Metadata) -> Self {
        let mut point_cloud = PointCloud { points, metadata };
        point_cloud.refresh_metadata();
        point_cloud
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64, &Point)> {
        self.points
            .iter()
            .map(|point| (point.x, point.y, point.z, point))
    }

    /// Recomputes point count and bounding volume after the point set changed.
    pub fn refresh_metadata(&mut self) {
        let mut bounding_volume = BoundingVolume {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        };

        for (x, y, z, _) in self.iter() {
            bounding_volume.max[0] = bounding_volume.max[0].max(x);
            bounding_volume.max[1] = bounding_volume.max[1].max(y);
            bounding_volume.max[2] = bounding_volume.max[2].max(z);
            bounding_volume.min[0] = bounding_volume.min[0].min(x);
            bounding_volume.min[1] = bounding_volume.min[1].min(y);
            bounding_volume.min[2] = bounding_volume.min[2].min(z);
        }

        if self.points.is_empty() {
            bounding_volume = BoundingVolume::default();
        }

        self.metadata.point_count = self.points.len();
        self.metadata.bounding_volume = bounding_volume;
    }

    /// Keeps the points whose mask entry is `true`. Point order is preserved and
    /// every attribute travels with its point.
    ///
    /// Panics if the mask length differs from the point count.
    pub fn retain_by_mask(&mut self, mask: &[bool]) {
        assert_eq!(
            mask.len(),
            self.points.len(),
            "mask length must match the number of points"
        );
        let mut keep = mask.iter();
        self.points.retain(|_| *keep.next().unwrap_or(&false));
        self.refresh_metadata();
    }

    /// Resolves a dimension name (case and `_` insensitive) against the standard
    /// LAS dimensions and this cloud's extra dimensions.
    pub fn dimension(&self, name: &str) -> Option<Dimension> {
        Dimension::from_standard_name(name).or_else(|| {
            let normalized = normalize_name(name);
            self.metadata
                .extra_dimensions
                .iter()
                .position(|d| normalize_name(d) == normalized)
                .map(Dimension::Extra)
        })
    }

    /// Returns the index of the named extra dimension, registering it (with a
    /// value of 0.0 on every point) when it does not exist yet.
    pub fn add_extra_dimension(&mut self, name: &str) -> usize {
        let normalized = normalize_name(name);
        if let Some(index) = self
            .metadata
            .extra_dimensions
            .iter()
            .position(|d| normalize_name(d) == normalized)
        {
            return index;
        }

        self.metadata.extra_dimensions.push(name.to_string());
        let len = self.metadata.extra_dimensions.len();
        for point in &mut self.points {
            point.extra.resize(len, 0.0);
        }
        len - 1
    }
}

// Bounds of the real-world coordinates (scale and offset applied).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVlr {
    pub user_id: String,
    pub record_id: u16,
    pub description: String,
    pub data: Vec<u8>,
}

/// Layout of the LAS file a cloud was read from, carried so that it can be
/// written back with the same point format.
#[derive(Debug, Clone, PartialEq)]
pub struct LasLayout {
    pub version: (u8, u8),
    pub point_format: u8,
    pub has_gps_time: bool,
    pub has_color: bool,
    pub has_nir: bool,
    pub is_extended: bool,
    pub has_waveform: bool,
    /// Opaque bytes per point beyond the standard point format record. Plain
    /// f64 extra dimensions are decoded into `Point::extra` and not counted.
    pub extra_bytes: u16,
    pub header_point_count: u64,
    pub standard_gps_time: bool,
    pub system_identifier: String,
    pub generating_software: String,
    pub vlrs: Vec<RawVlr>,
    pub evlrs: Vec<RawVlr>,
}

impl Default for LasLayout {
    fn default() -> Self {
        Self {
            version: (1, 2),
            point_format: 0,
            has_gps_time: false,
            has_color: false,
            has_nir: false,
            is_extended: false,
            has_waveform: false,
            extra_bytes: 0,
            header_point_count: 0,
            standard_gps_time: false,
            system_identifier: String::new(),
            generating_software: String::new(),
            vlrs: Vec::new(),
            evlrs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub point_count: usize,
    pub bounding_volume: BoundingVolume,
    pub epsg: Option<EpsgCode>,
    pub spatial_reference: Option<String>,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub layout: LasLayout,
    pub extra_dimensions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cloud(n: usize) -> PointCloud {
        let points = (0..n)
            .map(|i| {
                let mut p = Point::new(i as f64 * 100.0, i as f64 * 100.0, i as f64 * 10.0);
                p.attributes.intensity = i as u16;
                p
            })
            .collect();
        PointCloud::new(points, Metadata::default())
    }

    #[test]
    fn new_computes_bounds_and_count() {
        let pc = make_cloud(4);
        assert_eq!(pc.metadata.point_count, 4);
        assert_eq!(pc.metadata.bounding_volume.min, [0.0, 0.0, 0.0]);
        assert_eq!(pc.metadata.bounding_volume.max, [300.0, 300.0, 30.0]);
    }

    #[test]
    fn retain_by_mask_keeps_order_and_attributes() {
        let mut pc = make_cloud(5);
        pc.retain_by_mask(&[true, false, true, false, true]);

        let xs: Vec<f64> = pc.points.iter().map(|p| p.x).collect();
        let intensities: Vec<u16> = pc.points.iter().map(|p| p.attributes.intensity).collect();
        assert_eq!(xs, vec![0.0, 200.0, 400.0]);
        assert_eq!(intensities, vec![0, 2, 4]);
        assert_eq!(pc.metadata.point_count, 3);
    }

    #[test]
    fn add_extra_dimension_is_idempotent() {
        let mut pc = make_cloud(3);
        let first = pc.add_extra_dimension("HeightAboveGround");
        let second = pc.add_extra_dimension("height_above_ground");
        assert_eq!(first, second);
        assert_eq!(pc.metadata.extra_dimensions.len(), 1);
        assert!(pc.points.iter().all(|p| p.extra == vec![0.0]));
    }

    #[test]
    fn dimension_lookup_resolves_standard_and_extra_names() {
        let mut pc = make_cloud(1);
        pc.add_extra_dimension("Z_ref");
        assert_eq!(pc.dimension("gps_time"), Some(Dimension::GpsTime));
        assert_eq!(pc.dimension("Classification"), Some(Dimension::Classification));
        assert_eq!(pc.dimension("z_ref"), Some(Dimension::Extra(0)));
        assert_eq!(pc.dimension("Unknown"), None);
    }

    #[test]
    fn value_is_none_for_missing_gps_time() {
        let pc = make_cloud(1);
        assert_eq!(pc.points[0].value(Dimension::GpsTime), None);
        assert_eq!(pc.points[0].value(Dimension::Intensity), Some(0.0));
    }
}
