/// A point dimension, either one of the standard LAS attributes or an index
/// into the cloud's named extra dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    X,
    Y,
    Z,
    Intensity,
    ReturnNumber,
    NumberOfReturns,
    Classification,
    ScanAngle,
    UserData,
    PointSourceId,
    GpsTime,
    Red,
    Green,
    Blue,
    Infrared,
    Extra(usize),
}

impl Dimension {
    pub fn from_standard_name(name: &str) -> Option<Self> {
        let dimension = match normalize_name(name).as_str() {
            "x" => Dimension::X,
            "y" => Dimension::Y,
            "z" => Dimension::Z,
            "intensity" => Dimension::Intensity,
            "returnnumber" => Dimension::ReturnNumber,
            "numberofreturns" => Dimension::NumberOfReturns,
            "classification" => Dimension::Classification,
            "scanangle" | "scananglerank" => Dimension::ScanAngle,
            "userdata" => Dimension::UserData,
            "pointsourceid" => Dimension::PointSourceId,
            "gpstime" => Dimension::GpsTime,
            "red" => Dimension::Red,
            "green" => Dimension::Green,
            "blue" => Dimension::Blue,
            "infrared" | "nir" => Dimension::Infrared,
            _ => return None,
        };
        Some(dimension)
    }
}

// "GpsTime", "gps_time" and "gps-time" all designate the same dimension.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '-'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_names_are_case_and_separator_insensitive() {
        assert_eq!(Dimension::from_standard_name("GpsTime"), Some(Dimension::GpsTime));
        assert_eq!(Dimension::from_standard_name("gps_time"), Some(Dimension::GpsTime));
        assert_eq!(
            Dimension::from_standard_name("Return-Number"),
            Some(Dimension::ReturnNumber)
        );
        assert_eq!(Dimension::from_standard_name("Z_ref"), None);
    }
}
