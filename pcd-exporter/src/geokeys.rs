use byteorder::{ByteOrder as _, LittleEndian};

use pcd_core::pointcloud::point::{EpsgCode, RawVlr};

pub const PROJECTION_USER_ID: &str = "LASF_Projection";
pub const GEO_KEY_DIRECTORY_RECORD_ID: u16 = 34735;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const RASTER_PIXEL_IS_AREA: u16 = 1;

pub fn is_projection_vlr(vlr: &RawVlr) -> bool {
    vlr.user_id == PROJECTION_USER_ID
}

/// GeoKeyDirectoryTag VLR declaring a projected coordinate system by EPSG code.
pub fn geo_key_directory(epsg: EpsgCode) -> RawVlr {
    let keys: [[u16; 4]; 3] = [
        [GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_PROJECTED],
        [GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA],
        [PROJECTED_CS_TYPE_KEY, 0, 1, epsg],
    ];

    // KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
    let values: Vec<u16> = [1, 1, 0, keys.len() as u16]
        .into_iter()
        .chain(keys.into_iter().flatten())
        .collect();
    let mut data = vec![0u8; values.len() * 2];
    LittleEndian::write_u16_into(&values, &mut data);

    RawVlr {
        user_id: PROJECTION_USER_ID.to_string(),
        record_id: GEO_KEY_DIRECTORY_RECORD_ID,
        description: format!("EPSG:{}", epsg),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_lists_projected_cs() {
        let vlr = geo_key_directory(2154);
        assert!(is_projection_vlr(&vlr));
        assert_eq!(vlr.data.len(), 32);

        let mut values = [0u16; 16];
        LittleEndian::read_u16_into(&vlr.data, &mut values);
        assert_eq!(&values[..4], &[1, 1, 0, 3]);
        assert_eq!(&values[12..], &[3072, 0, 1, 2154]);
    }
}
