//! Layout of the LAS Extra Bytes VLR (`LASF_Spec`, record 4).

use super::point::RawVlr;

pub const EXTRA_BYTES_USER_ID: &str = "LASF_Spec";
pub const EXTRA_BYTES_RECORD_ID: u16 = 4;
pub const DESCRIPTOR_LEN: usize = 192;
pub const NAME_OFFSET: usize = 4;
pub const NAME_LEN: usize = 32;

pub const DATA_TYPE_UNDOCUMENTED: u8 = 0;
pub const DATA_TYPE_DOUBLE: u8 = 10;

const OPTION_SCALE: u8 = 0b0000_1000;
const OPTION_OFFSET: u8 = 0b0001_0000;

pub fn is_extra_bytes_vlr(vlr: &RawVlr) -> bool {
    vlr.user_id == EXTRA_BYTES_USER_ID && vlr.record_id == EXTRA_BYTES_RECORD_ID
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraBytesDescriptor {
    pub data_type: u8,
    /// Bit field, or the byte count of an undocumented descriptor.
    pub options: u8,
    pub name: String,
}

impl ExtraBytesDescriptor {
    /// Decodes one `DESCRIPTOR_LEN` record.
    pub fn from_bytes(raw: &[u8; DESCRIPTOR_LEN]) -> Self {
        let name = &raw[NAME_OFFSET..NAME_OFFSET + NAME_LEN];
        let end = name.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        ExtraBytesDescriptor {
            data_type: raw[2],
            options: raw[3],
            name: String::from_utf8_lossy(&name[..end]).into_owned(),
        }
    }

    /// Number of per-point bytes covered by the descriptor.
    pub fn size(&self) -> usize {
        match self.data_type {
            DATA_TYPE_UNDOCUMENTED => self.options as usize,
            1..=30 => {
                let scalar = [1, 1, 2, 2, 4, 4, 8, 8, 4, 8][((self.data_type - 1) % 10) as usize];
                scalar * ((self.data_type as usize - 1) / 10 + 1)
            }
            _ => 0,
        }
    }

    /// An f64 stored as-is, without scale or offset.
    pub fn is_plain_double(&self) -> bool {
        self.data_type == DATA_TYPE_DOUBLE && self.options & (OPTION_SCALE | OPTION_OFFSET) == 0
    }
}

/// Descriptors of a VLR payload, in record order. A trailing partial record
/// is ignored.
pub fn parse_descriptors(data: &[u8]) -> Vec<ExtraBytesDescriptor> {
    data.chunks_exact(DESCRIPTOR_LEN)
        .filter_map(|chunk| <&[u8; DESCRIPTOR_LEN]>::try_from(chunk).ok())
        .map(ExtraBytesDescriptor::from_bytes)
        .collect()
}
