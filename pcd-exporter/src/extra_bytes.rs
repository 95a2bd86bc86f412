//! Extra Bytes VLR (`LASF_Spec`, record 4) descriptors.

use byteorder::{ByteOrder as _, LittleEndian};

pub use pcd_core::pointcloud::extra_bytes::{
    is_extra_bytes_vlr, DESCRIPTOR_LEN, EXTRA_BYTES_RECORD_ID, EXTRA_BYTES_USER_ID,
};
use pcd_core::pointcloud::extra_bytes::{
    parse_descriptors, DATA_TYPE_DOUBLE, DATA_TYPE_UNDOCUMENTED, NAME_LEN, NAME_OFFSET,
};

use crate::error::ExportError;

const DESCRIPTION_OFFSET: usize = 160;

/// Number of per-point bytes covered by a descriptor payload.
pub fn documented_len(data: &[u8]) -> usize {
    parse_descriptors(data).iter().map(|d| d.size()).sum()
}

/// Names of the described dimensions, in record order.
pub fn descriptor_names(data: &[u8]) -> Vec<String> {
    parse_descriptors(data).into_iter().map(|d| d.name).collect()
}

fn undocumented_descriptor(len: u8) -> [u8; DESCRIPTOR_LEN] {
    let mut descriptor = [0u8; DESCRIPTOR_LEN];
    descriptor[2] = DATA_TYPE_UNDOCUMENTED;
    descriptor[3] = len;
    descriptor
}

fn double_descriptor(name: &str) -> Result<[u8; DESCRIPTOR_LEN], ExportError> {
    if name.is_empty() || name.len() > NAME_LEN || !name.is_ascii() {
        return Err(ExportError::InvalidDimensionName(name.to_string()));
    }

    let mut descriptor = [0u8; DESCRIPTOR_LEN];
    descriptor[2] = DATA_TYPE_DOUBLE;
    descriptor[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name.as_bytes());
    descriptor[DESCRIPTION_OFFSET..DESCRIPTION_OFFSET + name.len()]
        .copy_from_slice(name.as_bytes());
    Ok(descriptor)
}

/// Builds the descriptor payload for a point record carrying `raw_len` bytes
/// already present in the source file followed by one f64 per name.
///
/// `existing` is the source file's own descriptor payload, if any. Bytes it
/// does not cover are declared as undocumented so that the new descriptors
/// stay aligned with their values.
pub fn build_descriptors(
    existing: Option<&[u8]>,
    raw_len: usize,
    names: &[String],
) -> Result<Vec<u8>, ExportError> {
    let mut data = Vec::with_capacity(DESCRIPTOR_LEN * (names.len() + 1));

    let mut documented = 0;
    if let Some(existing) = existing {
        if existing.len() % DESCRIPTOR_LEN != 0 || documented_len(existing) > raw_len {
            log::warn!("Ignoring malformed extra bytes descriptors");
        } else {
            documented = documented_len(existing);
            data.extend_from_slice(existing);
        }
    }
    if documented == 0 {
        data.clear();
    }

    let mut remaining = raw_len - documented;
    while remaining > 0 {
        let len = remaining.min(u8::MAX as usize);
        data.extend_from_slice(&undocumented_descriptor(len as u8));
        remaining -= len;
    }

    for name in names {
        data.extend_from_slice(&double_descriptor(name)?);
    }
    Ok(data)
}

/// Appends the little-endian encoding of `values` to a point's raw extra bytes.
pub fn encode_values(raw: &[u8], raw_len: usize, values: &[f64], count: usize) -> Vec<u8> {
    let mut bytes = raw.to_vec();
    bytes.resize(raw_len, 0);

    let mut buffer = vec![0u8; count * 8];
    let mut values = values.to_vec();
    values.resize(count, 0.0);
    LittleEndian::write_f64_into(&values, &mut buffer);
    bytes.extend_from_slice(&buffer);
    bytes
}

/// Reads the f64 stored at `index` after `raw_len` leading bytes.
#[cfg(test)]
pub(crate) fn decode_value(bytes: &[u8], raw_len: usize, index: usize) -> Option<f64> {
    let start = raw_len + index * 8;
    bytes.get(start..start + 8).map(LittleEndian::read_f64)
}
