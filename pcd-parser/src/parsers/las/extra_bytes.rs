use std::ops::Range;

use byteorder::{ByteOrder as _, LittleEndian};

use pcd_core::pointcloud::{
    dimension::{normalize_name, Dimension},
    extra_bytes::{is_extra_bytes_vlr, parse_descriptors, DESCRIPTOR_LEN},
    point::RawVlr,
};

/// Separates the plain f64 dimensions described by the Extra Bytes VLR from
/// the bytes that stay opaque.
#[derive(Debug, Default, PartialEq)]
pub struct ExtraBytesSplit {
    /// Name and byte offset of each decoded dimension.
    pub dimensions: Vec<(String, usize)>,
    raw_ranges: Vec<Range<usize>>,
    raw_descriptors: Vec<u8>,
}

impl ExtraBytesSplit {
    /// `None` when the file describes no decodable dimension.
    pub fn new(vlrs: &[RawVlr], extra_bytes: u16) -> Option<Self> {
        let data = &vlrs.iter().find(|vlr| is_extra_bytes_vlr(vlr))?.data;
        let descriptors = parse_descriptors(data);
        let documented: usize = descriptors.iter().map(|d| d.size()).sum();
        if data.len() % DESCRIPTOR_LEN != 0 || documented > extra_bytes as usize {
            log::warn!("Extra bytes descriptors do not match the point record, keeping them raw");
            return None;
        }

        let mut split = Self::default();
        let mut offset = 0;
        for (descriptor, raw) in descriptors.iter().zip(data.chunks_exact(DESCRIPTOR_LEN)) {
            let size = descriptor.size();
            let normalized = normalize_name(&descriptor.name);
            let decodable = descriptor.is_plain_double()
                && !descriptor.name.is_empty()
                && Dimension::from_standard_name(&descriptor.name).is_none()
                && !split
                    .dimensions
                    .iter()
                    .any(|(name, _)| normalize_name(name) == normalized);

            if decodable {
                split.dimensions.push((descriptor.name.clone(), offset));
            } else {
                split.raw_ranges.push(offset..offset + size);
                split.raw_descriptors.extend_from_slice(raw);
            }
            offset += size;
        }

        if split.dimensions.is_empty() {
            return None;
        }
        if offset < extra_bytes as usize {
            split.raw_ranges.push(offset..extra_bytes as usize);
        }
        Some(split)
    }

    pub fn names(&self) -> Vec<String> {
        self.dimensions.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Opaque bytes left per point.
    pub fn raw_len(&self) -> u16 {
        self.raw_ranges.iter().map(|r| r.len()).sum::<usize>() as u16
    }

    /// Rewrites the Extra Bytes VLR so that it describes the opaque bytes only.
    pub fn apply_to_vlrs(&self, vlrs: &mut Vec<RawVlr>) {
        if self.raw_descriptors.is_empty() {
            vlrs.retain(|vlr| !is_extra_bytes_vlr(vlr));
        } else if let Some(vlr) = vlrs.iter_mut().find(|vlr| is_extra_bytes_vlr(vlr)) {
            vlr.data = self.raw_descriptors.clone();
        }
    }

    /// Splits a point's extra bytes into opaque bytes and decoded values.
    pub fn split(&self, bytes: &[u8]) -> (Vec<u8>, Vec<f64>) {
        let raw = self
            .raw_ranges
            .iter()
            .flat_map(|range| bytes.get(range.clone()).unwrap_or_default())
            .copied()
            .collect();
        let values = self
            .dimensions
            .iter()
            .map(|(_, offset)| {
                bytes
                    .get(*offset..offset + 8)
                    .map(LittleEndian::read_f64)
                    .unwrap_or(0.0)
            })
            .collect();
        (raw, values)
    }
}
