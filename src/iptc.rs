//! Minimal IPTC-IIM reader for JPEG files.
//!
//! Feeds the bundle-mode metadata dump: extracts the common IPTC Record 2
//! datasets from a JPEG's APP13 marker (Photoshop 8BIM resource 0x0404)
//! and returns them as a name → value map ready to be written as front
//! matter. Repeatable datasets (keywords) are joined with `", "`.
//!
//! Pure std: no external dependencies. Any parse failure yields an empty
//! map; missing metadata is expected noise, never an error.

use std::collections::BTreeMap;
use std::path::Path;

/// Record 2 datasets worth dumping, mapped to stable field names.
const DATASET_NAMES: &[(u8, &str)] = &[
    (5, "object_name"),
    (25, "keywords"),
    (55, "date_created"),
    (80, "byline"),
    (90, "city"),
    (101, "country"),
    (105, "headline"),
    (110, "credit"),
    (116, "copyright_notice"),
    (120, "caption"),
];

/// Read IPTC fields from a JPEG file. Non-JPEG extensions and unreadable
/// or metadata-free files return an empty map.
pub fn read_iptc_fields(path: &Path) -> BTreeMap<String, String> {
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    if !is_jpeg {
        return BTreeMap::new();
    }
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => return BTreeMap::new(),
    };
    match app13_iptc_block(&bytes) {
        Some(block) => collect_record2_fields(block),
        None => BTreeMap::new(),
    }
}

/// Walk raw IPTC-IIM bytes collecting Record 2 datasets into named fields.
///
/// IIM dataset layout:
///   Byte 0:    0x1C (tag marker)
///   Byte 1:    record number (we want 0x02)
///   Byte 2:    dataset number
///   Bytes 3-4: data length (big-endian u16)
///   Bytes 5+:  UTF-8/ASCII value
fn collect_record2_fields(data: &[u8]) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;
        if pos + length > data.len() {
            break;
        }

        if record == 2 {
            let value = String::from_utf8_lossy(&data[pos..pos + length])
                .trim()
                .to_string();
            if !value.is_empty()
                && let Some((_, name)) = DATASET_NAMES.iter().find(|(n, _)| *n == dataset)
            {
                fields
                    .entry(name.to_string())
                    .and_modify(|existing| {
                        // Repeatable dataset (keywords): accumulate
                        existing.push_str(", ");
                        existing.push_str(&value);
                    })
                    .or_insert(value);
            }
        }

        pos += length;
    }

    fields
}

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Locate the raw IPTC-IIM bytes inside a JPEG's APP13 segment, scanning
/// JPEG markers until the image data (SOS) starts.
fn app13_iptc_block(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 4 < data.len() {
        if data[pos] == 0xFF && data[pos + 1] == 0xED {
            let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            let seg_start = pos + 4;
            let seg_end = (pos + 2 + seg_len).min(data.len());
            if let Some(iptc) = iptc_resource(&data[seg_start..seg_end]) {
                return Some(iptc);
            }
        }

        if data[pos] == 0xFF && pos + 3 < data.len() && data[pos + 1] != 0x00 {
            let marker = data[pos + 1];
            if marker == 0xDA {
                break;
            }
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                pos += 2;
            } else {
                let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + len;
            }
        } else {
            pos += 1;
        }
    }
    None
}

/// Pull the 0x0404 resource out of a Photoshop 8BIM block.
///
/// Each resource: "8BIM" (4) + resource id (2) + pascal string (padded to
/// even) + data length (4) + data (padded to even).
fn iptc_resource(segment: &[u8]) -> Option<&[u8]> {
    let data = segment
        .strip_prefix(PHOTOSHOP_HEADER)
        .unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        if pos + 2 > data.len() {
            break;
        }
        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        if pos >= data.len() {
            break;
        }
        let pascal_len = data[pos] as usize;
        pos += 1 + pascal_len + ((1 + pascal_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + res_len > data.len() {
            break;
        }
        if resource_id == IPTC_RESOURCE_ID {
            return Some(&data[pos..pos + res_len]);
        }
        pos += res_len + (res_len % 2);
    }

    None
}
