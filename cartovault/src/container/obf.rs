//! Header probe for binary map-data containers.
//!
//! The container is a protobuf stream. Only the leading scalar fields are
//! read here; the rest of the container belongs to the map-data parser.
//!
//! ```text
//! field 1  (varint)  format version      required
//! field 18 (varint)  creation timestamp  milliseconds since epoch
//! ```

use std::io::{self, Read};

use crate::resource::ObfMetadata;

const FIELD_VERSION: u64 = 1;
const FIELD_DATE_CREATED: u64 = 18;
const WIRE_VARINT: u64 = 0;

/// Upper bound on scalar header fields inspected before giving up.
const MAX_HEADER_FIELDS: usize = 16;

/// Read the container header from a stream.
pub fn read_header<R: Read>(reader: &mut R) -> Result<ObfMetadata, String> {
    let mut version = None;
    let mut timestamp = 0;

    for _ in 0..MAX_HEADER_FIELDS {
        let tag = match read_varint(reader) {
            Ok(Some(tag)) => tag,
            Ok(None) => break,
            Err(e) => return Err(e),
        };
        if tag & 0x7 != WIRE_VARINT {
            // First nested message: the scalar header is over.
            break;
        }
        let value = read_varint(reader)?.ok_or("truncated header field")?;
        match tag >> 3 {
            FIELD_VERSION => {
                version = Some(u32::try_from(value).map_err(|_| "version out of range")?)
            }
            FIELD_DATE_CREATED => timestamp = value,
            _ => {}
        }
        if version.is_some() && timestamp != 0 {
            break;
        }
    }

    match version {
        Some(version) => Ok(ObfMetadata { version, timestamp }),
        None => Err("missing container version field".to_string()),
    }
}

/// Encode a container header, used to produce fixtures and test data.
pub fn encode_header(metadata: &ObfMetadata) -> Vec<u8> {
    let mut out = Vec::new();
    write_varint(&mut out, FIELD_VERSION << 3 | WIRE_VARINT);
    write_varint(&mut out, u64::from(metadata.version));
    write_varint(&mut out, FIELD_DATE_CREATED << 3 | WIRE_VARINT);
    write_varint(&mut out, metadata.timestamp);
    out
}

/// Read a base-128 varint. Returns `Ok(None)` on a clean end of stream.
fn read_varint<R: Read>(reader: &mut R) -> Result<Option<u64>, String> {
    let mut value: u64 = 0;
    let mut shift = 0;
    let mut byte = [0u8; 1];
    loop {
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && shift == 0 => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err("truncated varint".to_string())
            }
            Err(e) => return Err(e.to_string()),
        }
        if shift >= 64 {
            return Err("varint overflow".to_string());
        }
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = ObfMetadata {
            version: 2,
            timestamp: 1_700_000_000_000,
        };
        let bytes = encode_header(&header);
        assert_eq!(read_header(&mut bytes.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_header_followed_by_payload() {
        let header = ObfMetadata {
            version: 2,
            timestamp: 5,
        };
        let mut bytes = encode_header(&header);
        // length-delimited field 2 with some payload
        bytes.extend_from_slice(&[0x12, 0x03, 0xaa, 0xbb, 0xcc]);
        assert_eq!(read_header(&mut bytes.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_empty_stream_fails() {
        let err = read_header(&mut [].as_slice()).unwrap_err();
        assert!(err.contains("missing container version"));
    }

    #[test]
    fn test_garbage_fails() {
        // Starts with a length-delimited field: no scalar header at all.
        let bytes = b"<?xml version=\"1.0\"?>";
        assert!(read_header(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn test_truncated_varint_fails() {
        let bytes = [0x08, 0x80];
        assert!(read_header(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn test_missing_timestamp_defaults_to_zero() {
        let bytes = [0x08, 0x02];
        let header = read_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.timestamp, 0);
    }
}
