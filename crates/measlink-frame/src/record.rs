//! Measurement records carried in a frame payload.
//!
//! Payload layout:
//! ```text
//! ┌───────────┬──────────────────────┬─────┬──────────────────────┐
//! │ Count (1B)│ Record 0             │ ... │ Record Count-1       │
//! │           │ id (u16 LE) + value  │     │ id (u16 LE) + value  │
//! └───────────┴──────────────────────┴─────┴──────────────────────┘
//! ```
//!
//! The value width and convention is a deployment constant
//! ([`ValueEncoding`]), never inferred from the frame.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// Size of the record count header.
pub const COUNT_HEADER_SIZE: usize = 1;

/// Size of a record id.
pub const RECORD_ID_SIZE: usize = 2;

/// Most records a single frame can declare.
pub const MAX_RECORDS_PER_FRAME: usize = u8::MAX as usize;

/// How record values are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueEncoding {
    /// Little-endian IEEE-754 single precision.
    #[default]
    F32Le,
    /// Little-endian IEEE-754 double precision.
    F64Le,
    /// Little-endian signed 16-bit integer.
    I16Le,
    /// Little-endian unsigned 16-bit integer.
    U16Le,
    /// Little-endian signed 32-bit integer.
    I32Le,
    /// Little-endian unsigned 32-bit integer.
    U32Le,
}

impl ValueEncoding {
    /// Width of one encoded value in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::I16Le | Self::U16Le => 2,
            Self::F32Le | Self::I32Le | Self::U32Le => 4,
            Self::F64Le => 8,
        }
    }

    /// Width of one `(id, value)` record in bytes.
    pub const fn record_size(self) -> usize {
        RECORD_ID_SIZE + self.width()
    }

    /// Short name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32Le => "f32",
            Self::F64Le => "f64",
            Self::I16Le => "i16",
            Self::U16Le => "u16",
            Self::I32Le => "i32",
            Self::U32Le => "u32",
        }
    }

    fn get(self, src: &mut &[u8]) -> f64 {
        match self {
            Self::F32Le => f64::from(src.get_f32_le()),
            Self::F64Le => src.get_f64_le(),
            Self::I16Le => f64::from(src.get_i16_le()),
            Self::U16Le => f64::from(src.get_u16_le()),
            Self::I32Le => f64::from(src.get_i32_le()),
            Self::U32Le => f64::from(src.get_u32_le()),
        }
    }

    // Integer encodings saturate; fractions are truncated toward zero.
    fn put(self, value: f64, dst: &mut BytesMut) {
        match self {
            Self::F32Le => dst.put_f32_le(value as f32),
            Self::F64Le => dst.put_f64_le(value),
            Self::I16Le => dst.put_i16_le(value as i16),
            Self::U16Le => dst.put_u16_le(value as u16),
            Self::I32Le => dst.put_i32_le(value as i32),
            Self::U32Le => dst.put_u32_le(value as u32),
        }
    }
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueEncoding {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "f32" | "f32le" => Ok(Self::F32Le),
            "f64" | "f64le" => Ok(Self::F64Le),
            "i16" | "i16le" => Ok(Self::I16Le),
            "u16" | "u16le" => Ok(Self::U16Le),
            "i32" | "i32le" => Ok(Self::I32Le),
            "u32" | "u32le" => Ok(Self::U32Le),
            _ => Err(FrameError::UnknownEncoding(s.to_string())),
        }
    }
}

/// One measurement update decoded from a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub id: u16,
    pub value: f64,
}

impl Record {
    pub fn new(id: u16, value: f64) -> Self {
        Self { id, value }
    }
}

/// Decodes frame payloads into records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameParser {
    encoding: ValueEncoding,
}

impl FrameParser {
    /// Create a parser for a fixed value encoding.
    pub fn new(encoding: ValueEncoding) -> Self {
        Self { encoding }
    }

    /// The value encoding this parser decodes.
    pub fn encoding(&self) -> ValueEncoding {
        self.encoding
    }

    /// Decode a completed frame.
    pub fn parse(&self, frame: &Frame) -> Result<Vec<Record>> {
        self.parse_payload(frame.payload.as_ref())
    }

    /// Decode a raw payload.
    ///
    /// Fails with [`FrameError::MalformedPayload`] when the count header is
    /// missing or the body length does not match the declared count.
    pub fn parse_payload(&self, payload: &[u8]) -> Result<Vec<Record>> {
        let Some((&count, mut body)) = payload.split_first() else {
            return Err(FrameError::MalformedPayload(
                "missing record count header".to_string(),
            ));
        };

        let count = usize::from(count);
        let expected = count * self.encoding.record_size();
        if body.len() != expected {
            return Err(FrameError::MalformedPayload(format!(
                "declared {count} record(s) ({expected} bytes) but payload carries {} bytes",
                body.len()
            )));
        }

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let id = body.get_u16_le();
            let value = self.encoding.get(&mut body);
            records.push(Record { id, value });
        }
        Ok(records)
    }
}

/// Encode records into a payload (count header + records).
pub fn encode_records(
    records: &[Record],
    encoding: ValueEncoding,
    dst: &mut BytesMut,
) -> Result<()> {
    let count = u8::try_from(records.len()).map_err(|_| FrameError::TooManyRecords {
        count: records.len(),
        max: MAX_RECORDS_PER_FRAME,
    })?;

    dst.reserve(COUNT_HEADER_SIZE + records.len() * encoding.record_size());
    dst.put_u8(count);
    for record in records {
        dst.put_u16_le(record.id);
        encoding.put(record.value, dst);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn single_f32_record() {
        // count=1, id=5, value=3.0f32
        let payload = [0x01, 0x05, 0x00, 0x00, 0x00, 0x40, 0x40];
        let records = FrameParser::default().parse_payload(&payload).unwrap();
        assert_eq!(records, vec![Record::new(5, 3.0)]);
    }

    #[test]
    fn batched_records_keep_order() {
        let mut buf = BytesMut::new();
        let input = [Record::new(1, 1.5), Record::new(300, -2.25), Record::new(1, 4.0)];
        encode_records(&input, ValueEncoding::F32Le, &mut buf).unwrap();

        let frame = Frame::new(buf.freeze());
        let records = FrameParser::new(ValueEncoding::F32Le).parse(&frame).unwrap();
        assert_eq!(records, input.to_vec());
    }

    #[test]
    fn integer_encodings_decode_sign() {
        let mut buf = BytesMut::new();
        encode_records(&[Record::new(9, -42.0)], ValueEncoding::I32Le, &mut buf).unwrap();
        assert_eq!(buf.len(), 1 + 2 + 4);

        let records = FrameParser::new(ValueEncoding::I32Le)
            .parse_payload(&buf)
            .unwrap();
        assert_eq!(records, vec![Record::new(9, -42.0)]);
    }

    #[test]
    fn sixteen_bit_encoding_uses_narrow_records() {
        let payload = [0x02, 0x01, 0x00, 0xFF, 0xFF, 0x02, 0x00, 0x10, 0x00];
        let unsigned = FrameParser::new(ValueEncoding::U16Le)
            .parse_payload(&payload)
            .unwrap();
        let signed = FrameParser::new(ValueEncoding::I16Le)
            .parse_payload(&payload)
            .unwrap();

        assert_eq!(unsigned, vec![Record::new(1, 65535.0), Record::new(2, 16.0)]);
        assert_eq!(signed, vec![Record::new(1, -1.0), Record::new(2, 16.0)]);
    }

    #[test]
    fn zero_count_is_an_empty_update() {
        let records = FrameParser::default().parse_payload(&[0x00]).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn missing_header_is_malformed() {
        let err = FrameParser::default().parse_payload(&[]).unwrap_err();
        assert!(matches!(err, FrameError::MalformedPayload(_)));
    }

    #[test]
    fn count_larger_than_body_is_malformed() {
        let payload = [0x02, 0x05, 0x00, 0x00, 0x00, 0x40, 0x40];
        let err = FrameParser::default().parse_payload(&payload).unwrap_err();
        assert!(matches!(err, FrameError::MalformedPayload(_)));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let payload = [0x01, 0x05, 0x00, 0x00, 0x00, 0x40, 0x40, 0x99];
        let err = FrameParser::default().parse(&Frame::new(Bytes::copy_from_slice(&payload)));
        assert!(matches!(err, Err(FrameError::MalformedPayload(_))));
    }

    #[test]
    fn too_many_records_rejected() {
        let records = vec![Record::new(0, 0.0); MAX_RECORDS_PER_FRAME + 1];
        let mut buf = BytesMut::new();
        let err = encode_records(&records, ValueEncoding::F32Le, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::TooManyRecords { count: 256, .. }));
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!("f32".parse::<ValueEncoding>().unwrap(), ValueEncoding::F32Le);
        assert_eq!("I16LE".parse::<ValueEncoding>().unwrap(), ValueEncoding::I16Le);
        assert_eq!(ValueEncoding::U32Le.to_string(), "u32");
        assert!(matches!(
            "f16".parse::<ValueEncoding>(),
            Err(FrameError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn record_sizes() {
        assert_eq!(ValueEncoding::F32Le.record_size(), 6);
        assert_eq!(ValueEncoding::F64Le.record_size(), 10);
        assert_eq!(ValueEncoding::U16Le.record_size(), 4);
    }
}
