//! Marker-delimited frame assembly and measurement record decoding.
//!
//! Devices stream frames over a serial line as:
//! - A 2-byte start marker (`0xFF 0xCC`)
//! - A payload: a 1-byte record count followed by fixed-width
//!   `(id, value)` records
//! - A 2-byte end marker (`0xCB 0xFE`)
//!
//! [`FrameAssembler`] turns arbitrarily chunked input into whole frames and
//! [`FrameParser`] turns a frame into `(id, value)` records.

pub mod assembler;
#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod record;
pub mod writer;

pub use assembler::{AssemblerState, Diagnostics, FrameAssembler, IngestReport};
#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
pub use codec::{
    encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, END_MARKER, MARKER_SIZE, START_MARKER,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use record::{encode_records, FrameParser, Record, ValueEncoding, MAX_RECORDS_PER_FRAME};
pub use writer::FrameWriter;
