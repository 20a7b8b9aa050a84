//! `tokio_util::codec` adapter.
//!
//! [`FrameCodec`] plugs the assembler into `FramedRead`/`FramedWrite`.
//! Oversized or corrupt input never ends the stream: it is logged and
//! counted like in the synchronous path.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::assembler::{Diagnostics, FrameAssembler};
use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::FrameError;

/// Decodes frames from, and encodes payloads into, an async byte stream.
#[derive(Debug)]
pub struct FrameCodec {
    assembler: FrameAssembler,
    ready: VecDeque<Frame>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            assembler: FrameAssembler::with_config(config),
            ready: VecDeque::new(),
        }
    }

    /// Discard counters accumulated so far.
    pub fn diagnostics(&self) -> Diagnostics {
        self.assembler.totals()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if !src.is_empty() {
            let chunk = src.split();
            let report = self.assembler.ingest(&chunk);
            self.ready.extend(report.frames);
        }
        Ok(self.ready.pop_front())
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(payload.as_ref(), self.assembler.config(), dst)
    }
}
