//! Incremental frame assembly.
//!
//! [`FrameAssembler`] is fed raw chunks exactly as the transport delivers
//! them. Chunks need not line up with frames: one call may complete several
//! frames, finish the tail of one and start the next, or split a marker in
//! half. Assembly is defined byte by byte, so the frames produced never
//! depend on where the chunk boundaries fall.
//!
//! Policy:
//! - While idle, bytes before a start marker are discarded and counted.
//! - A start marker seen inside a frame abandons the partial payload and
//!   starts over (the latest start marker wins).
//! - A payload that can no longer fit in `max_payload_size` is abandoned,
//!   counted as too large, and the assembler goes back to idle.

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{Frame, FrameConfig, MARKER_SIZE};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Where the assembler is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// No partial frame; scanning for a start marker.
    Idle,
    /// Start marker seen; collecting payload bytes.
    Started,
    /// End marker matched; the frame is handed out before `ingest` returns.
    Ended,
}

/// Counters for input that did not end up in a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Bytes dropped: noise outside frames plus abandoned partial frames.
    pub discarded_bytes: u64,
    /// Frames abandoned for exceeding the maximum payload size.
    pub too_large: u64,
    /// Partial frames abandoned because a new start marker arrived.
    pub restarts: u64,
}

impl Diagnostics {
    /// Add another set of counters into this one.
    pub fn absorb(&mut self, other: &Diagnostics) {
        self.discarded_bytes = self.discarded_bytes.saturating_add(other.discarded_bytes);
        self.too_large = self.too_large.saturating_add(other.too_large);
        self.restarts = self.restarts.saturating_add(other.restarts);
    }

    /// True when nothing was discarded.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of feeding one chunk to the assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Frames completed by this chunk, in arrival order.
    pub frames: Vec<Frame>,
    /// What this chunk discarded.
    pub diagnostics: Diagnostics,
}

/// Start/end marker state machine.
pub struct FrameAssembler {
    config: FrameConfig,
    state: AssemblerState,
    /// Idle only: the previous byte was the first start-marker byte.
    start_pending: bool,
    payload: BytesMut,
    totals: Diagnostics,
}

impl FrameAssembler {
    /// Create an assembler with default markers and payload limit.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        let capacity = INITIAL_BUFFER_CAPACITY.min(config.max_payload_size + MARKER_SIZE);
        Self {
            config,
            state: AssemblerState::Idle,
            start_pending: false,
            payload: BytesMut::with_capacity(capacity),
            totals: Diagnostics::default(),
        }
    }

    /// Feed a chunk of raw bytes and collect every frame it completes.
    ///
    /// Partial frame state is carried into the next call.
    pub fn ingest(&mut self, bytes: &[u8]) -> IngestReport {
        let mut report = IngestReport::default();

        for &byte in bytes {
            if self.state == AssemblerState::Idle {
                self.seek_start(byte, &mut report.diagnostics);
            } else {
                self.collect(byte, &mut report.diagnostics);
            }

            if self.state == AssemblerState::Ended {
                report.frames.push(self.take_frame());
            }
        }

        if !report.frames.is_empty() {
            trace!(frames = report.frames.len(), "frames assembled");
        }
        self.totals.absorb(&report.diagnostics);
        report
    }

    /// Current state. `Ended` is never observed between calls.
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Number of payload bytes collected for the frame in progress.
    pub fn partial_len(&self) -> usize {
        match self.state {
            AssemblerState::Started => self.payload.len(),
            _ => 0,
        }
    }

    /// Counters accumulated over every call since creation.
    pub fn totals(&self) -> Diagnostics {
        self.totals
    }

    /// Drop any partial frame and return to idle. Counters are kept.
    pub fn reset(&mut self) {
        self.state = AssemblerState::Idle;
        self.start_pending = false;
        self.payload.clear();
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn seek_start(&mut self, byte: u8, diag: &mut Diagnostics) {
        let [first, second] = self.config.start_marker;

        if self.start_pending && byte == second {
            self.start_pending = false;
            self.state = AssemblerState::Started;
            self.payload.clear();
            return;
        }

        if self.start_pending {
            // The held byte was not the start of a marker after all.
            diag.discarded_bytes += 1;
        }

        if byte == first {
            self.start_pending = true;
        } else {
            self.start_pending = false;
            diag.discarded_bytes += 1;
        }
    }

    fn collect(&mut self, byte: u8, diag: &mut Diagnostics) {
        self.payload.put_u8(byte);

        if self.payload.ends_with(&self.config.end_marker) {
            self.state = AssemblerState::Ended;
            return;
        }

        if self.payload.ends_with(&self.config.start_marker) {
            let abandoned = self.payload.len() - MARKER_SIZE;
            debug!(abandoned, "start marker inside frame, restarting");
            diag.restarts += 1;
            diag.discarded_bytes += (MARKER_SIZE + abandoned) as u64;
            self.payload.clear();
            return;
        }

        // Even if the next byte completed the end marker, the payload would
        // already be longer than allowed.
        if self.payload.len() >= self.config.max_payload_size + MARKER_SIZE {
            warn!(
                collected = self.payload.len(),
                max = self.config.max_payload_size,
                "frame too large, dropping partial frame"
            );
            diag.too_large += 1;
            // The byte that crossed the limit may open the next frame.
            let held = self.payload.last() == Some(&self.config.start_marker[0]);
            let dropped = self.payload.len() - usize::from(held);
            diag.discarded_bytes += (MARKER_SIZE + dropped) as u64;
            self.payload.clear();
            self.state = AssemblerState::Idle;
            self.start_pending = held;
        }
    }

    fn take_frame(&mut self) -> Frame {
        let len = self.payload.len() - MARKER_SIZE;
        self.payload.truncate(len);
        self.state = AssemblerState::Idle;
        Frame::new(self.payload.split().freeze())
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAssembler")
            .field("state", &self.state)
            .field("partial_len", &self.partial_len())
            .field("totals", &self.totals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, END_MARKER, START_MARKER};

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &FrameConfig::default(), &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn payloads(report: &IngestReport) -> Vec<Vec<u8>> {
        report.frames.iter().map(|f| f.payload.to_vec()).collect()
    }

    #[test]
    fn single_frame_in_one_chunk() {
        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&wire(&[b"\x01abc"]));

        assert_eq!(payloads(&report), vec![b"\x01abc".to_vec()]);
        assert!(report.diagnostics.is_clean());
        assert_eq!(asm.state(), AssemblerState::Idle);
    }

    #[test]
    fn back_to_back_frames_in_one_chunk_keep_order() {
        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&wire(&[b"first", b"second", b"third"]));

        assert_eq!(
            payloads(&report),
            vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
        );
    }

    #[test]
    fn frame_split_mid_payload() {
        let bytes = wire(&[b"\x01hello"]);
        let mut asm = FrameAssembler::new();

        let first = asm.ingest(&bytes[..5]);
        assert!(first.frames.is_empty());
        assert_eq!(asm.state(), AssemblerState::Started);
        assert_eq!(asm.partial_len(), 3);

        let second = asm.ingest(&bytes[5..]);
        assert_eq!(payloads(&second), vec![b"\x01hello".to_vec()]);
    }

    #[test]
    fn markers_split_across_chunks() {
        let bytes = wire(&[b"xy"]);
        let mut asm = FrameAssembler::new();

        // FF | CC x y CB | FE
        assert!(asm.ingest(&bytes[..1]).frames.is_empty());
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert!(asm.ingest(&bytes[1..5]).frames.is_empty());
        assert_eq!(asm.state(), AssemblerState::Started);
        let report = asm.ingest(&bytes[5..]);

        assert_eq!(payloads(&report), vec![b"xy".to_vec()]);
        assert_eq!(asm.totals().discarded_bytes, 0);
    }

    #[test]
    fn tail_of_one_frame_and_head_of_next() {
        let bytes = wire(&[b"one", b"two"]);
        let mut asm = FrameAssembler::new();

        let split = 10; // inside the second frame's payload
        let first = asm.ingest(&bytes[..split]);
        assert_eq!(payloads(&first), vec![b"one".to_vec()]);
        assert_eq!(asm.state(), AssemblerState::Started);

        let second = asm.ingest(&bytes[split..]);
        assert_eq!(payloads(&second), vec![b"two".to_vec()]);
    }

    #[test]
    fn chunking_does_not_change_frames() {
        let mut bytes = vec![0x00, 0x13, 0xFF];
        bytes.extend(wire(&[b"\x01abcdef", b"", b"\x02zz"]));
        bytes.extend([0xFF, 0xFF, 0x42]);
        bytes.extend(wire(&[b"tail"]));

        let mut whole = FrameAssembler::new();
        let expected = payloads(&whole.ingest(&bytes));
        assert_eq!(expected.len(), 4);

        for chunk_size in 1..=bytes.len() {
            let mut asm = FrameAssembler::new();
            let mut got = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                got.extend(payloads(&asm.ingest(chunk)));
            }
            assert_eq!(got, expected, "chunk size {chunk_size}");
            assert_eq!(asm.totals(), whole.totals(), "chunk size {chunk_size}");
        }
    }

    #[test]
    fn noise_before_start_is_discarded_and_counted() {
        let mut bytes = vec![0x10, 0x20, 0xFF, 0x30];
        bytes.extend(wire(&[b"ok"]));

        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&bytes);

        assert_eq!(payloads(&report), vec![b"ok".to_vec()]);
        assert_eq!(report.diagnostics.discarded_bytes, 4);
    }

    #[test]
    fn repeated_first_marker_byte_still_syncs() {
        let mut bytes = vec![0xFF, 0xFF, 0xFF];
        bytes.extend(&START_MARKER[1..]);
        bytes.extend(b"p");
        bytes.extend(END_MARKER);

        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&bytes);

        assert_eq!(payloads(&report), vec![b"p".to_vec()]);
        assert_eq!(report.diagnostics.discarded_bytes, 2);
    }

    #[test]
    fn second_start_marker_wins() {
        let mut bytes = Vec::new();
        bytes.extend(START_MARKER);
        bytes.extend(b"stale");
        bytes.extend(wire(&[b"fresh"]));

        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&bytes);

        assert_eq!(payloads(&report), vec![b"fresh".to_vec()]);
        assert_eq!(report.diagnostics.restarts, 1);
        assert_eq!(report.diagnostics.discarded_bytes, 2 + 5);
    }

    #[test]
    fn oversized_frame_resets_and_recovers() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut asm = FrameAssembler::with_config(cfg);

        let mut bytes = Vec::new();
        bytes.extend(START_MARKER);
        bytes.extend(b"waytoolong");
        bytes.extend(END_MARKER);
        bytes.extend(wire(&[b"fit"]));

        let report = asm.ingest(&bytes);

        assert_eq!(payloads(&report), vec![b"fit".to_vec()]);
        assert_eq!(report.diagnostics.too_large, 1);
        assert_eq!(asm.state(), AssemblerState::Idle);
    }

    #[test]
    fn start_marker_on_overflow_byte_opens_next_frame() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut bytes = Vec::new();
        bytes.extend(START_MARKER);
        bytes.extend(b"abcde");
        bytes.extend(wire(&[b"ok"]));

        let mut asm = FrameAssembler::with_config(cfg.clone());
        let report = asm.ingest(&bytes);

        assert_eq!(payloads(&report), vec![b"ok".to_vec()]);
        assert_eq!(report.diagnostics.too_large, 1);
        assert_eq!(report.diagnostics.discarded_bytes, 2 + 5);

        for chunk_size in 1..=bytes.len() {
            let mut asm = FrameAssembler::with_config(cfg.clone());
            let mut got = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                got.extend(payloads(&asm.ingest(chunk)));
            }
            assert_eq!(got, vec![b"ok".to_vec()], "chunk size {chunk_size}");
        }
    }

    #[test]
    fn payload_at_exact_limit_is_accepted() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut asm = FrameAssembler::with_config(cfg);
        let report = asm.ingest(&wire(&[b"four"]));

        assert_eq!(payloads(&report), vec![b"four".to_vec()]);
        assert_eq!(report.diagnostics.too_large, 0);
    }

    #[test]
    fn oversized_frame_split_across_chunks_recovers() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut asm = FrameAssembler::with_config(cfg);

        let mut first = Vec::new();
        first.extend(START_MARKER);
        first.extend(b"abcdefg");
        let report = asm.ingest(&first);
        assert!(report.frames.is_empty());
        assert_eq!(report.diagnostics.too_large, 1);
        assert_eq!(asm.state(), AssemblerState::Idle);

        let mut second = b"hij".to_vec();
        second.extend(END_MARKER);
        second.extend(wire(&[b"next"]));
        let report = asm.ingest(&second);
        assert_eq!(payloads(&report), vec![b"next".to_vec()]);
    }

    #[test]
    fn empty_payload_frame() {
        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&wire(&[b""]));
        assert_eq!(payloads(&report), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn payload_ending_with_first_end_byte() {
        let mut asm = FrameAssembler::new();
        let report = asm.ingest(&wire(&[&[0x01, 0xCB]]));
        assert_eq!(payloads(&report), vec![vec![0x01, 0xCB]]);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut asm = FrameAssembler::new();
        asm.ingest(&[0xFF, 0xCC, 0x01, 0x02]);
        assert_eq!(asm.state(), AssemblerState::Started);

        asm.reset();
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert_eq!(asm.partial_len(), 0);

        // Bytes of the dropped frame are now noise.
        let report = asm.ingest(&[0x03, 0xCB, 0xFE]);
        assert!(report.frames.is_empty());
        assert_eq!(report.diagnostics.discarded_bytes, 3);
    }

    #[test]
    fn custom_markers() {
        let cfg = FrameConfig {
            start_marker: [0x02, 0x02],
            end_marker: [0x03, 0x03],
            ..FrameConfig::default()
        };
        let mut asm = FrameAssembler::with_config(cfg.clone());
        let mut buf = BytesMut::new();
        encode_frame(b"abc", &cfg, &mut buf).unwrap();

        let report = asm.ingest(&buf);
        assert_eq!(payloads(&report), vec![b"abc".to_vec()]);
    }

    #[test]
    fn totals_accumulate_across_calls() {
        let mut asm = FrameAssembler::new();
        asm.ingest(&[0x01, 0x02]);
        asm.ingest(&[0x03]);
        assert_eq!(asm.totals().discarded_bytes, 3);
    }
}
