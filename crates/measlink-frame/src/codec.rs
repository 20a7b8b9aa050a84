use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Size of each frame marker.
pub const MARKER_SIZE: usize = 2;

/// Start marker: `0xFF 0xCC`.
pub const START_MARKER: [u8; MARKER_SIZE] = [0xFF, 0xCC];

/// End marker: `0xCB 0xFE`.
pub const END_MARKER: [u8; MARKER_SIZE] = [0xCB, 0xFE];

/// Default maximum payload size: 1 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// A completed frame, markers stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The bytes between the start and end marker.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (markers + payload).
    pub fn wire_size(&self) -> usize {
        2 * MARKER_SIZE + self.payload.len()
    }
}

/// Configuration for frame assembly and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Marker that opens a frame. Default: `0xFF 0xCC`.
    pub start_marker: [u8; MARKER_SIZE],
    /// Marker that closes a frame. Default: `0xCB 0xFE`.
    pub end_marker: [u8; MARKER_SIZE],
    /// Maximum payload size in bytes. Default: 1 KiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            start_marker: START_MARKER,
            end_marker: END_MARKER,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────────────────────────┬────────────┐
/// │ Start (2B) │ Payload                 │ End (2B)   │
/// │ 0xFF 0xCC  │ count (1B) + records    │ 0xCB 0xFE  │
/// └────────────┴─────────────────────────┴────────────┘
/// ```
///
/// The protocol has no escaping, so a payload that would make the receiver
/// see a marker early is rejected with [`FrameError::MarkerInPayload`].
pub fn encode_frame(payload: &[u8], config: &FrameConfig, dst: &mut BytesMut) -> Result<()> {
    if payload.len() > config.max_payload_size {
        return Err(FrameError::FrameTooLarge {
            size: payload.len(),
            max: config.max_payload_size,
        });
    }
    if let Some(offset) = find_marker(payload, config) {
        return Err(FrameError::MarkerInPayload { offset });
    }

    dst.reserve(2 * MARKER_SIZE + payload.len());
    dst.put_slice(&config.start_marker);
    dst.put_slice(payload);
    dst.put_slice(&config.end_marker);
    Ok(())
}

fn find_marker(payload: &[u8], config: &FrameConfig) -> Option<usize> {
    let is_marker = |pair: &[u8]| pair == config.start_marker || pair == config.end_marker;

    if let Some(offset) = payload.windows(MARKER_SIZE).position(is_marker) {
        return Some(offset);
    }

    // The last payload byte and the first end-marker byte are seen together.
    match payload.last() {
        Some(&last) if is_marker(&[last, config.end_marker[0]]) => Some(payload.len() - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_wraps_payload_in_markers() {
        let mut buf = BytesMut::new();
        encode_frame(&[0x01, 0x05, 0x00], &FrameConfig::default(), &mut buf).unwrap();

        assert_eq!(
            buf.as_ref(),
            &[0xFF, 0xCC, 0x01, 0x05, 0x00, 0xCB, 0xFE][..]
        );
    }

    #[test]
    fn encode_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &FrameConfig::default(), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0xFF, 0xCC, 0xCB, 0xFE][..]);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        let result = encode_frame(&[0u8; 5], &cfg, &mut buf);

        assert!(matches!(
            result,
            Err(FrameError::FrameTooLarge { size: 5, max: 4 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_embedded_end_marker() {
        let mut buf = BytesMut::new();
        let result = encode_frame(&[0x01, 0xCB, 0xFE, 0x00], &FrameConfig::default(), &mut buf);
        assert!(matches!(result, Err(FrameError::MarkerInPayload { offset: 1 })));
    }

    #[test]
    fn encode_rejects_embedded_start_marker() {
        let mut buf = BytesMut::new();
        let result = encode_frame(&[0x00, 0x00, 0xFF, 0xCC], &FrameConfig::default(), &mut buf);
        assert!(matches!(result, Err(FrameError::MarkerInPayload { offset: 2 })));
    }

    #[test]
    fn encode_rejects_marker_formed_with_trailer() {
        let cfg = FrameConfig {
            start_marker: [0xAA, 0x01],
            end_marker: [0x01, 0x55],
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        // 0xAA followed by the end marker's first byte reads as a start marker.
        let result = encode_frame(&[0x00, 0xAA], &cfg, &mut buf);
        assert!(matches!(result, Err(FrameError::MarkerInPayload { offset: 1 })));
    }

    #[test]
    fn frame_wire_size() {
        let frame = Frame::new(Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), 4 + 4);
    }
}
