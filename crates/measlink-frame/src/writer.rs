use std::io::{ErrorKind, Write};
use std::time::Duration;

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::record::{encode_records, Record, ValueEncoding};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Consecutive `WouldBlock`/`TimedOut` results tolerated before giving up.
const MAX_STALLED_ATTEMPTS: u32 = 20;
const STALL_BACKOFF: Duration = Duration::from_millis(5);

/// Writes complete frames to any `Write` stream.
///
/// This is the device side of the protocol; measlink uses it to produce
/// captures and to drive loopback tests.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    payload: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            payload: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.payload.as_ref())
    }

    /// Encode records into one frame and send it.
    pub fn send_records(&mut self, records: &[Record], encoding: ValueEncoding) -> Result<()> {
        let mut payload = std::mem::take(&mut self.payload);
        payload.clear();
        let result = encode_records(records, encoding, &mut payload)
            .and_then(|()| self.send(payload.as_ref()));
        self.payload = payload;
        result
    }

    /// Wrap a payload in markers and send it.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, &self.config, &mut self.buf)?;

        let mut offset = 0usize;
        let mut stalled = 0u32;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    offset += n;
                    stalled = 0;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_stall(err.kind()) && stalled < MAX_STALLED_ATTEMPTS => {
                    stalled += 1;
                    std::thread::sleep(STALL_BACKOFF);
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        let mut stalled = 0u32;
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_stall(err.kind()) && stalled < MAX_STALLED_ATTEMPTS => {
                    stalled += 1;
                    std::thread::sleep(STALL_BACKOFF);
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Serial ports report a full output buffer as `TimedOut`, sockets as `WouldBlock`.
fn is_stall(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::assembler::FrameAssembler;
    use crate::record::FrameParser;

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn send_records_produces_parseable_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer
            .send_records(&[Record::new(5, 3.0)], ValueEncoding::F32Le)
            .unwrap();

        assert_eq!(
            written(writer),
            vec![0xFF, 0xCC, 0x01, 0x05, 0x00, 0x00, 0x00, 0x40, 0x40, 0xCB, 0xFE]
        );
    }

    #[test]
    fn written_frames_reassemble() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer
            .send_records(&[Record::new(1, 1.0)], ValueEncoding::F32Le)
            .unwrap();
        writer
            .send_records(&[Record::new(2, 2.0), Record::new(3, 3.0)], ValueEncoding::F32Le)
            .unwrap();

        let report = FrameAssembler::new().ingest(&written(writer));
        let parser = FrameParser::default();
        let records: Vec<Record> = report
            .frames
            .iter()
            .flat_map(|f| parser.parse(f).unwrap())
            .collect();

        assert_eq!(
            records,
            vec![Record::new(1, 1.0), Record::new(2, 2.0), Record::new(3, 3.0)]
        );
    }

    #[test]
    fn write_frame_method() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.write_frame(&Frame::new(&b"abc"[..])).unwrap();
        assert_eq!(
            written(writer),
            vec![0xFF, 0xCC, b'a', b'b', b'c', 0xCB, 0xFE]
        );
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::new()), cfg);

        let err = writer.send(b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = FrameWriter::new(Flaky {
            write_failed: false,
            flush_failed: false,
            kind: ErrorKind::Interrupted,
            data: Vec::new(),
        });
        writer.send(b"retry").unwrap();
        assert_eq!(writer.into_inner().data.len(), 2 + 5 + 2);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let mut writer = FrameWriter::new(Flaky {
            write_failed: false,
            flush_failed: false,
            kind: ErrorKind::WouldBlock,
            data: Vec::new(),
        });
        writer.send(b"retry").unwrap();
        assert!(!writer.into_inner().data.is_empty());
    }

    #[test]
    fn retries_timed_out_write_and_flush() {
        let mut writer = FrameWriter::new(Flaky {
            write_failed: false,
            flush_failed: false,
            kind: ErrorKind::TimedOut,
            data: Vec::new(),
        });
        writer.send(b"slow").unwrap();
        assert_eq!(writer.into_inner().data.len(), 2 + 4 + 2);
    }

    #[test]
    fn gives_up_on_a_port_that_never_drains() {
        let mut writer = FrameWriter::new(StuckWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::TimedOut));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    struct Flaky {
        write_failed: bool,
        flush_failed: bool,
        kind: ErrorKind,
        data: Vec<u8>,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.write_failed {
                self.write_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_failed {
                self.flush_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            Ok(())
        }
    }

    struct StuckWriter;

    impl Write for StuckWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::TimedOut))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
