use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::assembler::{Diagnostics, FrameAssembler};
use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Pull-style front end for [`FrameAssembler`]: callers always get complete
/// frames. A read timeout or would-block from the stream is returned as
/// [`FrameError::Io`] without losing the partial frame, so the caller can
/// check for cancellation and call again.
pub struct FrameReader<T> {
    inner: T,
    assembler: FrameAssembler,
    ready: VecDeque<Frame>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: FrameAssembler::with_config(config),
            ready: VecDeque::new(),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let report = self.assembler.ingest(&chunk[..read]);
            self.ready.extend(report.frames);
        }
    }

    /// Discard counters accumulated so far.
    pub fn diagnostics(&self) -> Diagnostics {
        self.assembler.totals()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Frames already assembled but not yet returned are dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
