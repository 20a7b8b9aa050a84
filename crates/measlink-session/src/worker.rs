//! Background read loop.
//!
//! A [`Worker`] owns a byte source and a [`Pipeline`]. It reads, ingests and
//! repeats until the source ends, a read fails, or its [`AbortHandle`] is
//! set. The flag is checked between reads, so the source should have a read
//! timeout (serial ports do) to bound how long an abort takes.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::config::DEFAULT_READ_CHUNK_SIZE;
use crate::error::{Result, SessionError};
use crate::pipeline::{MeasurementUpdate, Pipeline, PipelineReport};

/// Shared stop flag for a running worker.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop at its next check.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a worker loop ended.
#[derive(Debug)]
pub enum StopReason {
    /// The abort flag was set.
    Aborted,
    /// The source reported end of stream.
    EndOfStream,
    /// A read or a propagated subscriber error ended the loop.
    Failed(SessionError),
}

/// What a finished worker hands back.
#[derive(Debug)]
pub struct WorkerExit {
    pub pipeline: Pipeline,
    pub reason: StopReason,
}

/// Read loop over any [`Read`] source.
pub struct Worker<R> {
    source: R,
    pipeline: Pipeline,
    abort: AbortHandle,
    chunk_size: usize,
    updates: Option<Sender<MeasurementUpdate>>,
}

impl<R: Read> Worker<R> {
    pub fn new(source: R, pipeline: Pipeline) -> Self {
        Self {
            source,
            pipeline,
            abort: AbortHandle::new(),
            chunk_size: DEFAULT_READ_CHUNK_SIZE,
            updates: None,
        }
    }

    /// Bytes requested per read (at least one).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Send every registry change, with the measurement's new state, to `sender`.
    pub fn with_updates(mut self, sender: Sender<MeasurementUpdate>) -> Self {
        self.updates = Some(sender);
        self
    }

    /// Handle that stops this worker.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run on the current thread until stopped.
    pub fn run(mut self) -> WorkerExit {
        let mut buf = vec![0u8; self.chunk_size];

        let reason = loop {
            if self.abort.is_aborted() {
                break StopReason::Aborted;
            }

            match self.source.read(&mut buf) {
                Ok(0) => break StopReason::EndOfStream,
                Ok(n) => match self.pipeline.ingest(&buf[..n]) {
                    Ok(report) => self.forward(&report),
                    Err(err) => {
                        // The chunk was applied in full; hosts still see it.
                        if let SessionError::Delivery { report, .. } = &err {
                            self.forward(report);
                        }
                        break StopReason::Failed(err);
                    }
                },
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                    ) =>
                {
                    continue;
                }
                Err(err) => break StopReason::Failed(err.into()),
            }
        };

        match &reason {
            StopReason::Failed(err) => warn!(error = %err, "worker stopped on error"),
            other => debug!(reason = ?other, "worker stopped"),
        }

        WorkerExit {
            pipeline: self.pipeline,
            reason,
        }
    }

    fn forward(&mut self, report: &PipelineReport) {
        if report.events.is_empty() {
            return;
        }
        let Some(sender) = &self.updates else {
            return;
        };

        for update in self.pipeline.updates(&report.events) {
            if sender.send(update).is_err() {
                debug!("update receiver dropped; no longer forwarding");
                self.updates = None;
                return;
            }
        }
    }
}

impl<R: Read + Send + 'static> Worker<R> {
    /// Run on a dedicated named thread.
    pub fn spawn(self) -> Result<WorkerHandle> {
        let abort = self.abort_handle();
        let thread = thread::Builder::new()
            .name("measlink-worker".to_string())
            .spawn(move || self.run())
            .map_err(SessionError::Spawn)?;
        info!("worker started");
        Ok(WorkerHandle { abort, thread })
    }
}

/// Start a worker with default settings on its own thread.
pub fn spawn_worker<R>(source: R, pipeline: Pipeline) -> Result<WorkerHandle>
where
    R: Read + Send + 'static,
{
    Worker::new(source, pipeline).spawn()
}

/// Owner-side handle to a worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    abort: AbortHandle,
    thread: JoinHandle<WorkerExit>,
}

impl WorkerHandle {
    /// Ask the worker to stop without waiting for it.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// True once the loop has ended for any reason.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Abort, wait for the thread, and take back the pipeline.
    pub fn stop(self) -> Result<WorkerExit> {
        self.abort.abort();
        self.join()
    }

    /// Wait for the thread to end on its own.
    pub fn join(self) -> Result<WorkerExit> {
        let exit = self
            .thread
            .join()
            .map_err(|_| SessionError::WorkerPanicked)?;
        info!("worker joined");
        Ok(exit)
    }
}
