//! Serial ingestion pipeline for measlink.
//!
//! This is the layer a host application talks to. [`Pipeline`] turns raw
//! bytes into registry updates, [`Worker`] runs that on a background thread
//! over any byte source, and [`SerialSession`] ties a worker to a serial port.

#[cfg(feature = "async")]
pub mod async_worker;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod worker;

#[cfg(feature = "async")]
pub use async_worker::run_async;
pub use config::{SessionConfig, DEFAULT_READ_CHUNK_SIZE};
pub use error::{Result, SessionError};
pub use pipeline::{MeasurementUpdate, Pipeline, PipelineReport, PipelineStats};
pub use session::SerialSession;
pub use worker::{spawn_worker, AbortHandle, StopReason, Worker, WorkerExit, WorkerHandle};
