use std::sync::mpsc::Sender;

use measlink_transport::{PortConfig, SerialStream};
use tracing::info;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::pipeline::{MeasurementUpdate, Pipeline};
use crate::worker::{AbortHandle, Worker, WorkerExit, WorkerHandle};

/// An open serial port with a worker feeding its pipeline.
///
/// The port is opened, input that arrived before the open is discarded, and
/// the worker starts reading immediately. `close` stops the worker before
/// the port is released.
#[derive(Debug)]
pub struct SerialSession {
    port: SerialStream,
    worker: WorkerHandle,
}

impl SerialSession {
    /// Open `port_name` and start a worker built from `config`.
    pub fn open(
        port_name: &str,
        port_config: &PortConfig,
        config: &SessionConfig,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(config)?;
        Self::start(port_name, port_config, config, pipeline, None)
    }

    /// Like [`open`](Self::open), forwarding every registry change to `updates`.
    pub fn open_with_updates(
        port_name: &str,
        port_config: &PortConfig,
        config: &SessionConfig,
        updates: Sender<MeasurementUpdate>,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(config)?;
        Self::start(port_name, port_config, config, pipeline, Some(updates))
    }

    /// Open with a pipeline the caller has already prepared (subscribers,
    /// declared measurements).
    pub fn open_with_pipeline(
        port_name: &str,
        port_config: &PortConfig,
        config: &SessionConfig,
        pipeline: Pipeline,
    ) -> Result<Self> {
        Self::start(port_name, port_config, config, pipeline, None)
    }

    fn start(
        port_name: &str,
        port_config: &PortConfig,
        config: &SessionConfig,
        pipeline: Pipeline,
        updates: Option<Sender<MeasurementUpdate>>,
    ) -> Result<Self> {
        let port = SerialStream::open(port_name, port_config)?;
        port.clear_input()?;
        let source = port.try_clone()?;

        let mut worker = Worker::new(source, pipeline).with_chunk_size(config.read_chunk_size);
        if let Some(updates) = updates {
            worker = worker.with_updates(updates);
        }
        let worker = worker.spawn()?;

        info!(port = port_name, baud = port_config.baud_rate, "session opened");
        Ok(Self { port, worker })
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Handle that stops the worker from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.worker.abort_handle()
    }

    /// True once the worker has ended (port error, or aborted).
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Stop the worker, then close the port.
    pub fn close(self) -> Result<WorkerExit> {
        let name = self.port.name().to_string();
        let exit = self.worker.stop()?;
        self.port.close()?;
        info!(port = %name, "session closed");
        Ok(exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[test]
    fn open_missing_port_fails() {
        let err = SerialSession::open(
            "/dev/measlink-does-not-exist",
            &PortConfig::default(),
            &SessionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn definitions_are_loaded_before_the_port_opens() {
        let config = SessionConfig {
            definitions: Some("/nonexistent/measlink/defs.json".into()),
            ..SessionConfig::default()
        };
        let err =
            SerialSession::open("/dev/measlink-does-not-exist", &PortConfig::default(), &config)
                .unwrap_err();
        assert!(matches!(err, SessionError::Registry(_)));
    }
}
