/// Errors that can occur while running a measurement session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] measlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] measlink_frame::FrameError),

    /// Registry or subscriber error.
    #[error("registry error: {0}")]
    Registry(#[from] measlink_registry::RegistryError),

    /// A subscriber failed under `DeliveryPolicy::Propagate`. Every record
    /// in the chunk was still applied; `report` describes them.
    #[error("subscriber failed: {source}")]
    Delivery {
        source: measlink_registry::RegistryError,
        report: Box<crate::pipeline::PipelineReport>,
    },

    /// Read from the byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked; its pipeline is lost.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, SessionError>;
