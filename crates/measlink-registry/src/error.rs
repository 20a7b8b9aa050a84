use crate::measurement::MeasurementId;
use crate::notifier::{ChangeEvent, SubscriberId};

/// Errors that can occur in registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No measurement with this id has been seen or declared.
    #[error("measurement {0} not found")]
    NotFound(MeasurementId),

    /// A subscriber failed while delivery policy is `Propagate`.
    #[error("subscriber {subscriber} failed on {event}: {message}")]
    Subscriber {
        subscriber: SubscriberId,
        event: ChangeEvent,
        message: String,
    },

    /// The definitions file could not be read.
    #[error("failed to load definitions: {0}")]
    LoadFailed(String),

    /// The definitions file is not valid JSON for the expected shape.
    #[error("definitions are not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The same id is declared twice in one definitions set.
    #[error("duplicate definition for measurement {0}")]
    DuplicateDefinition(MeasurementId),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
