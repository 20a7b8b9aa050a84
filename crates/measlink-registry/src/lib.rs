//! Measurement registry with synchronous change notification.
//!
//! The registry owns every measurement seen during a session, keyed by the
//! 16-bit id the device assigns. Entries are created on first sight (or
//! declared up front with a name and unit), updated in place afterwards and
//! never removed. Each change is published to subscribers through a
//! [`ChangeNotifier`] before the write call returns.

pub mod config;
pub mod error;
pub mod measurement;
pub mod notifier;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use measurement::{Measurement, MeasurementDefinition, MeasurementId};
pub use notifier::{
    ChangeEvent, ChangeNotifier, DeliveryPolicy, HandlerError, HandlerResult, SubscriberId,
};
pub use registry::MeasurementRegistry;
