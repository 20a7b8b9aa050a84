//! Measurement telemetry over serial links.
//!
//! A device streams marker-delimited frames of `(id, value)` records over a
//! serial line. measlink reassembles those frames from arbitrary chunks,
//! decodes the records and keeps a registry of the latest value per id,
//! notifying subscribers of every change.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial port lifecycle and port discovery
//! - [`frame`]: Frame assembly, record decoding and encoding
//! - [`registry`]: Measurement registry and change notification
//! - [`session`]: Ingestion pipeline and background worker (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use measlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use measlink_frame::*;
}

/// Re-export registry types.
pub mod registry {
    pub use measlink_registry::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use measlink_session::*;
}
