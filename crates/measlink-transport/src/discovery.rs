//! Serial port enumeration.
//!
//! Port discovery is owned by the host: it decides how often to refresh and
//! what to do with the list. [`PortWatcher`] only answers "did the list
//! change since last time?".

use tracing::debug;

use crate::error::{Result, TransportError};

/// Names of the serial ports currently present, sorted.
pub fn available_ports() -> Result<Vec<String>> {
    let mut names: Vec<String> = serialport::available_ports()
        .map_err(TransportError::Enumerate)?
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Tracks the port list across polls and reports only changes.
pub struct PortWatcher<F = fn() -> Result<Vec<String>>> {
    enumerate: F,
    last: Option<Vec<String>>,
}

impl PortWatcher {
    /// Watch the ports enumerated by the operating system.
    pub fn new() -> Self {
        Self::with_enumerator(available_ports)
    }
}

impl Default for PortWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> PortWatcher<F>
where
    F: FnMut() -> Result<Vec<String>>,
{
    /// Watch ports produced by a custom enumerator.
    pub fn with_enumerator(enumerate: F) -> Self {
        Self {
            enumerate,
            last: None,
        }
    }

    /// Enumerate again. Returns the new sorted list if it differs from the
    /// previous poll, `None` if nothing changed. The first poll always
    /// reports.
    pub fn poll(&mut self) -> Result<Option<Vec<String>>> {
        let mut ports = (self.enumerate)()?;
        ports.sort();

        if self.last.as_ref() == Some(&ports) {
            return Ok(None);
        }

        debug!(count = ports.len(), "serial port list changed");
        self.last = Some(ports.clone());
        Ok(Some(ports))
    }

    /// The list reported by the most recent change.
    pub fn current(&self) -> Option<&[String]> {
        self.last.as_deref()
    }
}
