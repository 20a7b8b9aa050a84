use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::config::PortConfig;
use crate::error::{Result, TransportError};

/// An open serial port. Implements `Read` and `Write`.
///
/// This is the byte source the rest of measlink consumes. Reads honour the
/// timeout from [`PortConfig::read_timeout`] and surface it as an
/// `ErrorKind::TimedOut` I/O error.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialStream {
    /// Open a serial port by name with the given line settings.
    pub fn open(name: &str, config: &PortConfig) -> Result<Self> {
        let port = serialport::new(name, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: name.to_string(),
                source,
            })?;

        info!(port = name, baud_rate = config.baud_rate, "opened serial port");

        Ok(Self {
            port,
            name: name.to_string(),
        })
    }

    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        let name = port.name().unwrap_or_else(|| "<unnamed>".to_string());
        Self { port, name }
    }

    /// The port name this stream was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discard any bytes received but not yet read.
    ///
    /// Used right after opening so a session starts on fresh data.
    pub fn clear_input(&self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|source| TransportError::Control {
                port: self.name.clone(),
                source,
            })?;
        debug!(port = %self.name, "cleared pending input");
        Ok(())
    }

    /// Change the read timeout of the open port.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|source| TransportError::Control {
                port: self.name.clone(),
                source,
            })
    }

    /// Try to clone this stream (opens a second handle to the same device).
    pub fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .try_clone()
            .map_err(|source| TransportError::Control {
                port: self.name.clone(),
                source,
            })?;
        Ok(Self {
            port,
            name: self.name.clone(),
        })
    }

    /// Flush pending output and close the port.
    pub fn close(mut self) -> Result<()> {
        loop {
            match self.port.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(TransportError::Close {
                        port: self.name.clone(),
                        source,
                    })
                }
            }
        }
        info!(port = %self.name, "closed serial port");
        Ok(())
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.name)
            .finish()
    }
}
