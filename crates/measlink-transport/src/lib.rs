//! Serial transport for measlink.
//!
//! This is the lowest layer of measlink. It opens and closes a serial
//! device with the settings the measurement protocol expects (115200 8N1,
//! no flow control by default) and enumerates the ports available on the
//! host. Everything above this crate only sees [`SerialStream`] as a
//! `Read + Write` byte source.

pub mod config;
pub mod discovery;
pub mod error;
pub mod serial;

pub use config::{
    parse_data_bits, parse_flow_control, parse_parity, parse_stop_bits, PortConfig,
    DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT,
};
pub use discovery::{available_ports, PortWatcher};
pub use error::{Result, TransportError};
pub use serial::SerialStream;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};
