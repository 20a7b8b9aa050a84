use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::error::{Result, TransportError};

/// Baud rate the measurement devices run at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a single read waits before reporting a timeout.
///
/// This bounds how quickly a reader loop notices an abort request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Line settings used when opening a serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Read timeout applied to the opened port.
    pub read_timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl PortConfig {
    /// Same settings with a different baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

/// Parse a data bits count (5-8).
pub fn parse_data_bits(bits: u8) -> Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(invalid("data bits", other.to_string())),
    }
}

/// Parse a stop bits count (1 or 2).
pub fn parse_stop_bits(bits: u8) -> Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(invalid("stop bits", other.to_string())),
    }
}

/// Parse a parity name ("none", "odd", "even"), case-insensitive.
pub fn parse_parity(value: &str) -> Result<Parity> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(invalid("parity", value.to_string())),
    }
}

/// Parse a flow control name ("none", "software", "hardware"), case-insensitive.
pub fn parse_flow_control(value: &str) -> Result<FlowControl> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Ok(FlowControl::None),
        "software" | "xonxoff" => Ok(FlowControl::Software),
        "hardware" | "rtscts" => Ok(FlowControl::Hardware),
        _ => Err(invalid("flow control", value.to_string())),
    }
}

fn invalid(setting: &'static str, value: String) -> TransportError {
    TransportError::InvalidSetting { setting, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_115200_8n1() {
        let cfg = PortConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.flow_control, FlowControl::None);
    }

    #[test]
    fn with_baud_rate_keeps_line_settings() {
        let cfg = PortConfig::default().with_baud_rate(9600);
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.data_bits, DataBits::Eight);
    }

    #[test]
    fn parses_line_settings() {
        assert_eq!(parse_data_bits(7).unwrap(), DataBits::Seven);
        assert_eq!(parse_stop_bits(2).unwrap(), StopBits::Two);
        assert_eq!(parse_parity("EVEN").unwrap(), Parity::Even);
        assert_eq!(parse_flow_control("rtscts").unwrap(), FlowControl::Hardware);
    }

    #[test]
    fn rejects_unknown_settings() {
        assert!(matches!(
            parse_data_bits(9),
            Err(TransportError::InvalidSetting { setting: "data bits", .. })
        ));
        assert!(matches!(
            parse_stop_bits(3),
            Err(TransportError::InvalidSetting { .. })
        ));
        assert!(matches!(
            parse_parity("mark"),
            Err(TransportError::InvalidSetting { setting: "parity", .. })
        ));
        assert!(parse_flow_control("xon").is_err());
    }
}
