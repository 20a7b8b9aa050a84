/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The port could not be opened with the requested settings.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The port did not close cleanly (pending output could not be flushed).
    #[error("failed to close {port}: {source}")]
    Close {
        port: String,
        source: std::io::Error,
    },

    /// Enumerating the available ports failed.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// A port control operation (e.g. clearing buffers) failed.
    #[error("serial port control failed on {port}: {source}")]
    Control {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the open stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A port setting could not be parsed.
    #[error("invalid {setting}: {value}")]
    InvalidSetting {
        setting: &'static str,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;
