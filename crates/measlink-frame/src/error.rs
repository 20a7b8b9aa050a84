/// Errors that can occur while assembling, decoding or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The payload does not match the record layout it declares.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A payload to be sent contains a frame marker and would be split by the receiver.
    #[error("payload contains a frame marker at offset {offset}")]
    MarkerInPayload { offset: usize },

    /// More records than a single frame can declare.
    #[error("too many records for one frame ({count}, max {max})")]
    TooManyRecords { count: usize, max: usize },

    /// The value encoding name is not recognised.
    #[error("unknown value encoding: {0}")]
    UnknownEncoding(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
