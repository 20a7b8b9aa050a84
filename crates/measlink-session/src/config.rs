use std::path::PathBuf;

use measlink_frame::{FrameConfig, ValueEncoding};
use measlink_registry::RegistryConfig;

/// Default read buffer size for the worker loop.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Everything needed to build a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Markers and payload limit.
    pub frame: FrameConfig,
    /// Width and type of record values.
    pub encoding: ValueEncoding,
    pub registry: RegistryConfig,
    /// Optional JSON file declaring names and units ahead of any frame.
    pub definitions: Option<PathBuf>,
    /// Bytes requested per read.
    pub read_chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            encoding: ValueEncoding::default(),
            registry: RegistryConfig::default(),
            definitions: None,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}
