//! Error types for pagelat-core.

use thiserror::Error;

/// Errors that can occur while setting up or running a measurement.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration describes no measurable region.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Opening the device or backing file failed.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Neither stat nor the block-size ioctl produced a usable size.
    #[error("cannot determine device size: stat and BLKGETSIZE64 both report zero")]
    SizeProbe,

    /// The device cannot hold the test region plus fill headroom.
    #[error("device too small: {size} bytes, need at least {needed}")]
    DeviceTooSmall {
        /// Actual device size in bytes.
        size: u64,
        /// Minimum required: four test regions.
        needed: u64,
    },

    /// Memory-mapping the test region failed.
    #[error("mmap failed: {0}")]
    Mmap(std::io::Error),

    /// `/proc/meminfo` was unreadable or had no `MemAvailable` line.
    #[error("cannot read available memory: {0}")]
    MemInfo(String),

    /// The `O_DIRECT` handle could not be opened.
    #[error("O_DIRECT open failed: {0}")]
    DirectOpen(std::io::Error),

    /// The page-aligned direct-read buffer could not be allocated.
    #[error("aligned buffer allocation failed: {0}")]
    BufferAlloc(std::io::Error),

    /// I/O error outside the lenient fill and read paths.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error skips only the direct-read phase rather than
    /// aborting the whole run.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::DirectOpen(_) | Error::BufferAlloc(_))
    }
}

/// Result type for measurement operations.
pub type Result<T> = std::result::Result<T, Error>;
