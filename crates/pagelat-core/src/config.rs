//! Run configuration.

/// Configuration for one measurement run.
///
/// Passed by value into [`crate::experiment::Runner`] rather than baked in
/// as constants; tests shrink `samples` to keep their backing files small.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Number of pages sampled per scenario.
    pub samples: usize,
    /// Page size in bytes. Fault boundaries only line up when this matches
    /// the system page size.
    pub page_size: usize,
    /// Upper bound in bytes on the eviction scenario's cache fill; `None`
    /// fills up to the memory the kernel reports available.
    pub fill_limit: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            samples: 300,
            page_size: 4096,
            fill_limit: None,
        }
    }
}

impl RunConfig {
    /// Total bytes covered by the test region.
    #[must_use]
    pub fn region_bytes(&self) -> usize {
        self.samples * self.page_size
    }
}
