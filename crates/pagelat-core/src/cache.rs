//! Page-cache state control.
//!
//! [`CacheOps`] is the privileged seam of the crate: the real
//! [`KernelCache`] talks to procfs and `madvise`, while tests substitute a
//! recording double to check call ordering without root.

use std::fs::File;
use std::os::unix::fs::FileExt;

use tracing::debug;

use crate::region::PageMap;
use crate::{Error, Result};

/// Chunk size for sequential cache-priming reads.
const FILL_CHUNK: usize = 1 << 20;

/// Cache-state operations the experiments need (allows for testing).
pub trait CacheOps {
    /// Drop the system-wide page cache.
    ///
    /// Writes `1` to `/proc/sys/vm/drop_caches`, which needs elevated
    /// privilege. Callers are expected to continue on failure; the
    /// cold-cache scenarios then measure a warmer cache than their labels
    /// claim. Idempotent.
    fn drop_all_caches(&self) -> Result<()>;

    /// Discard the translation entries (and, as their only reference, the
    /// cached data) for a byte range of `map`, leaving the rest of the
    /// cache untouched.
    fn invalidate_range(&self, map: &PageMap, offset: usize, len: usize) -> Result<()>;

    /// Prime the page cache for `len` bytes of `file` starting at `offset`,
    /// without creating any mapping.
    ///
    /// Stops early on EOF or error and returns the bytes actually read;
    /// callers treat a short count as a smaller-than-requested warm region,
    /// not a failure.
    fn populate_range(&self, file: &File, offset: u64, len: u64) -> u64 {
        sequential_fill(file, offset, len)
    }
}

/// Real procfs + `madvise` implementation.
#[derive(Debug, Default)]
pub struct KernelCache;

impl KernelCache {
    /// Create a kernel cache controller.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CacheOps for KernelCache {
    fn drop_all_caches(&self) -> Result<()> {
        std::fs::write("/proc/sys/vm/drop_caches", b"1\n")?;
        debug!("page cache dropped");
        Ok(())
    }

    fn invalidate_range(&self, map: &PageMap, offset: usize, len: usize) -> Result<()> {
        debug_assert!(offset + len <= map.len());
        let rc = unsafe {
            libc::madvise(
                map.as_ptr().add(offset).cast::<libc::c_void>(),
                len,
                libc::MADV_DONTNEED,
            )
        };
        if rc != 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

/// Sequential `read_at` loop through a scratch buffer.
fn sequential_fill(file: &File, offset: u64, len: u64) -> u64 {
    let mut buf = vec![0u8; FILL_CHUNK];
    let mut done: u64 = 0;
    while done < len {
        let want = FILL_CHUNK.min((len - done) as usize);
        match file.read_at(&mut buf[..want], offset + done) {
            Ok(0) => break,
            Ok(n) => done += n as u64,
            Err(e) => {
                debug!(error = %e, done, "cache fill stopped early");
                break;
            }
        }
    }
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PageMap;
    use crate::testutil::TempDevice;

    #[test]
    fn test_populate_reads_the_full_range() {
        let dev = TempDevice::new(64 * 1024);
        let file = dev.open();
        let cache = KernelCache::new();
        assert_eq!(cache.populate_range(&file, 0, 64 * 1024), 64 * 1024);
    }

    #[test]
    fn test_populate_stops_at_eof() {
        let dev = TempDevice::new(64 * 1024);
        let file = dev.open();
        let cache = KernelCache::new();
        assert_eq!(cache.populate_range(&file, 32 * 1024, 64 * 1024), 32 * 1024);
    }

    #[test]
    fn test_populate_beyond_eof_reads_nothing() {
        let dev = TempDevice::new(4096);
        let file = dev.open();
        let cache = KernelCache::new();
        assert_eq!(cache.populate_range(&file, 8192, 4096), 0);
    }

    #[test]
    fn test_invalidate_range_on_own_mapping_needs_no_privilege() {
        let dev = TempDevice::new(4 * 4096);
        let file = dev.open();
        let map = PageMap::new(&file, 4 * 4096).unwrap();
        let cache = KernelCache::new();

        for i in 0..4 {
            cache.invalidate_range(&map, i * 4096, 4096).unwrap();
        }
        // data comes back from the file on the next touch
        assert_eq!(map.touch(2 * 4096), 2);
    }

    #[test]
    fn test_drop_all_caches_is_consistent_across_calls() {
        let cache = KernelCache::new();
        let first = cache.drop_all_caches();
        let second = cache.drop_all_caches();
        // without privilege both fail the same way; with privilege both succeed
        assert_eq!(first.is_ok(), second.is_ok());
    }
}
