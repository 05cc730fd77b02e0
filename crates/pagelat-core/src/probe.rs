//! Device and system probes.

use std::fs::File;
use std::os::fd::AsRawFd;

use tracing::debug;

use crate::{Error, Result};

/// `_IOR` ioctl request encoding from `<asm-generic/ioctl.h>`.
const fn _ior(ty: libc::c_ulong, nr: libc::c_ulong, sz: usize) -> libc::c_ulong {
    (2 << 30) | ((sz as libc::c_ulong) << 16) | (ty << 8) | nr
}

/// `BLKGETSIZE64`: total size of a block device in bytes.
const BLKGETSIZE64: libc::c_ulong = _ior(0x12, 114, std::mem::size_of::<u64>());

/// Size of the device or backing file in bytes.
///
/// Regular files report through `stat`; raw block devices report zero
/// there, so fall back to the `BLKGETSIZE64` ioctl.
pub fn device_size(file: &File) -> Result<u64> {
    let meta_len = file.metadata()?.len();
    if meta_len > 0 {
        return Ok(meta_len);
    }

    let mut size: u64 = 0;
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64) };
    if rc == 0 && size > 0 {
        debug!(size, "size probed via BLKGETSIZE64");
        return Ok(size);
    }
    Err(Error::SizeProbe)
}

/// Bytes of memory the kernel reports as reclaimable for new allocations,
/// from the `MemAvailable` line of `/proc/meminfo`.
pub fn available_memory() -> Result<u64> {
    let text = std::fs::read_to_string("/proc/meminfo")
        .map_err(|e| Error::MemInfo(e.to_string()))?;
    parse_mem_available(&text).ok_or_else(|| Error::MemInfo("no MemAvailable line".to_string()))
}

/// Parse the `MemAvailable` value out of `/proc/meminfo` text, in bytes.
#[must_use]
pub fn parse_mem_available(text: &str) -> Option<u64> {
    for line in text.lines() {
        if line.starts_with("MemAvailable:") {
            let kb = line.split_whitespace().nth(1)?.parse::<u64>().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

/// Page size the kernel actually uses.
#[must_use]
pub fn system_page_size() -> usize {
    // sysconf cannot fail for _SC_PAGESIZE
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blkgetsize64_encoding_matches_linux_headers() {
        assert_eq!(BLKGETSIZE64, 0x8008_1272);
    }

    #[test]
    fn test_parse_mem_available() {
        let text = "MemTotal:       16272384 kB\n\
                    MemFree:         1009024 kB\n\
                    MemAvailable:    8101932 kB\n\
                    Buffers:          494976 kB\n";
        assert_eq!(parse_mem_available(text), Some(8_101_932 * 1024));
    }

    #[test]
    fn test_parse_mem_available_missing_line() {
        let text = "MemTotal:       16272384 kB\nMemFree: 1009024 kB\n";
        assert_eq!(parse_mem_available(text), None);
    }

    #[test]
    fn test_parse_mem_available_malformed_value() {
        let text = "MemAvailable:    lots kB\n";
        assert_eq!(parse_mem_available(text), None);
    }

    #[test]
    fn test_available_memory_on_this_host() {
        let avail = available_memory().unwrap();
        assert!(avail > 0);
    }

    #[test]
    fn test_device_size_of_regular_file_uses_metadata() {
        let file = File::open("/proc/self/exe").unwrap();
        let expected = file.metadata().unwrap().len();
        assert!(expected > 0);
        assert_eq!(device_size(&file).unwrap(), expected);
    }

    #[test]
    fn test_device_size_of_dev_null_fails() {
        let file = File::open("/dev/null").unwrap();
        assert!(matches!(device_size(&file), Err(Error::SizeProbe)));
    }

    #[test]
    fn test_system_page_size_is_sane() {
        let page = system_page_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
    }
}
