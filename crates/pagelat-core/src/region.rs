//! Memory mappings with scoped lifetimes.
//!
//! Both mapping types unmap in `Drop`. An experiment creates its mapping,
//! measures, and lets scope end tear it down; a mapping that outlived its
//! experiment would leak installed translation entries into the next
//! scenario's supposedly cold state.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::ptr::null_mut;

use crate::{Error, Result};

/// Read-only `MAP_SHARED` view of the head of a file or block device.
///
/// A fresh mapping has no translation entries at all, even for pages that
/// are already resident in the page cache; the first touch of each page
/// takes at least a minor fault. The fault scenarios rely on that.
#[derive(Debug)]
pub struct PageMap {
    ptr: *mut u8,
    len: usize,
}

impl PageMap {
    /// Map `len` bytes of `file` starting at offset zero.
    pub fn new(file: &File, len: usize) -> Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(Error::Mmap(std::io::Error::last_os_error()));
        }
        Ok(Self {
            ptr: ptr.cast::<u8>(),
            len,
        })
    }

    /// Read one byte at `offset`, volatile so the access itself survives
    /// optimization.
    ///
    /// # Panics
    /// Panics in debug builds when `offset` is out of bounds.
    #[inline]
    #[must_use]
    pub fn touch(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.len);
        unsafe { std::ptr::read_volatile(self.ptr.add(offset)) }
    }

    /// Mapped length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping covers zero bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }
}

impl Drop for PageMap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.cast::<libc::c_void>(), self.len);
        }
    }
}

/// Page-aligned buffer backed by an anonymous mapping.
///
/// `O_DIRECT` requires the user buffer to be aligned to the device's
/// logical block size; a whole anonymous mapping is page-aligned by
/// construction and satisfies any smaller block size.
#[derive(Debug)]
pub struct AnonBuf {
    ptr: *mut u8,
    len: usize,
}

impl AnonBuf {
    /// Allocate `len` bytes of zeroed, page-aligned memory.
    pub fn new(len: usize) -> Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(Error::BufferAlloc(std::io::Error::last_os_error()));
        }
        Ok(Self {
            ptr: ptr.cast::<u8>(),
            len,
        })
    }

    /// View as a mutable byte slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// First byte of the buffer, read volatile.
    #[must_use]
    pub fn first_byte(&self) -> u8 {
        unsafe { std::ptr::read_volatile(self.ptr) }
    }
}

impl Drop for AnonBuf {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.cast::<libc::c_void>(), self.len);
        }
    }
}
