//! Test support: disposable patterned backing files.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// A temp file where every byte of page `i` (4 KiB pages) holds the value
/// `i % 256`. Removed on drop.
pub(crate) struct TempDevice {
    pub(crate) path: PathBuf,
}

impl TempDevice {
    pub(crate) fn new(len: usize) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "pagelat-core-test-{}-{id}.bin",
            std::process::id()
        ));
        let data: Vec<u8> = (0..len).map(|i| (i / 4096) as u8).collect();
        let mut file = File::create(&path).unwrap();
        file.write_all(&data).unwrap();
        file.sync_all().unwrap();
        Self { path }
    }

    pub(crate) fn open(&self) -> File {
        File::open(&self.path).unwrap()
    }
}

impl Drop for TempDevice {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
