//! The five measurement scenarios.
//!
//! Order is load-bearing. Every scenario re-forces exactly the cache and
//! translation state it claims to measure, and maps the test region fresh
//! so no translation entry survives from one scenario into the next. A
//! single misordered step (touching a page before invalidating it) silently
//! turns one scenario into another with no error anywhere.

use std::fs::File;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::sys::uio::pread;
use tracing::{debug, info, warn};

use crate::cache::CacheOps;
use crate::clock::time_once;
use crate::config::RunConfig;
use crate::probe::{available_memory, device_size};
use crate::region::{AnonBuf, PageMap};
use crate::stats::{reduce, Summary};
use crate::{Error, Result};

/// Display unit for a scenario's figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Nanoseconds, one decimal.
    Nanos,
    /// Microseconds, two decimals.
    Micros,
}

impl Unit {
    /// Short suffix for rendering (`"ns"` or `"us"`).
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Nanos => "ns",
            Unit::Micros => "us",
        }
    }
}

/// One completed scenario: label, raw samples, derived figures.
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    /// Human-readable scenario label.
    pub label: &'static str,
    /// Preferred display unit.
    pub unit: Unit,
    /// Per-page latency samples, nanoseconds.
    pub samples: Vec<f64>,
    /// Median and mean over `samples`.
    pub summary: Summary,
}

impl ExperimentResult {
    fn new(label: &'static str, unit: Unit, samples: Vec<f64>) -> Self {
        let summary = reduce(&samples);
        Self {
            label,
            unit,
            samples,
            summary,
        }
    }
}

/// Drives the five scenarios against one device.
///
/// Callers run the scenarios in order 1 through 5; each forces its own
/// cache state, but scenario 4 relies on the device being large enough to
/// fill the cache from a region the test pages never touch, which
/// [`Runner::new`] checks up front.
pub struct Runner<'a, C: CacheOps> {
    device: File,
    path: PathBuf,
    size: u64,
    config: RunConfig,
    cache: &'a C,
    sink: u8,
}

impl<'a, C: CacheOps> Runner<'a, C> {
    /// Open `path` read-only and verify it can hold four test regions.
    /// A configuration with a zero-byte region (no samples, or a zero page
    /// size) is rejected before the device is touched.
    pub fn new(path: &Path, cache: &'a C, config: RunConfig) -> Result<Self> {
        if config.region_bytes() == 0 {
            return Err(Error::InvalidConfig(
                "test region is empty: samples and page size must be nonzero".to_string(),
            ));
        }
        let device = File::open(path).map_err(|e| Error::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        let size = device_size(&device)?;
        let region = config.region_bytes() as u64;
        if size < region * 4 {
            return Err(Error::DeviceTooSmall {
                size,
                needed: region * 4,
            });
        }
        debug!(size, region, "device opened");
        Ok(Self {
            device,
            path: path.to_path_buf(),
            size,
            config,
            cache,
            sink: 0,
        })
    }

    /// Device size in bytes, as probed at open.
    #[must_use]
    pub fn device_size(&self) -> u64 {
        self.size
    }

    /// Anti-optimization byte accumulated from every page touched so far.
    #[must_use]
    pub fn sink(&self) -> u8 {
        self.sink
    }

    /// Scenario 1: pages resident, translation entries installed.
    ///
    /// A warm-up pass installs everything, then a second pass over the
    /// whole region is timed as one batch and divided by the page count.
    /// Per-access stamps at this timescale would mostly measure the clock
    /// read itself, so every sample carries the same per-page average and
    /// the median degenerates to that value. Reported in nanoseconds.
    pub fn warm_read(&mut self) -> Result<ExperimentResult> {
        let n = self.config.samples;
        let page = self.config.page_size;
        let map = PageMap::new(&self.device, self.config.region_bytes())?;

        for i in 0..n {
            self.touch(&map, i * page);
        }

        let ((), elapsed) = time_once(|| {
            for i in 0..n {
                self.touch(&map, i * page);
            }
        });
        let per_page = elapsed as f64 / n as f64;
        debug!(total_ns = elapsed, per_page_ns = per_page, "warm pass timed");

        Ok(ExperimentResult::new(
            "1. warm read (cached + PTE)",
            Unit::Nanos,
            vec![per_page; n],
        ))
    }

    /// Scenario 2: pages resident, no translation entries.
    ///
    /// The cache is primed by plain reads *before* the mapping exists; the
    /// fresh mapping then has no translation entries, so each first touch
    /// pays the fault-handling path with no device I/O underneath.
    pub fn minor_fault(&mut self) -> Result<ExperimentResult> {
        let region = self.config.region_bytes() as u64;
        let filled = self.cache.populate_range(&self.device, 0, region);
        debug!(filled, region, "cache primed before mapping");

        let map = PageMap::new(&self.device, self.config.region_bytes())?;
        let samples = self.timed_touches(&map);
        Ok(ExperimentResult::new(
            "2. minor fault (cached, no PTE)",
            Unit::Micros,
            samples,
        ))
    }

    /// Scenario 3: pages absent from the cache, RAM free.
    pub fn major_fault(&mut self) -> Result<ExperimentResult> {
        self.drop_caches_or_warn();
        let map = PageMap::new(&self.device, self.config.region_bytes())?;
        let samples = self.timed_faults(&map);
        Ok(ExperimentResult::new(
            "3. major fault (not cached, RAM free)",
            Unit::Micros,
            samples,
        ))
    }

    /// Scenario 4: pages absent, page cache full.
    ///
    /// Streams reads from the device region *after* the test pages until
    /// available memory is spent, so demand-paging the test region has to
    /// evict. The fill never touches a test page.
    pub fn major_fault_evicted(&mut self) -> Result<ExperimentResult> {
        self.drop_caches_or_warn();

        let region = self.config.region_bytes() as u64;
        let mut fill = available_memory()?;
        if let Some(limit) = self.config.fill_limit {
            fill = fill.min(limit);
        }
        if region + fill > self.size {
            fill = self.size - region;
        }
        info!("filling {:.1} GB of page cache from device", fill as f64 / 1e9);
        let filled = self.cache.populate_range(&self.device, region, fill);
        debug!(filled, requested = fill, "cache fill done");

        let map = PageMap::new(&self.device, self.config.region_bytes())?;
        let samples = self.timed_faults(&map);
        Ok(ExperimentResult::new(
            "4. major fault + eviction (cache full)",
            Unit::Micros,
            samples,
        ))
    }

    /// Scenario 5: positioned `O_DIRECT` reads, no cache, no faults.
    ///
    /// Failures opening the direct handle or allocating the aligned buffer
    /// are soft ([`Error::is_soft`]): callers skip this phase and keep the
    /// earlier results. A short or failed read still contributes its timing
    /// sample; only the sink update needs data to have arrived.
    pub fn direct_read(&mut self) -> Result<ExperimentResult> {
        let direct = std::fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECT)
            .open(&self.path)
            .map_err(Error::DirectOpen)?;
        let mut buf = AnonBuf::new(self.config.page_size)?;

        let n = self.config.samples;
        let page = self.config.page_size;
        let mut samples = Vec::with_capacity(n);
        for i in 0..n {
            let offset = (i * page) as libc::off_t;
            let (read, ns) = time_once(|| pread(&direct, buf.as_mut_slice(), offset));
            samples.push(ns as f64);
            match read {
                Ok(r) if r > 0 => self.sink = self.sink.wrapping_add(buf.first_byte()),
                Ok(_) => {}
                Err(e) => debug!("direct read at offset {offset} failed: {e}"),
            }
        }
        Ok(ExperimentResult::new(
            "5. pread O_DIRECT (no cache, no fault overhead)",
            Unit::Micros,
            samples,
        ))
    }

    #[inline]
    fn touch(&mut self, map: &PageMap, offset: usize) {
        self.sink = self
            .sink
            .wrapping_add(std::hint::black_box(map.touch(offset)));
    }

    /// Bracket one touch per page.
    fn timed_touches(&mut self, map: &PageMap) -> Vec<f64> {
        let n = self.config.samples;
        let page = self.config.page_size;
        let mut samples = Vec::with_capacity(n);
        for i in 0..n {
            let offset = i * page;
            let ((), ns) = time_once(|| self.touch(map, offset));
            samples.push(ns as f64);
        }
        samples
    }

    /// Bracket one touch per page, invalidating that page right before the
    /// access. Bulk invalidation up front would let readahead repopulate
    /// earlier pages while later ones are measured.
    fn timed_faults(&mut self, map: &PageMap) -> Vec<f64> {
        let n = self.config.samples;
        let page = self.config.page_size;
        let mut samples = Vec::with_capacity(n);
        let mut invalidate_failures = 0u32;
        for i in 0..n {
            let offset = i * page;
            if let Err(e) = self.cache.invalidate_range(map, offset, page) {
                invalidate_failures += 1;
                debug!(offset, error = %e, "invalidate failed");
            }
            let ((), ns) = time_once(|| self.touch(map, offset));
            samples.push(ns as f64);
        }
        if invalidate_failures > 0 {
            warn!(
                failed = invalidate_failures,
                "page invalidations failed; fault figures may run warm"
            );
        }
        samples
    }

    fn drop_caches_or_warn(&self) {
        if let Err(e) = self.cache.drop_all_caches() {
            warn!("cannot drop page cache ({e}); cold-cache figures will run warm, re-run as root");
        }
    }
}
