//! Per-page memory-access latency measurement.
//!
//! Measures how long one single-byte access takes under five page-cache and
//! page-table states: warm (resident + translation entry), minor fault
//! (resident, no entry), major fault (absent, RAM free), major fault under
//! eviction pressure (absent, cache full), and `O_DIRECT` reads that bypass
//! the cache entirely.
//!
//! The crate separates three concerns:
//! - forcing the kernel into a known state ([`cache`]),
//! - timing single accesses or whole passes ([`clock`]),
//! - reducing raw samples to robust figures ([`stats`]).
//!
//! [`experiment::Runner`] glues them together. The sequencing inside each
//! scenario is load-bearing; see the module docs before reordering
//! anything.

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod experiment;
pub mod probe;
pub mod region;
pub mod stats;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{CacheOps, KernelCache};
pub use config::RunConfig;
pub use error::{Error, Result};
pub use experiment::{ExperimentResult, Runner, Unit};
pub use stats::Summary;
