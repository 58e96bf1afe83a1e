//! Restore orchestration engine for thaw.
//!
//! A restore walks the catalogue, requests every archive from the data vault
//! in range-bounded retrieval jobs, waits for the vault to stage them and
//! streams their output to disk. Byte-identical files share one archive and
//! are downloaded once.
//!
//! Two budgets derived from the measured throughput keep the work in flight
//! bounded:
//!
//! - the retrieval budget caps bytes requested but not yet downloaded, so a
//!   staged job is never left to expire on the vault
//! - the pass budget caps bytes downloaded between two admission rounds
//!
//! Every job id the engine learns is persisted in a per-vault run cache, and
//! partial downloads stay in a staging directory under the destination. An
//! interrupted run rerun with `keep_files` resumes where it stopped.

#![deny(unused_crate_dependencies)]

mod admission;
mod cache;
mod catalogue_fetch;
mod context;
mod destination;
mod engine;
mod fanout;
mod polling;
mod pump;
mod queue;
mod reconcile;
mod service;
#[cfg(test)]
mod test_support;
mod throughput;

pub use admission::{AdmissionOutcome, plan_chunk};
pub use cache::{CachedArchiveJob, RunCache};
pub use engine::RestoreSummary;
pub use fanout::STAGING_DIR;
pub use reconcile::{JobIndex, reconcile};
pub use service::{RestoreDeps, RestoreService, RunConfig};
pub use throughput::{PassTimer, ThroughputEstimator};

// Used by the integration tests only
#[cfg(test)]
use thaw_db as _;
#[cfg(test)]
use thaw_vault as _;
#[cfg(test)]
use tokio_test as _;
