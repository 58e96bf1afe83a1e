//! Restore progress events.

use std::path::PathBuf;

use crate::restore::{ArchiveId, ByteRange, JobId};

/// Coarse phase of a restore run, used for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    /// Resolving and downloading the catalogue archive.
    Catalogue,
    /// Submitting retrieval jobs and downloading their output.
    Archives,
    /// Nothing left to do.
    Done,
}

impl std::fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalogue => f.write_str("catalogue"),
            Self::Archives => f.write_str("archives"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Events emitted by the restore engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreEvent {
    /// The run moved to a new phase.
    PhaseChanged { phase: RestorePhase },

    /// A job is not ready yet; the engine will poll again.
    WaitingForJob { job_id: JobId },

    /// A retrieval job was submitted, or an earlier one reused.
    RetrievalAdmitted {
        archive_id: ArchiveId,
        range: ByteRange,
        job_id: JobId,
        reused: bool,
    },

    /// An archive was dropped from the run.
    ArchiveSkipped { archive_id: ArchiveId, reason: String },

    /// Every destination path of an archive is in place.
    ArchiveRestored {
        archive_id: ArchiveId,
        paths: Vec<PathBuf>,
    },

    /// Cumulative restore progress over the filtered catalogue.
    Progress { restored_bytes: u64, total_bytes: u64 },

    /// The throughput estimate changed.
    ThroughputUpdated { bytes_per_second: u64 },
}

impl RestoreEvent {
    /// Percent of bytes restored, when this is a progress event.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Progress {
                restored_bytes,
                total_bytes,
            } => {
                if *total_bytes == 0 {
                    return Some(100);
                }
                let pct = restored_bytes.saturating_mul(100) / total_bytes;
                Some(u8::try_from(pct.min(100)).unwrap_or(100))
            }
            _ => None,
        }
    }
}
