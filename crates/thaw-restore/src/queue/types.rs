//! Queue item types for the restore engine.

use thaw_core::{ArchiveId, ByteRange, JobId};

/// The archive currently being requested from the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalInFlight {
    pub archive_id: ArchiveId,
    pub total_size: u64,
    /// First byte not yet covered by a retrieval job.
    pub next_byte_index_to_retrieve: u64,
}

impl RetrievalInFlight {
    pub const fn new(archive_id: ArchiveId, total_size: u64, start: u64) -> Self {
        Self {
            archive_id,
            total_size,
            next_byte_index_to_retrieve: start,
        }
    }

    pub const fn remaining(&self) -> u64 {
        self.total_size - self.next_byte_index_to_retrieve
    }

    pub const fn is_complete(&self) -> bool {
        self.next_byte_index_to_retrieve >= self.total_size
    }

    /// Record that `range` has been requested.
    pub fn advance(&mut self, range: ByteRange) {
        debug_assert_eq!(range.start(), self.next_byte_index_to_retrieve);
        self.next_byte_index_to_retrieve = range.end_exclusive();
    }
}

/// A submitted retrieval job whose output is not fully written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInFlight {
    pub job_id: JobId,
    pub archive_id: ArchiveId,
    /// Range of the archive the job stages.
    pub range: ByteRange,
    pub archive_total_size: u64,
    /// Bytes of the job output already written to the staging file.
    pub written: u64,
    /// The vault reported the job complete.
    pub ready: bool,
}

impl DownloadInFlight {
    pub const fn new(job_id: JobId, archive_id: ArchiveId, range: ByteRange, total: u64) -> Self {
        Self {
            job_id,
            archive_id,
            range,
            archive_total_size: total,
            written: 0,
            ready: false,
        }
    }

    /// Bytes the job yields.
    pub const fn retrieved_size(&self) -> u64 {
        self.range.len()
    }

    /// Absolute staging-file offset of the next byte to write.
    pub const fn next_byte_index_to_write(&self) -> u64 {
        self.range.start() + self.written
    }

    pub const fn remaining(&self) -> u64 {
        self.retrieved_size() - self.written
    }

    pub const fn is_complete(&self) -> bool {
        self.written >= self.retrieved_size()
    }

    /// Next sub-range of the job output to fetch, capped at `max` bytes.
    pub fn next_output_range(&self, max: u64) -> Option<ByteRange> {
        ByteRange::with_len(self.written, self.remaining().min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = thaw_core::MIB;

    #[test]
    fn test_retrieval_advances_to_completion() {
        let mut retrieval = RetrievalInFlight::new(ArchiveId::new("A"), 3 * MIB, 0);
        retrieval.advance(ByteRange::with_len(0, 2 * MIB).unwrap());
        assert_eq!(retrieval.remaining(), MIB);
        assert!(!retrieval.is_complete());
        retrieval.advance(ByteRange::with_len(2 * MIB, MIB).unwrap());
        assert!(retrieval.is_complete());
    }

    #[test]
    fn test_download_offsets_are_absolute() {
        let range = ByteRange::with_len(2 * MIB, MIB).unwrap();
        let mut download = DownloadInFlight::new(JobId::new("j"), ArchiveId::new("A"), range, 4 * MIB);
        assert_eq!(download.next_byte_index_to_write(), 2 * MIB);

        let first = download.next_output_range(1000).unwrap();
        assert_eq!(first.start(), 0);
        assert_eq!(first.len(), 1000);

        download.written = 1000;
        assert_eq!(download.next_byte_index_to_write(), 2 * MIB + 1000);
        let rest = download.next_output_range(u64::MAX).unwrap();
        assert_eq!(rest.start(), 1000);
        assert_eq!(rest.end(), MIB - 1);

        download.written = MIB;
        assert!(download.is_complete());
        assert!(download.next_output_range(10).is_none());
    }
}
