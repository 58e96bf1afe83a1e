//! Core domain types for restores.
//!
//! Pure data types with no I/O dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an archive stored in a vault.
///
/// Archives are content-addressed: two catalogue entries sharing one archive id
/// are byte-identical files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveId(String);

impl ArchiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchiveId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArchiveId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a remote job (inventory or archive retrieval).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An inclusive byte range `start..=end` within an archive or a job output.
///
/// Rendered as `start-end`, the notation vault job descriptors use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Range of `len` bytes beginning at `start`. Returns `None` for `len == 0`.
    #[must_use]
    pub const fn with_len(start: u64, len: u64) -> Option<Self> {
        if len == 0 {
            return None;
        }
        match start.checked_add(len - 1) {
            Some(end) => Some(Self { start, end }),
            None => None,
        }
    }

    /// Range covering a whole archive of `size` bytes.
    #[must_use]
    pub const fn whole(size: u64) -> Option<Self> {
        Self::with_len(0, size)
    }

    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last byte index, inclusive.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// One past the last byte index.
    #[must_use]
    pub const fn end_exclusive(&self) -> u64 {
        self.end + 1
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a range holds at least one byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for ByteRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid byte range '{s}': expected start-end"))?;
        let start: u64 = start
            .parse()
            .map_err(|_| format!("invalid byte range start in '{s}'"))?;
        let end: u64 = end
            .parse()
            .map_err(|_| format!("invalid byte range end in '{s}'"))?;
        if end < start {
            return Err(format!("invalid byte range '{s}': end before start"));
        }
        Ok(Self { start, end })
    }
}

/// One distinct archive yielded by the catalogue, in first-insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub archive_id: ArchiveId,
    pub size: u64,
}

impl ArchiveEntry {
    pub fn new(archive_id: impl Into<ArchiveId>, size: u64) -> Self {
        Self {
            archive_id: archive_id.into(),
            size,
        }
    }
}

/// An archive together with every destination path it restores to.
///
/// All paths hold byte-identical copies. `size == 0` means every path is an
/// empty file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub archive_id: ArchiveId,
    pub destination_paths: Vec<String>,
    pub size: u64,
}

/// One file row of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueFile {
    pub path: String,
    pub archive_id: ArchiveId,
    pub size: u64,
}

/// Glob-style path filters (`*` matches any run, `?` matches one character).
///
/// An empty filter set matches every path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilters(Vec<String>);

impl PathFilters {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty())
                .collect(),
        )
    }

    /// Filters matching everything.
    #[must_use]
    pub const fn all() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check a path against the filters with glob semantics.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|p| glob_match(p, path))
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

/// Which of the two vaults of a restore a job or request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultRole {
    /// The vault holding the archived file contents.
    Data,
    /// The side vault holding the catalogue (mapping) archive.
    Catalogue,
}

impl fmt::Display for VaultRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => f.write_str("data"),
            Self::Catalogue => f.write_str("catalogue"),
        }
    }
}

/// A vault name tagged with its role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultTarget {
    pub name: String,
    pub role: VaultRole,
}

/// Suffix naming the catalogue vault that accompanies a data vault.
pub const CATALOGUE_VAULT_SUFFIX: &str = "_mapping";

/// The data vault and its catalogue vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPair {
    pub data: VaultTarget,
    pub catalogue: VaultTarget,
}

impl VaultPair {
    /// Pair for data vault `name`; the catalogue vault is `<name>_mapping`.
    pub fn for_data_vault(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            catalogue: VaultTarget {
                name: format!("{name}{CATALOGUE_VAULT_SUFFIX}"),
                role: VaultRole::Catalogue,
            },
            data: VaultTarget {
                name,
                role: VaultRole::Data,
            },
        }
    }

    /// Every data vault in `vault_names` whose catalogue vault is also present.
    #[must_use]
    pub fn discover(vault_names: &[String]) -> Vec<Self> {
        vault_names
            .iter()
            .filter(|name| !name.ends_with(CATALOGUE_VAULT_SUFFIX))
            .filter(|name| {
                let catalogue = format!("{name}{CATALOGUE_VAULT_SUFFIX}");
                vault_names.iter().any(|n| *n == catalogue)
            })
            .map(|name| Self::for_data_vault(name.clone()))
            .collect()
    }

    #[must_use]
    pub fn targets(&self) -> [&VaultTarget; 2] {
        [&self.data, &self.catalogue]
    }
}

/// Kind of work a remote job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// Lists the archives of a vault.
    Inventory,
    /// Stages a byte range of one archive for download.
    ArchiveRetrieval,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inventory => f.write_str("inventory"),
            Self::ArchiveRetrieval => f.write_str("archive-retrieval"),
        }
    }
}

/// Remote job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether the job's id is still worth reusing.
    #[must_use]
    pub const fn is_reusable(self) -> bool {
        matches!(self, Self::InProgress | Self::Succeeded)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("in-progress"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A job as listed by the vault, tagged with the role of the vault it was listed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub id: JobId,
    pub role: VaultRole,
    pub action: JobAction,
    pub status: JobStatus,
    pub archive_id: Option<ArchiveId>,
    pub byte_range: Option<ByteRange>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of a job listing. `marker` continues the listing when present.
#[derive(Debug, Clone, Default)]
pub struct JobPage {
    pub jobs: Vec<JobDescriptor>,
    pub marker: Option<String>,
}

/// The account's data retrieval policy, which decides whether retrievals cost money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalPolicy {
    /// Retrievals are capped at the free allowance.
    FreeTier,
    /// Retrievals are capped at a rate and may be billed.
    BytesPerHour(u64),
    /// No cap; retrievals may be billed.
    Unlimited,
}

impl RetrievalPolicy {
    #[must_use]
    pub const fn may_incur_cost(self) -> bool {
        !matches!(self, Self::FreeTier)
    }
}
