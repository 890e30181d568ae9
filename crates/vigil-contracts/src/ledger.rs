//! Ledger entry and chain verification report types.

use serde::{Deserialize, Serialize};

/// The `prev_hash` sentinel carried by the first entry of a fresh ledger.
///
/// 64 hex zeros, the all-zero value of a SHA-256 digest.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One immutable record in the hash-chained ledger.
///
/// `hash` commits to `time`, `event`, `status` and `prev_hash` (in that
/// order). `sequence` orders entries but is deliberately outside the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position assigned at append time. Strictly increasing, never reused.
    pub sequence: u64,
    /// Creation time, second precision, rendered with an explicit UTC offset
    /// (e.g. `2026-10-18 14:03:11 +05:30`).
    pub time: String,
    /// Caller-supplied event classification (e.g. `ENCLOSURE_OPENED`).
    pub event: String,
    /// Caller-supplied status label (e.g. `LOCKED`, `SAFE`).
    pub status: String,
    /// Lowercase hex SHA-256 of the chained fields.
    pub hash: String,
    /// `hash` of the preceding entry, or [`GENESIS_HASH`].
    pub prev_hash: String,
}

impl LedgerEntry {
    /// True if this entry links to the genesis sentinel.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash == GENESIS_HASH
    }
}

/// What the oldest retained entry represents for verification purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainAnchor {
    /// Nothing has been appended.
    Empty,
    /// The oldest retained entry is the true genesis (links to the sentinel).
    Genesis,
    /// Older entries were evicted; verification starts at `first_sequence`
    /// and cannot vouch for anything before it.
    Truncated { first_sequence: u64 },
}

/// Result of walking the chain oldest to newest.
///
/// A broken chain is reported here as data. Nothing in VIGIL repairs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// True only if every retained entry recomputes and links correctly.
    pub valid: bool,
    /// Index (0 = oldest retained) of the first entry that fails either check.
    pub first_broken_index: Option<usize>,
    /// Number of entries examined.
    pub entries_checked: usize,
    /// Where verification was anchored.
    pub anchor: ChainAnchor,
}
