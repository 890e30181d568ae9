//! Hash-chain primitives: hashing, timestamp rendering, and verification.
//!
//! Hash input layout (UTF-8 bytes, concatenated in order, no separators):
//!   1. time
//!   2. event
//!   3. status
//!   4. prev_hash (64 ASCII hex chars)

use chrono::{DateTime, FixedOffset, Utc};
use sha2::{Digest, Sha256};

use vigil_contracts::ledger::{ChainAnchor, LedgerEntry, VerifyReport};

/// Timestamp format for ledger entries: second precision plus the offset.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

/// Compute the SHA-256 hash for one entry's chained fields.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(time: &str, event: &str, status: &str, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(time.as_bytes());
    hasher.update(event.as_bytes());
    hasher.update(status.as_bytes());
    hasher.update(prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Render `at` in the ledger's fixed local-time convention.
pub fn format_timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(TIME_FORMAT).to_string()
}

/// Verify a retained window of entries, oldest first.
///
/// For each entry, in order:
///
/// 1. **Linkage**: `prev_hash` equals the predecessor's stored `hash`. The
///    oldest retained entry has no predecessor to check against; it is the
///    anchor, and the report says whether it is the true genesis.
/// 2. **Hash correctness**: the stored `hash` equals the value recomputed
///    from the entry's own fields.
///
/// Stops at the first failure and reports its index. An empty window is
/// valid.
pub fn verify_entries(entries: &[LedgerEntry]) -> VerifyReport {
    let anchor = match entries.first() {
        None => ChainAnchor::Empty,
        Some(first) if first.is_genesis() => ChainAnchor::Genesis,
        Some(first) => ChainAnchor::Truncated {
            first_sequence: first.sequence,
        },
    };

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 && entry.prev_hash != entries[index - 1].hash {
            return broken(index, anchor);
        }

        let recomputed = hash_entry(&entry.time, &entry.event, &entry.status, &entry.prev_hash);
        if entry.hash != recomputed {
            return broken(index, anchor);
        }
    }

    VerifyReport {
        valid: true,
        first_broken_index: None,
        entries_checked: entries.len(),
        anchor,
    }
}

fn broken(index: usize, anchor: ChainAnchor) -> VerifyReport {
    VerifyReport {
        valid: false,
        first_broken_index: Some(index),
        entries_checked: index + 1,
        anchor,
    }
}
