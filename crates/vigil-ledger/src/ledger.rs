//! The ledger: an append-only, hash-chained, bounded sequence of entries.
//!
//! `Ledger` is not internally synchronized. Appends take `&mut self`, so the
//! owner decides the mutual-exclusion domain; the monitor keeps the ledger
//! under the same lock as the state it describes, which is what prevents two
//! callers from chaining off the same tip.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, info, warn};

use vigil_contracts::{
    error::{VigilError, VigilResult},
    ledger::{LedgerEntry, VerifyReport, GENESIS_HASH},
};

use crate::{
    chain::{format_timestamp, hash_entry, verify_entries},
    store::DurableStore,
};

/// Retention and timestamp policy for a ledger.
#[derive(Debug, Clone, Copy)]
pub struct LedgerOptions {
    /// Maximum retained entries; `None` retains everything.
    pub capacity: Option<usize>,
    /// Offset used to render entry timestamps.
    pub offset: FixedOffset,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            capacity: Some(1000),
            offset: Utc.fix(),
        }
    }
}

/// Outcome of an append.
///
/// The entry is logically appended whether or not the durable write worked;
/// `persist_error` carries the failure so the caller can surface it.
#[derive(Debug)]
pub struct AppendReceipt {
    pub entry: LedgerEntry,
    pub persist_error: Option<VigilError>,
}

impl AppendReceipt {
    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }
}

pub struct Ledger {
    /// Retained entries in chain order (oldest first).
    entries: Vec<LedgerEntry>,
    next_sequence: u64,
    /// Hash of the chain tip, or `GENESIS_HASH` before the first append.
    last_hash: String,
    options: LedgerOptions,
    store: Arc<dyn DurableStore>,
}

impl Ledger {
    /// Load the stored sequence and resume from its tip.
    ///
    /// A stored sequence longer than the capacity is trimmed in memory; the
    /// store catches up on the next append.
    pub fn open(store: Arc<dyn DurableStore>, options: LedgerOptions) -> VigilResult<Self> {
        let mut entries = store.load_entries()?;
        evict_excess(&mut entries, options.capacity);

        let (next_sequence, last_hash) = match entries.last() {
            Some(tip) => (tip.sequence + 1, tip.hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        };

        info!(
            retained = entries.len(),
            next_sequence,
            tip = %last_hash,
            "ledger opened"
        );

        Ok(Self {
            entries,
            next_sequence,
            last_hash,
            options,
            store,
        })
    }

    /// Append one entry to the chain and persist the full sequence.
    ///
    /// The hash commits to (time, event, status, prev_hash). When the
    /// retained window exceeds capacity the oldest entries are dropped and
    /// the oldest survivor becomes the verification anchor.
    pub fn append(&mut self, event: &str, status: &str, at: DateTime<Utc>) -> AppendReceipt {
        let time = format_timestamp(at, self.options.offset);
        let prev_hash = self.last_hash.clone();
        let hash = hash_entry(&time, event, status, &prev_hash);

        let entry = LedgerEntry {
            sequence: self.next_sequence,
            time,
            event: event.to_string(),
            status: status.to_string(),
            hash: hash.clone(),
            prev_hash,
        };

        self.entries.push(entry.clone());
        self.next_sequence += 1;
        self.last_hash = hash;

        let evicted = evict_excess(&mut self.entries, self.options.capacity);
        if evicted > 0 {
            debug!(evicted, "ledger retention evicted oldest entries");
        }

        let persist_error = self.store.save_entries(&self.entries).err();
        if let Some(err) = &persist_error {
            warn!(
                sequence = entry.sequence,
                event = %entry.event,
                error = %err,
                "ledger entry appended in memory but not persisted"
            );
        } else {
            debug!(
                sequence = entry.sequence,
                event = %entry.event,
                status = %entry.status,
                hash = %entry.hash,
                "ledger entry appended"
            );
        }

        AppendReceipt { entry, persist_error }
    }

    /// Retained entries, newest first. Lazy and non-mutating.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().rev()
    }

    /// Up to `limit` entries, newest first (all of them when `None`).
    pub fn list(&self, limit: Option<usize>) -> Vec<LedgerEntry> {
        self.iter_newest_first()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Verify the durably stored sequence.
    ///
    /// This is the tamper-evidence check: it reads what is at rest, not the
    /// in-memory copy, so edits made to storage are what it reports on.
    pub fn verify(&self) -> VigilResult<VerifyReport> {
        let stored = self.store.load_entries()?;
        let report = verify_entries(&stored);
        if !report.valid {
            warn!(
                first_broken_index = ?report.first_broken_index,
                entries = stored.len(),
                "ledger chain integrity violation"
            );
        }
        Ok(report)
    }

    /// Verify the in-memory retained window.
    pub fn verify_in_memory(&self) -> VerifyReport {
        verify_entries(&self.entries)
    }

    /// The chain tip, if anything has been appended.
    pub fn tip(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Drop the oldest entries beyond `capacity`. Returns how many were dropped.
fn evict_excess(entries: &mut Vec<LedgerEntry>, capacity: Option<usize>) -> usize {
    match capacity {
        Some(cap) if entries.len() > cap => {
            let excess = entries.len() - cap;
            entries.drain(..excess);
            excess
        }
        _ => 0,
    }
}
