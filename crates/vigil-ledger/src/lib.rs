//! # vigil-ledger
//!
//! Append-only, SHA-256 hash-chained event ledger for the VIGIL appliance
//! monitor.
//!
//! ## Overview
//!
//! Each `LedgerEntry` commits to its predecessor through `prev_hash`.
//! Editing any chained field of any stored entry, even one byte, makes
//! `Ledger::verify` report the index of that entry. The ledger is bounded:
//! once the capacity is exceeded the oldest entries are evicted and the
//! report's `anchor` says verification starts mid-chain.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil_ledger::{Ledger, LedgerOptions, JsonFileStore};
//!
//! let store = Arc::new(JsonFileStore::open("/var/lib/vigil")?);
//! let mut ledger = Ledger::open(store, LedgerOptions::default())?;
//! ledger.append("ENCLOSURE_OPENED", "LOCKED", chrono::Utc::now());
//! assert!(ledger.verify()?.valid);
//! ```

pub mod chain;
pub mod ledger;
pub mod store;

pub use chain::{format_timestamp, hash_entry, verify_entries};
pub use ledger::{AppendReceipt, Ledger, LedgerOptions};
pub use store::{DurableStore, JsonFileStore, MemoryStore};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use proptest::prelude::*;

    use vigil_contracts::ledger::{ChainAnchor, GENESIS_HASH};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn memory_ledger(capacity: Option<usize>) -> (Arc<MemoryStore>, Ledger) {
        let store = Arc::new(MemoryStore::new());
        let options = LedgerOptions {
            capacity,
            ..LedgerOptions::default()
        };
        let ledger = Ledger::open(store.clone(), options).unwrap();
        (store, ledger)
    }

    /// Replace the byte at `pos` with a different ASCII byte.
    fn flip_byte(field: &mut String, pos: usize) {
        let current = field.as_bytes()[pos];
        let replacement = if current == b'X' { "Y" } else { "X" };
        field.replace_range(pos..pos + 1, replacement);
    }

    // ── Chain primitives ──────────────────────────────────────────────────────

    /// The hash is SHA-256 over the plain concatenation of the four fields.
    #[test]
    fn test_hash_is_plain_concatenation() {
        assert_eq!(
            hash_entry("a", "b", "c", ""),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_timestamp_uses_stated_offset() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        assert_eq!(format_timestamp(t0(), ist), "2026-01-01 05:30:00 +05:30");
    }

    #[test]
    fn test_verify_empty() {
        let report = verify_entries(&[]);
        assert!(report.valid);
        assert_eq!(report.anchor, ChainAnchor::Empty);
        assert_eq!(report.entries_checked, 0);
    }

    // ── Append / list / verify ────────────────────────────────────────────────

    #[test]
    fn test_genesis_links_to_sentinel() {
        let (_store, mut ledger) = memory_ledger(None);
        let receipt = ledger.append("SYSTEM_BOOT", "SAFE", t0());
        assert_eq!(receipt.entry.prev_hash, GENESIS_HASH);
        assert_eq!(receipt.entry.sequence, 0);
        assert_eq!(ledger.verify().unwrap().anchor, ChainAnchor::Genesis);
    }

    #[test]
    fn test_chain_links_and_verifies() {
        let (_store, mut ledger) = memory_ledger(None);
        let a = ledger.append("ENCLOSURE_OPENED", "LOCKED", t0()).entry;
        let b = ledger.append("SYSTEM_RESET", "SAFE", t0() + Duration::seconds(5)).entry;

        assert_eq!(b.prev_hash, a.hash);
        assert_eq!(b.sequence, 1);

        let report = ledger.verify().unwrap();
        assert!(report.valid);
        assert_eq!(report.first_broken_index, None);
        assert_eq!(report.entries_checked, 2);
    }

    #[test]
    fn test_list_is_newest_first_and_limited() {
        let (_store, mut ledger) = memory_ledger(None);
        for (i, event) in ["A", "B", "C", "D"].iter().enumerate() {
            ledger.append(event, "SAFE", t0() + Duration::seconds(i as i64));
        }

        let all: Vec<String> = ledger.list(None).into_iter().map(|e| e.event).collect();
        assert_eq!(all, vec!["D", "C", "B", "A"]);

        let two: Vec<String> = ledger.list(Some(2)).into_iter().map(|e| e.event).collect();
        assert_eq!(two, vec!["D", "C"]);

        assert_eq!(ledger.list(Some(0)).len(), 0);
    }

    /// An edited field is reported at the entry whose recomputed hash
    /// disagrees.
    #[test]
    fn test_tamper_detection_reports_index() {
        let (store, mut ledger) = memory_ledger(None);
        for i in 0..5 {
            ledger.append("HEARTBEAT_GAP", "SAFE", t0() + Duration::seconds(i));
        }

        store.tamper(|entries| entries[3].status = "LOCKED".to_string()).unwrap();

        let report = ledger.verify().unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_broken_index, Some(3));
        assert_eq!(report.entries_checked, 4);
    }

    /// A rewritten entry with a self-consistent hash still breaks the link
    /// to its predecessor.
    #[test]
    fn test_relinked_entry_reports_index() {
        let (store, mut ledger) = memory_ledger(None);
        for i in 0..5 {
            ledger.append("HEARTBEAT_GAP", "SAFE", t0() + Duration::seconds(i));
        }

        store
            .tamper(|entries| {
                let forged = &mut entries[2];
                forged.prev_hash = GENESIS_HASH.to_string();
                forged.hash = hash_entry(&forged.time, &forged.event, &forged.status, &forged.prev_hash);
            })
            .unwrap();

        let report = ledger.verify().unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_broken_index, Some(2));
        assert_eq!(report.entries_checked, 3);
    }

    /// Verification never repairs a break: a second run reports the same thing.
    #[test]
    fn test_verify_does_not_repair() {
        let (store, mut ledger) = memory_ledger(None);
        ledger.append("A", "SAFE", t0());
        ledger.append("B", "SAFE", t0());
        store.tamper(|entries| entries[0].event = "Z".to_string()).unwrap();

        let first = ledger.verify().unwrap();
        let second = ledger.verify().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.load_entries().unwrap()[0].event, "Z");
    }

    // ── Retention ─────────────────────────────────────────────────────────────

    #[test]
    fn test_eviction_moves_anchor_forward() {
        let (store, mut ledger) = memory_ledger(Some(3));
        for i in 0..5 {
            ledger.append("TICK", "SAFE", t0() + Duration::seconds(i));
        }

        assert_eq!(ledger.len(), 3);
        assert_eq!(store.load_entries().unwrap().len(), 3);
        assert_eq!(ledger.list(None).last().unwrap().sequence, 2);

        let report = ledger.verify().unwrap();
        assert!(report.valid, "truncated window must still verify");
        assert_eq!(report.anchor, ChainAnchor::Truncated { first_sequence: 2 });
    }

    #[test]
    fn test_open_trims_oversized_store() {
        let (store, mut ledger) = memory_ledger(None);
        for i in 0..6 {
            ledger.append("TICK", "SAFE", t0() + Duration::seconds(i));
        }

        let options = LedgerOptions {
            capacity: Some(4),
            ..LedgerOptions::default()
        };
        let reopened = Ledger::open(store, options).unwrap();
        assert_eq!(reopened.len(), 4);
        assert!(reopened.verify_in_memory().valid);
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// A failed durable write is reported but the in-memory tip advances.
    #[test]
    fn test_persist_failure_keeps_memory_record() {
        let (store, mut ledger) = memory_ledger(None);
        ledger.append("A", "SAFE", t0());

        store.set_fail_writes(true);
        let receipt = ledger.append("B", "LOCKED", t0());
        assert!(!receipt.is_durable());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.tip().unwrap().event, "B");
        assert_eq!(store.load_entries().unwrap().len(), 1);

        // Next successful write carries the whole sequence, including "B".
        store.set_fail_writes(false);
        let receipt = ledger.append("C", "SAFE", t0());
        assert!(receipt.is_durable());
        assert_eq!(store.load_entries().unwrap().len(), 3);
        assert!(ledger.verify().unwrap().valid);
    }

    #[test]
    fn test_reload_preserves_chain_and_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());

        let before = {
            let mut ledger = Ledger::open(store.clone(), LedgerOptions::default()).unwrap();
            ledger.append("ENCLOSURE_OPENED", "LOCKED", t0());
            ledger.append("SYSTEM_RESET", "SAFE", t0() + Duration::seconds(1));
            ledger.verify().unwrap()
        };

        let reloaded_store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let mut ledger = Ledger::open(reloaded_store, LedgerOptions::default()).unwrap();
        assert_eq!(ledger.verify().unwrap(), before);

        let next = ledger.append("SYSTEM_ARMED", "SAFE", t0() + Duration::seconds(2)).entry;
        assert_eq!(next.sequence, 2);
        assert!(ledger.verify().unwrap().valid);
    }

    #[test]
    fn test_reload_of_tampered_file_reports_same_break() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let mut ledger = Ledger::open(store.clone(), LedgerOptions::default()).unwrap();
        for i in 0..3 {
            ledger.append("TICK", "SAFE", t0() + Duration::seconds(i));
        }

        let path = store.ledger_path();
        let raw = std::fs::read_to_string(&path).unwrap();
        let edited = raw.replacen("\"TICK\"", "\"TOCK\"", 2);
        std::fs::write(&path, edited).unwrap();

        let before = ledger.verify().unwrap();
        let reopened = Ledger::open(store, LedgerOptions::default()).unwrap();
        let after = reopened.verify().unwrap();
        assert_eq!(before, after);
        assert_eq!(after.first_broken_index, Some(0));
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// N concurrent appenders behind one lock produce one unbroken chain.
    #[test]
    fn test_concurrent_appends_never_fork() {
        for n in [2usize, 8, 32, 100] {
            let (store, ledger) = memory_ledger(None);
            let ledger = Mutex::new(ledger);

            std::thread::scope(|scope| {
                for i in 0..n {
                    let ledger = &ledger;
                    scope.spawn(move || {
                        let mut guard = ledger.lock().unwrap();
                        guard.append(&format!("REPORTER_{i}"), "SAFE", Utc::now());
                    });
                }
            });

            let entries = store.load_entries().unwrap();
            assert_eq!(entries.len(), n);
            let report = verify_entries(&entries);
            assert!(report.valid, "chain forked with {n} appenders");
            let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
            assert_eq!(sequences, (0..n as u64).collect::<Vec<_>>());
        }
    }

    // ── Property tests ────────────────────────────────────────────────────────

    proptest! {
        /// Any sequence of appends verifies; flipping one byte of any chained
        /// field (or the stored hash) of any entry breaks it at that entry.
        #[test]
        fn prop_single_byte_edit_is_detected_at_its_index(
            events in prop::collection::vec(
                ("[A-Z_]{1,16}", prop_oneof![Just("LOCKED"), Just("SAFE")]),
                1..12,
            ),
            target in any::<prop::sample::Index>(),
            field in 0usize..5,
            byte in any::<prop::sample::Index>(),
        ) {
            let (store, mut ledger) = memory_ledger(None);
            for (i, (event, status)) in events.iter().enumerate() {
                ledger.append(event, status, t0() + Duration::seconds(i as i64));
            }
            prop_assert!(ledger.verify().unwrap().valid);

            let index = target.index(events.len());
            store.tamper(|entries| {
                let entry = &mut entries[index];
                let value = match field {
                    0 => &mut entry.time,
                    1 => &mut entry.event,
                    2 => &mut entry.status,
                    3 => &mut entry.prev_hash,
                    _ => &mut entry.hash,
                };
                let pos = byte.index(value.len());
                flip_byte(value, pos);
            }).unwrap();

            let report = ledger.verify().unwrap();
            prop_assert!(!report.valid);
            prop_assert_eq!(report.first_broken_index, Some(index));
        }

        #[test]
        fn prop_fresh_ledger_genesis_is_sentinel(count in 1usize..20) {
            let (store, mut ledger) = memory_ledger(None);
            for i in 0..count {
                ledger.append("TICK", "SAFE", t0() + Duration::seconds(i as i64));
            }
            let entries = store.load_entries().unwrap();
            prop_assert_eq!(entries[0].prev_hash.as_str(), GENESIS_HASH);
            prop_assert!(verify_entries(&entries).valid);
        }
    }
}
