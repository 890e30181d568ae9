//! Scenario 6: Ledger Tamper
//!
//! After a lockdown, someone with disk access rewrites one stored ledger
//! entry to hide it. Verification walks the stored chain, reports the exact
//! index of the edited entry, and keeps reporting it: nothing repairs the
//! chain.

use std::sync::Arc;

use vigil_contracts::{error::VigilResult, ledger::LedgerEntry};
use vigil_ledger::MemoryStore;

use crate::mock_appliance::{Sensor, SimulatedAppliance};
use crate::scenarios::print_ledger;

/// Run Scenario 6: Ledger Tamper.
pub fn run_scenario() -> VigilResult<()> {
    println!("=== Scenario 6: Ledger Tamper ===");
    println!();

    let store = Arc::new(MemoryStore::new());
    let appliance = SimulatedAppliance::boot_on(store.clone(), &[])?;

    appliance.note("FIRMWARE_ATTESTED")?;
    appliance.trip(Sensor::Accelerometer)?;
    appliance.note("OPERATOR_LOGIN")?;
    appliance.note("KEY_EXPORT_REQUESTED")?;

    let before = appliance.monitor.verify_ledger()?;
    println!("  Before tampering:       valid = {}", before.valid);

    store.tamper(hide_movement)?;
    println!("  Stored entry #1 rewritten: PHYSICAL_MOVEMENT/LOCKED -> SENSOR_SELF_TEST/SAFE");

    let after = appliance.monitor.verify_ledger()?;
    println!(
        "  After tampering:        valid = {}, first broken index = {}",
        after.valid,
        after
            .first_broken_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Report: {}",
        serde_json::to_string(&after).unwrap_or_else(|e| format!("<unserializable: {}>", e))
    );
    println!();

    print_ledger(&appliance.monitor, 4)?;
    println!();
    println!("  Scenario 6 complete.");
    println!();

    Ok(())
}

/// Rewrite the movement alarm so it reads as routine.
fn hide_movement(entries: &mut Vec<LedgerEntry>) {
    if let Some(entry) = entries.iter_mut().find(|e| e.event == "PHYSICAL_MOVEMENT") {
        entry.event = "SENSOR_SELF_TEST".to_string();
        entry.status = "SAFE".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_contracts::ledger::ChainAnchor;
    use vigil_ledger::JsonFileStore;

    #[test]
    fn scenario_runs() {
        assert!(run_scenario().is_ok());
    }

    #[test]
    fn edited_entry_reported_by_index() {
        let store = Arc::new(MemoryStore::new());
        let appliance = SimulatedAppliance::boot_on(store.clone(), &[]).unwrap();
        appliance.note("FIRMWARE_ATTESTED").unwrap();
        appliance.trip(Sensor::Accelerometer).unwrap();
        appliance.note("OPERATOR_LOGIN").unwrap();

        store.tamper(hide_movement).unwrap();
        let report = appliance.monitor.verify_ledger().unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_broken_index, Some(1));
        assert_eq!(appliance.monitor.verify_ledger().unwrap(), report);
    }

    #[test]
    fn edit_on_disk_survives_power_cycle() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
            let appliance = SimulatedAppliance::boot_on(store, &[]).unwrap();
            appliance.note("FIRMWARE_ATTESTED").unwrap();
            appliance.trip(Sensor::Accelerometer).unwrap();
            appliance.note("OPERATOR_LOGIN").unwrap();
        }

        let path = dir.path().join("ledger.json");
        let mut doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        doc[2]["time"] = serde_json::Value::String("2026-01-05 09:00:01 +05:30".to_string());
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let appliance = SimulatedAppliance::boot_on(store, &[]).unwrap();
        let report = appliance.monitor.verify_ledger().unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_broken_index, Some(2));
        assert_eq!(report.anchor, ChainAnchor::Genesis);

        // The lockdown from before the power cycle is still in force.
        assert!(appliance.poll().unwrap().locked);
    }
}
