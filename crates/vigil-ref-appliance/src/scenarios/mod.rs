//! Reference appliance scenarios.
//!
//! Each scenario boots its own `SimulatedAppliance`, drives one pattern of
//! inputs through the monitor, and prints what the monitor decided.

pub mod ledger_tamper;
pub mod liveness_loss;
pub mod maintenance_cycle;
pub mod mixed_cause;
pub mod step_up_lockout;
pub mod tamper_lockdown;

use vigil_contracts::{error::VigilResult, ledger::LedgerEntry};
use vigil_core::SecurityMonitor;

/// Print the newest `limit` ledger entries, newest first.
pub(crate) fn print_ledger(monitor: &SecurityMonitor, limit: usize) -> VigilResult<()> {
    let entries: Vec<LedgerEntry> = monitor.list_ledger(Some(limit))?;
    println!("  Ledger (newest first):");
    for entry in &entries {
        println!(
            "    #{:<3} {}  {:<28} {:<11} {}…",
            entry.sequence,
            entry.time,
            entry.event,
            entry.status,
            entry.hash.get(..12).unwrap_or(&entry.hash)
        );
    }
    Ok(())
}

/// Print the integrity line every scenario ends with.
pub(crate) fn print_integrity(monitor: &SecurityMonitor) -> VigilResult<bool> {
    let report = monitor.verify_ledger()?;
    println!(
        "  Ledger integrity:       {} ({} entr{} checked)",
        if report.valid { "VERIFIED" } else { "BROKEN" },
        report.entries_checked,
        if report.entries_checked == 1 { "y" } else { "ies" }
    );
    if let Some(index) = report.first_broken_index {
        println!("  First broken index:     {}", index);
    }
    Ok(report.valid)
}
