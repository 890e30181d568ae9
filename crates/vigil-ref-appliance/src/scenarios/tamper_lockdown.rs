//! Scenario 1: Tamper Lockdown
//!
//! The lid switch trips on a running appliance. The monitor locks, alerts
//! the operator, and refuses to leave LOCKED for anything but a reset
//! authorized by a step-up code.
//!
//! Walk-through:
//!   1. Appliance boots SAFE and heartbeats for a minute
//!   2. Lid switch reports ENCLOSURE_OPENED twice (the cause is held once)
//!   3. Maintenance is attempted and rejected while LOCKED
//!   4. Operator requests a step-up code, confirms it, and resets
//!   5. Ledger integrity verified

use vigil_contracts::error::VigilResult;

use crate::mock_appliance::{Sensor, SimulatedAppliance};
use crate::scenarios::{print_integrity, print_ledger};

/// Codes handed out by the bench generator.
pub const CODES: &[&str] = &["271828", "161803"];

/// Run Scenario 1: Tamper Lockdown.
pub fn run_scenario() -> VigilResult<()> {
    println!("=== Scenario 1: Tamper Lockdown ===");
    println!();

    let appliance = SimulatedAppliance::boot(CODES)?;
    appliance.run_for(60)?;
    println!("  Boot + 60s of heartbeats: {}", appliance.poll()?.status);

    appliance.trip(Sensor::LidSwitch)?;
    appliance.trip(Sensor::LidSwitch)?;
    let report = appliance.poll()?;
    println!("  Lid switch tripped twice");
    println!("  Status:                 {}", report.status);
    println!("  Active causes:          {}", report.triggers.join(", "));

    let approval = appliance.approve()?;
    match appliance.monitor.deactivate(Some(approval)) {
        Ok(_) => println!("  Maintenance while LOCKED: ACCEPTED (unexpected)"),
        Err(e) => println!("  Maintenance while LOCKED: REJECTED ({})", e),
    }

    let approval = appliance.approve()?;
    let ack = appliance.monitor.reset(approval)?;
    println!("  Step-up approved reset: {} (ledger #{})", ack.status, ack.entry.sequence);
    println!();

    print_ledger(&appliance.monitor, 5)?;
    println!();
    print_integrity(&appliance.monitor)?;
    println!(
        "  Alerts delivered:       {}",
        appliance.inbox.subjects().join(" | ")
    );
    println!("  Final status:           {}", appliance.poll()?.status);
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}
