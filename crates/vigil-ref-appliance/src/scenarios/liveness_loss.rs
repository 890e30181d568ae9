//! Scenario 2: Liveness Loss
//!
//! The heartbeat cable is pulled right after boot. Inside the 30s grace
//! window the dashboard shows OFFLINE and nothing is recorded; once the
//! window closes the next poll locks the appliance and zeroizes. When the
//! heartbeat returns, DEVICE_DISCONNECTED is the only cause, so the monitor
//! auto-recovers without an operator.

use vigil_contracts::error::VigilResult;
use vigil_core::LivenessAck;

use crate::mock_appliance::SimulatedAppliance;
use crate::scenarios::{print_integrity, print_ledger};

/// Run Scenario 2: Liveness Loss.
pub fn run_scenario() -> VigilResult<()> {
    println!("=== Scenario 2: Liveness Loss ===");
    println!();

    let appliance = SimulatedAppliance::boot(&[])?;
    appliance.heartbeat()?;
    println!("  Heartbeat at t=0s, then silence");

    appliance.go_silent_for(20);
    let report = appliance.poll()?;
    println!("  Poll at t=20s (grace):  {}", report.status);

    appliance.go_silent_for(20);
    let report = appliance.poll()?;
    let directive = appliance.monitor.appliance_directive()?;
    println!("  Poll at t=40s:          {} [{}]", report.status, report.triggers.join(", "));
    println!("  Keys zeroized:          {}", directive.zeroized);

    appliance.go_silent_for(5);
    let recovered = appliance.heartbeat()?;
    println!("  Heartbeat at t=45s:     {}", recovered_label(&recovered));
    println!("  Status after recovery:  {}", appliance.poll()?.status);
    println!();

    print_ledger(&appliance.monitor, 5)?;
    println!();
    print_integrity(&appliance.monitor)?;
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}

fn recovered_label(ack: &LivenessAck) -> &'static str {
    match ack {
        LivenessAck::Recorded => "recorded",
        LivenessAck::Recovered(_) => "auto-recovered",
    }
}
