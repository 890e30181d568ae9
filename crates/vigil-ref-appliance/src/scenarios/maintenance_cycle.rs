//! Scenario 5: Maintenance Cycle
//!
//! A technician opens the enclosure to replace a fan. Sensing is disabled
//! under step-up first, so the lid switch is ignored; afterwards sensing is
//! re-armed under a second step-up and the next lid event locks again.

use vigil_contracts::error::VigilResult;
use vigil_core::EventDisposition;

use crate::mock_appliance::{Sensor, SimulatedAppliance};
use crate::scenarios::{print_integrity, print_ledger};

pub const CODES: &[&str] = &["564738", "192837"];

/// Run Scenario 5: Maintenance Cycle.
pub fn run_scenario() -> VigilResult<()> {
    println!("=== Scenario 5: Maintenance Cycle ===");
    println!();

    let appliance = SimulatedAppliance::boot(CODES)?;

    match appliance.monitor.deactivate(None) {
        Ok(_) => println!("  Maintenance without step-up: ACCEPTED (unexpected)"),
        Err(e) => println!("  Maintenance without step-up: REJECTED ({})", e),
    }

    let ack = appliance.monitor.deactivate(Some(appliance.approve()?))?;
    println!("  Maintenance with step-up:    {}", ack.status);

    appliance.note("FAN_REPLACEMENT_STARTED")?;
    let disposition = appliance.trip(Sensor::LidSwitch)?;
    println!(
        "  Lid switch during service:   {}",
        describe(&disposition)
    );
    appliance.run_for(30)?;

    let ack = appliance.monitor.reactivate(Some(appliance.approve()?))?;
    println!("  Sensing re-armed:            {}", ack.status);

    let disposition = appliance.trip(Sensor::LidSwitch)?;
    println!(
        "  Lid switch after re-arm:     {}",
        describe(&disposition)
    );
    println!("  Uptime:                      {}s", appliance.monitor.uptime()?.num_seconds());
    println!();

    print_ledger(&appliance.monitor, 4)?;
    println!();
    print_integrity(&appliance.monitor)?;
    println!();
    println!("  Scenario 5 complete.");
    println!();

    Ok(())
}

fn describe(disposition: &EventDisposition) -> String {
    match disposition {
        EventDisposition::Ignored => "IGNORED (sensing disabled)".to_string(),
        EventDisposition::Recorded(ack) => format!("RECORDED -> {}", ack.status),
    }
}
