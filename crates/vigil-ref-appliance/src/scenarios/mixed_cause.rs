//! Scenario 3: Mixed-Cause Lockdown
//!
//! The heartbeat is lost and, while the appliance is LOCKED for that, the
//! supply-rail monitor reports a voltage glitch. The heartbeat coming back
//! does not clear anything: with two causes active only an administrative
//! reset can unlock.

use vigil_contracts::error::VigilResult;
use vigil_core::LivenessAck;

use crate::mock_appliance::{Sensor, SimulatedAppliance};
use crate::scenarios::{print_integrity, print_ledger};

pub const CODES: &[&str] = &["302011"];

/// Run Scenario 3: Mixed-Cause Lockdown.
pub fn run_scenario() -> VigilResult<()> {
    println!("=== Scenario 3: Mixed-Cause Lockdown ===");
    println!();

    let appliance = SimulatedAppliance::boot(CODES)?;
    appliance.go_silent_for(60);
    let report = appliance.poll()?;
    println!("  Silent for 60s:         {} [{}]", report.status, report.triggers.join(", "));

    appliance.trip(Sensor::SupplyRail)?;
    println!("  Supply rail glitch reported");

    let ack = appliance.heartbeat()?;
    let report = appliance.poll()?;
    println!(
        "  Heartbeat resumes:      {} -> {} [{}]",
        if matches!(ack, LivenessAck::Recovered(_)) { "recovered" } else { "recorded" },
        report.status,
        report.triggers.join(", ")
    );

    let posture = appliance.monitor.posture()?;
    println!("  Compliance health:      {}%", posture.health_percent);
    for check in &posture.checks {
        println!("    [{}] {}", if check.passed { "PASS" } else { "FAIL" }, check.label);
    }

    let ack = appliance.monitor.reset(appliance.approve()?)?;
    println!("  Administrative reset:   {}", ack.status);
    println!();

    print_ledger(&appliance.monitor, 5)?;
    println!();
    print_integrity(&appliance.monitor)?;
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_contracts::{
        cause::{DEVICE_DISCONNECTED, VOLTAGE_GLITCH},
        status::SecurityStatus,
    };

    #[test]
    fn scenario_runs() {
        assert!(run_scenario().is_ok());
    }

    #[test]
    fn heartbeat_does_not_clear_mixed_causes() {
        let appliance = SimulatedAppliance::boot(CODES).unwrap();
        appliance.go_silent_for(60);
        appliance.poll().unwrap();
        appliance.trip(Sensor::SupplyRail).unwrap();

        assert_eq!(appliance.heartbeat().unwrap(), LivenessAck::Recorded);
        let report = appliance.poll().unwrap();
        assert_eq!(report.status, SecurityStatus::Locked);
        assert_eq!(
            report.triggers,
            vec![DEVICE_DISCONNECTED.to_string(), VOLTAGE_GLITCH.to_string()]
        );

        let posture = appliance.monitor.posture().unwrap();
        assert_eq!(posture.health_percent, 0);
        assert!(!posture.all_passed());

        appliance.monitor.reset(appliance.approve().unwrap()).unwrap();
        assert!(appliance.poll().unwrap().triggers.is_empty());
    }
}
