//! Scenario 4: Step-Up Brute Force
//!
//! Someone at the console wants maintenance mode and starts guessing the
//! step-up code. The first two misses are ordinary failures; the third is
//! treated as a tamper signal in its own right and locks the appliance,
//! even though entering maintenance is not itself dangerous.

use vigil_contracts::error::{VigilError, VigilResult};

use crate::mock_appliance::SimulatedAppliance;
use crate::scenarios::{print_integrity, print_ledger};

pub const CODES: &[&str] = &["918273"];

/// Wrong guesses tried by the attacker.
pub const GUESSES: &[&str] = &["000000", "123456", "999999"];

/// Run Scenario 4: Step-Up Brute Force.
pub fn run_scenario() -> VigilResult<()> {
    println!("=== Scenario 4: Step-Up Brute Force ===");
    println!();

    let appliance = SimulatedAppliance::boot(CODES)?;
    let ticket = appliance.monitor.request_step_up()?;
    println!(
        "  Step-up code sent to:   {}",
        ticket.delivered_to.as_deref().unwrap_or("(nobody)")
    );

    for guess in GUESSES {
        match appliance.monitor.confirm_step_up(guess) {
            Ok(_) => println!("  Guess {}:          APPROVED (unexpected)", guess),
            Err(VigilError::InvalidCode { failures, locked }) => println!(
                "  Guess {}:          INVALID (failure {}{})",
                guess,
                failures,
                if locked { ", appliance LOCKED" } else { "" }
            ),
            Err(e) => println!("  Guess {}:          {}", guess, e),
        }
    }

    let report = appliance.poll()?;
    println!("  Status:                 {} [{}]", report.status, report.triggers.join(", "));
    match appliance.monitor.deactivate(None) {
        Ok(_) => println!("  Maintenance:            ACCEPTED (unexpected)"),
        Err(e) => println!("  Maintenance:            REJECTED ({})", e),
    }
    println!();

    print_ledger(&appliance.monitor, 3)?;
    println!();
    print_integrity(&appliance.monitor)?;
    println!();
    println!("  Scenario 4 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_contracts::{cause::STEP_UP_LOCKOUT, status::SecurityStatus};

    #[test]
    fn scenario_runs() {
        assert!(run_scenario().is_ok());
    }

    #[test]
    fn third_wrong_code_locks() {
        let appliance = SimulatedAppliance::boot(CODES).unwrap();
        appliance.monitor.request_step_up().unwrap();

        let outcomes: Vec<_> = GUESSES
            .iter()
            .map(|g| appliance.monitor.confirm_step_up(g).unwrap_err())
            .collect();
        assert!(matches!(outcomes[0], VigilError::InvalidCode { failures: 1, locked: false }));
        assert!(matches!(outcomes[1], VigilError::InvalidCode { failures: 2, locked: false }));
        assert!(matches!(outcomes[2], VigilError::InvalidCode { failures: 3, locked: true }));

        let report = appliance.poll().unwrap();
        assert_eq!(report.status, SecurityStatus::Locked);
        assert_eq!(report.triggers, vec![STEP_UP_LOCKOUT.to_string()]);
        assert!(appliance
            .inbox
            .subjects()
            .contains(&"[HSM ALERT] SECURITY LOCKDOWN".to_string()));

        // The real code was discarded with the lockout.
        assert!(matches!(
            appliance.monitor.confirm_step_up(CODES[0]),
            Err(VigilError::NoActiveCode)
        ));
    }
}
