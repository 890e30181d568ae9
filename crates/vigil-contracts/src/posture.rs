//! Compliance posture: a projection of the trigger set onto the physical
//! security controls an auditor asks about.

use serde::{Deserialize, Serialize};

use crate::{
    cause::{DEVICE_DISCONNECTED, ENCLOSURE_OPENED, PHYSICAL_MOVEMENT, VOLTAGE_GLITCH},
    status::{SecurityStatus, SecuritySnapshot},
};

/// Result of one control check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub id: String,
    pub label: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompliancePosture {
    pub checks: Vec<ComplianceCheck>,
    /// Share of passing checks, rounded to the nearest percent.
    pub health_percent: u8,
}

impl CompliancePosture {
    pub fn evaluate(snapshot: &SecuritySnapshot) -> Self {
        let triggers = &snapshot.triggers;

        // An opened enclosure that produced a lockdown is the control working.
        let enclosure = snapshot.status == SecurityStatus::Safe
            || (snapshot.status == SecurityStatus::Locked && triggers.contains(ENCLOSURE_OPENED));
        let anti_substitution =
            !triggers.contains(DEVICE_DISCONNECTED) && !triggers.contains(PHYSICAL_MOVEMENT);
        let non_invasive = !triggers.contains(VOLTAGE_GLITCH);

        let checks = vec![
            check("enclosure-response", "Tamper detection and zeroization response", enclosure),
            check("anti-substitution", "Device tamper and substitution protection", anti_substitution),
            check("non-invasive", "Non-invasive attack (voltage glitch) protection", non_invasive),
        ];

        let passed = checks.iter().filter(|c| c.passed).count();
        let health_percent = ((passed as f64 / checks.len() as f64) * 100.0).round() as u8;

        Self { checks, health_percent }
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

fn check(id: &str, label: &str, passed: bool) -> ComplianceCheck {
    ComplianceCheck {
        id: id.to_string(),
        label: label.to_string(),
        passed,
    }
}
