//! # vigil-ref-appliance
//!
//! Reference appliance runtime for the VIGIL security monitor.
//!
//! Drives a real `SecurityMonitor` from a simulated HSM enclosure through six
//! scenarios:
//!
//! 1. **Tamper lockdown**: a lid switch trips, the appliance locks, and only
//!    a step-up-approved reset brings it back.
//! 2. **Liveness loss**: the heartbeat goes quiet; OFFLINE during the boot
//!    grace window, LOCKED after it, auto-recovery when it resumes.
//! 3. **Mixed-cause lockdown**: liveness loss plus a voltage glitch; the
//!    heartbeat returning is not enough.
//! 4. **Step-up brute force**: three wrong codes lock the appliance.
//! 5. **Maintenance cycle**: sensing disabled and re-armed under step-up.
//! 6. **Ledger tamper**: an edit to the stored ledger is found by index.
//!
//! Time is simulated and nothing leaves the process.

pub mod mock_appliance;
pub mod scenarios;
