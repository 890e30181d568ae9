//! Simulated appliance for the VIGIL reference runtime.
//!
//! Stands in for the physical HSM enclosure: a set of tamper sensors, a
//! heartbeat emitter, and an operator inbox that receives alerts and step-up
//! codes. Time is simulated with a `ManualClock`, so a scenario that "waits"
//! a minute finishes instantly.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use vigil_config::MonitorConfig;
use vigil_contracts::{
    cause::{AI_ANOMALY, ENCLOSURE_OPENED, PHYSICAL_MOVEMENT, QUANTUM_DECRYPTION_ATTEMPT, VOLTAGE_GLITCH},
    error::{VigilError, VigilResult},
    notify::Notification,
    status::{ReportedStatus, StatusReport},
};
use vigil_core::{
    traits::{ManualClock, Notifier, ScriptedCodes},
    Collaborators, EventDisposition, LivenessAck, SecurityMonitor, StepUpApproval,
};
use vigil_ledger::{DurableStore, MemoryStore};

/// Embedded configuration for the reference appliance.
pub const APPLIANCE_CONFIG: &str = include_str!("../config/appliance.toml");

/// Heartbeat period of the bench unit, in seconds.
pub const HEARTBEAT_SECS: i64 = 5;

// ── Sensors ───────────────────────────────────────────────────────────────────

/// The tamper sensors fitted to the reference enclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    /// Lid microswitch.
    LidSwitch,
    /// Three-axis accelerometer on the mounting plate.
    Accelerometer,
    /// Supply-rail monitor on the crypto core.
    SupplyRail,
    /// On-device anomaly model over the combined sensor vector.
    AnomalyModel,
    /// Key-usage entropy monitor.
    EntropyMonitor,
}

impl Sensor {
    /// The trigger cause this sensor reports.
    pub fn cause(&self) -> &'static str {
        match self {
            Sensor::LidSwitch => ENCLOSURE_OPENED,
            Sensor::Accelerometer => PHYSICAL_MOVEMENT,
            Sensor::SupplyRail => VOLTAGE_GLITCH,
            Sensor::AnomalyModel => AI_ANOMALY,
            Sensor::EntropyMonitor => QUANTUM_DECRYPTION_ATTEMPT,
        }
    }
}

// ── Operator inbox ────────────────────────────────────────────────────────────

/// Collects every notification the monitor sends.
#[derive(Debug, Default)]
pub struct OperatorInbox {
    received: Mutex<Vec<Notification>>,
}

impl OperatorInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Notification> {
        match self.received.lock() {
            Ok(received) => received.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages().into_iter().map(|n| n.subject).collect()
    }

    /// The six-digit code from the newest step-up message, if any.
    pub fn latest_code(&self) -> Option<String> {
        self.messages()
            .into_iter()
            .rev()
            .find(|n| n.subject.ends_with("OTP Verification"))
            .and_then(|n| extract_code(&n.body))
    }
}

impl Notifier for OperatorInbox {
    fn notify(&self, notification: &Notification) -> VigilResult<()> {
        let mut received = self.received.lock().map_err(|e| VigilError::PersistenceFailure {
            reason: format!("operator inbox poisoned: {}", e),
        })?;
        received.push(notification.clone());
        Ok(())
    }
}

/// First run of six consecutive digits in `body`.
fn extract_code(body: &str) -> Option<String> {
    body.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 6)
        .map(str::to_string)
}

// ── Simulated appliance ───────────────────────────────────────────────────────

/// The bench start time used by every scenario.
pub fn bench_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 3, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A monitor wired to simulated hardware.
pub struct SimulatedAppliance {
    pub monitor: SecurityMonitor,
    pub clock: Arc<ManualClock>,
    pub inbox: Arc<OperatorInbox>,
    pub store: Arc<dyn DurableStore>,
}

impl SimulatedAppliance {
    /// Boot on an in-memory store with the embedded configuration.
    ///
    /// `codes` is the sequence of step-up codes the code generator will
    /// hand out.
    pub fn boot(codes: &[&str]) -> VigilResult<Self> {
        Self::boot_on(Arc::new(MemoryStore::new()), codes)
    }

    /// Boot on an existing store, as after a power cycle.
    pub fn boot_on(store: Arc<dyn DurableStore>, codes: &[&str]) -> VigilResult<Self> {
        let config = MonitorConfig::from_toml_str(APPLIANCE_CONFIG)?;
        let clock = Arc::new(ManualClock::new(bench_epoch()));
        let inbox = Arc::new(OperatorInbox::new());

        let collaborators = Collaborators::new(store.clone(), inbox.clone())
            .with_clock(clock.clone())
            .with_codes(Box::new(ScriptedCodes::new(codes.to_vec())));
        let monitor = SecurityMonitor::open(config, collaborators)?;
        debug!(scripted_codes = codes.len(), at = %bench_epoch(), "simulated appliance booted");

        Ok(Self {
            monitor,
            clock,
            inbox,
            store,
        })
    }

    /// A tamper sensor fires.
    pub fn trip(&self, sensor: Sensor) -> VigilResult<EventDisposition> {
        self.monitor.report_event(sensor.cause(), ReportedStatus::Locked)
    }

    /// An informational event.
    pub fn note(&self, event: &str) -> VigilResult<EventDisposition> {
        self.monitor.report_event(event, ReportedStatus::Safe)
    }

    pub fn heartbeat(&self) -> VigilResult<LivenessAck> {
        self.monitor.record_liveness()
    }

    /// Advance simulated time, emitting heartbeats every `HEARTBEAT_SECS`.
    pub fn run_for(&self, secs: i64) -> VigilResult<()> {
        let mut elapsed = 0;
        while elapsed + HEARTBEAT_SECS <= secs {
            self.clock.advance(Duration::seconds(HEARTBEAT_SECS));
            self.heartbeat()?;
            elapsed += HEARTBEAT_SECS;
        }
        self.clock.advance(Duration::seconds(secs - elapsed));
        Ok(())
    }

    /// Advance simulated time with the heartbeat cable pulled.
    pub fn go_silent_for(&self, secs: i64) {
        self.clock.advance(Duration::seconds(secs));
    }

    /// The dashboard poll.
    pub fn poll(&self) -> VigilResult<StatusReport> {
        self.monitor.query_status()
    }

    /// Request a step-up code, read it from the inbox, and confirm it.
    pub fn approve(&self) -> VigilResult<StepUpApproval> {
        self.monitor.request_step_up()?;
        let code = self.inbox.latest_code().ok_or(VigilError::NoActiveCode)?;
        self.monitor.confirm_step_up(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = MonitorConfig::from_toml_str(APPLIANCE_CONFIG).unwrap();
        assert_eq!(config.alerts.recipient.as_deref(), Some("secops@appliance.example"));
        assert!(config.causes.extra.contains(&"SERVICE_PORT_PROBE".to_string()));
    }

    #[test]
    fn code_extraction() {
        assert_eq!(
            extract_code("Your verification code is 482913. It expires at 2026-01-05 03:35:00 UTC."),
            Some("482913".to_string())
        );
        assert_eq!(extract_code("no digits here"), None);
    }

    #[test]
    fn heartbeats_keep_the_appliance_safe() {
        let appliance = SimulatedAppliance::boot(&[]).unwrap();
        appliance.run_for(120).unwrap();
        let report = appliance.poll().unwrap();
        assert!(!report.locked);
        assert!(appliance.monitor.list_ledger(None).unwrap().is_empty());
    }

    #[test]
    fn sensors_map_to_catalog_causes() {
        let appliance = SimulatedAppliance::boot(&[]).unwrap();
        for sensor in [
            Sensor::LidSwitch,
            Sensor::Accelerometer,
            Sensor::SupplyRail,
            Sensor::AnomalyModel,
            Sensor::EntropyMonitor,
        ] {
            assert!(matches!(appliance.trip(sensor).unwrap(), EventDisposition::Recorded(_)));
        }
        assert_eq!(appliance.monitor.snapshot().unwrap().triggers.len(), 5);
    }

    #[test]
    fn approve_reads_code_from_inbox() {
        let appliance = SimulatedAppliance::boot(&["314159"]).unwrap();
        assert!(appliance.approve().is_ok());
        assert_eq!(appliance.inbox.latest_code().as_deref(), Some("314159"));
    }
}
