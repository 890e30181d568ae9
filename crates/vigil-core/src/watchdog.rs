//! Liveness watchdog.
//!
//! Poll-driven: nothing ticks in the background. `check_liveness` is a pure
//! function of `now` and the recorded timestamps, evaluated whenever the
//! status is read.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use vigil_config::WatchdogConfig;
use vigil_contracts::{
    cause::{CauseSet, TriggerCause, DEVICE_DISCONNECTED},
    status::SecurityStatus,
};

/// What a liveness signal means for the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessOutcome {
    /// Timestamp updated; nothing else changes.
    Recorded,
    /// The appliance was LOCKED only because it had gone silent. The state
    /// machine should clear that cause and return to SAFE.
    Recovered,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    grace_period: Duration,
    enforce_during_maintenance: bool,
    last_liveness_at: DateTime<Utc>,
    boot_at: DateTime<Utc>,
}

impl Watchdog {
    pub fn new(config: &WatchdogConfig, boot_at: DateTime<Utc>, last_liveness_at: DateTime<Utc>) -> Self {
        Self {
            timeout: config.timeout(),
            grace_period: config.grace_period(),
            enforce_during_maintenance: config.enforce_during_maintenance,
            last_liveness_at,
            boot_at,
        }
    }

    /// Accept a liveness signal at `now`.
    ///
    /// Auto-recovery is signalled only when the liveness cause is the sole
    /// active trigger. With any other cause present the lockdown stands.
    pub fn record_liveness(
        &mut self,
        now: DateTime<Utc>,
        status: SecurityStatus,
        triggers: &CauseSet,
    ) -> LivenessOutcome {
        self.last_liveness_at = now;

        if status == SecurityStatus::Locked && triggers.is_sole(DEVICE_DISCONNECTED) {
            return LivenessOutcome::Recovered;
        }
        if triggers.contains(DEVICE_DISCONNECTED) {
            debug!(
                active = triggers.len(),
                "liveness resumed but other causes hold the lockdown"
            );
        }
        LivenessOutcome::Recorded
    }

    /// Decide whether silence at `now` should lock the appliance.
    ///
    /// Never signals during the grace period, nor when the appliance is
    /// already LOCKED, nor (unless configured) during MAINTENANCE.
    pub fn check_liveness(&self, now: DateTime<Utc>, status: SecurityStatus) -> Option<TriggerCause> {
        if self.in_grace_period(now) || !self.is_silent(now) {
            return None;
        }
        match status {
            SecurityStatus::Locked | SecurityStatus::Offline => None,
            SecurityStatus::Maintenance if !self.enforce_during_maintenance => None,
            SecurityStatus::Safe | SecurityStatus::Maintenance => {
                Some(TriggerCause::new(DEVICE_DISCONNECTED))
            }
        }
    }

    /// True once the time since the last signal exceeds the timeout.
    pub fn is_silent(&self, now: DateTime<Utc>) -> bool {
        now - self.last_liveness_at > self.timeout
    }

    pub fn in_grace_period(&self, now: DateTime<Utc>) -> bool {
        now < self.boot_at + self.grace_period
    }

    /// Start a new boot window: fresh grace period, liveness clock at `now`.
    pub fn rearm(&mut self, now: DateTime<Utc>) {
        self.boot_at = now;
        self.last_liveness_at = now;
    }

    pub fn last_liveness_at(&self) -> DateTime<Utc> {
        self.last_liveness_at
    }

    pub fn boot_at(&self) -> DateTime<Utc> {
        self.boot_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use vigil_config::WatchdogConfig;
    use vigil_contracts::cause::{CauseSet, TriggerCause, DEVICE_DISCONNECTED, ENCLOSURE_OPENED};
    use vigil_contracts::status::SecurityStatus;

    use super::{LivenessOutcome, Watchdog};

    fn watchdog() -> (Watchdog, chrono::DateTime<Utc>) {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        (Watchdog::new(&WatchdogConfig::default(), t0, t0), t0)
    }

    #[test]
    fn grace_period_suppresses_timeout() {
        let (dog, t0) = watchdog();
        let t20 = t0 + Duration::seconds(20);
        assert!(dog.is_silent(t20));
        assert_eq!(dog.check_liveness(t20, SecurityStatus::Safe), None);
    }

    #[test]
    fn silence_after_grace_signals_disconnect() {
        let (dog, t0) = watchdog();
        let cause = dog.check_liveness(t0 + Duration::seconds(40), SecurityStatus::Safe);
        assert_eq!(cause, Some(TriggerCause::new(DEVICE_DISCONNECTED)));
    }

    #[test]
    fn exactly_at_threshold_is_not_silent() {
        let (mut dog, t0) = watchdog();
        let t60 = t0 + Duration::seconds(60);
        dog.record_liveness(t60, SecurityStatus::Safe, &CauseSet::default());
        assert!(!dog.is_silent(t60 + Duration::seconds(15)));
        assert!(dog.is_silent(t60 + Duration::seconds(16)));
    }

    #[test]
    fn no_signal_when_already_locked() {
        let (dog, t0) = watchdog();
        assert_eq!(dog.check_liveness(t0 + Duration::seconds(90), SecurityStatus::Locked), None);
    }

    #[test]
    fn maintenance_enforcement_is_configurable() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let later = t0 + Duration::seconds(90);

        let strict = Watchdog::new(&WatchdogConfig::default(), t0, t0);
        assert!(strict.check_liveness(later, SecurityStatus::Maintenance).is_some());

        let lenient_config = WatchdogConfig {
            enforce_during_maintenance: false,
            ..WatchdogConfig::default()
        };
        let lenient = Watchdog::new(&lenient_config, t0, t0);
        assert!(lenient.check_liveness(later, SecurityStatus::Maintenance).is_none());
    }

    #[test]
    fn recovery_only_for_sole_cause() {
        let (mut dog, t0) = watchdog();

        let mut sole = CauseSet::default();
        sole.add(TriggerCause::new(DEVICE_DISCONNECTED));
        assert_eq!(
            dog.record_liveness(t0, SecurityStatus::Locked, &sole),
            LivenessOutcome::Recovered
        );

        let mut mixed = sole.clone();
        mixed.add(TriggerCause::new(ENCLOSURE_OPENED));
        assert_eq!(
            dog.record_liveness(t0, SecurityStatus::Locked, &mixed),
            LivenessOutcome::Recorded
        );
    }

    #[test]
    fn rearm_restarts_grace() {
        let (mut dog, t0) = watchdog();
        let t100 = t0 + Duration::seconds(100);
        dog.rearm(t100);
        assert!(dog.in_grace_period(t100 + Duration::seconds(29)));
        assert!(!dog.in_grace_period(t100 + Duration::seconds(30)));
        assert_eq!(dog.last_liveness_at(), t100);
    }
}
