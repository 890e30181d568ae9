//! Collaborator traits and their stock implementations.
//!
//! The monitor reaches the outside world only through these seams:
//!
//! - `Notifier`:      best-effort outbound alerts; failure is logged, never fatal
//! - `Clock`:         the single source of "now" for timestamps and the watchdog
//! - `CodeGenerator`: where step-up codes come from
//!
//! Persistence is the fourth seam, `vigil_ledger::DurableStore`.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

use vigil_contracts::{error::VigilResult, notify::Notification};

/// Delivers a notification. Implementations may fail; the monitor logs the
/// failure and carries on. Never called while the monitor's lock is held.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> VigilResult<()>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Produces six-digit step-up codes.
pub trait CodeGenerator: Send {
    fn generate(&mut self) -> String;
}

// ── Notifier ──────────────────────────────────────────────────────────────────

/// Emits each notification as a structured `info!` record.
///
/// The default when no delivery channel is wired: alerts still leave a
/// trail in the logs. The body is omitted since it may carry a step-up code.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) -> VigilResult<()> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification"
        );
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ── CodeGenerator ─────────────────────────────────────────────────────────────

/// Uniform codes in `100000..=999999` from the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&mut self) -> String {
        let value: u32 = rand::rngs::OsRng.gen_range(100_000..1_000_000);
        value.to_string()
    }
}

/// Hands out a fixed script of codes, repeating the last one when the
/// script runs out. For simulations and tests.
#[derive(Debug, Clone)]
pub struct ScriptedCodes {
    script: VecDeque<String>,
    last: String,
}

impl ScriptedCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: codes.into_iter().map(Into::into).collect(),
            last: "000000".to_string(),
        }
    }
}

impl CodeGenerator for ScriptedCodes {
    fn generate(&mut self) -> String {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn random_codes_are_six_digits() {
        let mut codes = RandomCodeGenerator;
        for _ in 0..200 {
            let code = codes.generate();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn scripted_codes_repeat_the_last() {
        let mut codes = ScriptedCodes::new(["123456", "654321"]);
        assert_eq!(codes.generate(), "123456");
        assert_eq!(codes.generate(), "654321");
        assert_eq!(codes.generate(), "654321");

        let mut empty = ScriptedCodes::new(Vec::<String>::new());
        assert_eq!(empty.generate(), "000000");
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(15));
        assert_eq!(clock.now(), start + Duration::seconds(15));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
