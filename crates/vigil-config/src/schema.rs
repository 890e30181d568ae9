//! Configuration schema.
//!
//! A `MonitorConfig` is deserialized from TOML. Every section and every key
//! is optional; omitted values take the defaults documented on each field.
//!
//! Example:
//! ```toml
//! [watchdog]
//! timeout_secs = 15
//! grace_period_secs = 30
//!
//! [step_up]
//! max_failures = 3
//!
//! [ledger]
//! capacity = 1000
//! utc_offset_minutes = 330
//!
//! [alerts]
//! recipient = "secops@example.test"
//!
//! [causes]
//! strict = true
//! extra = ["FAN_STALL"]
//! ```

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub watchdog: WatchdogConfig,
    pub step_up: StepUpConfig,
    pub ledger: LedgerConfig,
    pub alerts: AlertConfig,
    pub causes: CauseConfig,
}

/// Liveness watchdog timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Silence longer than this (seconds) is a lost device. Default 15.
    pub timeout_secs: u64,
    /// After a boot or reset, timeouts are not signalled for this long. Default 30.
    pub grace_period_secs: u64,
    /// Whether silence during MAINTENANCE still locks. Default true.
    pub enforce_during_maintenance: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            grace_period_secs: 30,
            enforce_during_maintenance: true,
        }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::seconds(self.timeout_secs as i64)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::seconds(self.grace_period_secs as i64)
    }
}

/// One-time code policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepUpConfig {
    /// Consecutive wrong codes that force a lockdown. Default 3.
    pub max_failures: u32,
    /// Seconds an issued code stays valid. Default 300.
    pub code_ttl_secs: u64,
    /// Whether entering MAINTENANCE needs a step-up approval. Default true.
    pub required_for_maintenance: bool,
    /// Whether leaving MAINTENANCE needs a step-up approval. Default true.
    pub required_for_reactivate: bool,
}

impl Default for StepUpConfig {
    fn default() -> Self {
        Self {
            max_failures: 3,
            code_ttl_secs: 300,
            required_for_maintenance: true,
            required_for_reactivate: true,
        }
    }
}

impl StepUpConfig {
    pub fn code_ttl(&self) -> Duration {
        Duration::seconds(self.code_ttl_secs as i64)
    }
}

/// Ledger retention and time convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Entries retained before the oldest are evicted. `0` keeps everything.
    /// Default 1000.
    pub capacity: usize,
    /// Offset from UTC, in minutes, used for entry timestamps. Default 330
    /// (UTC+05:30, the reference deployment's local time).
    pub utc_offset_minutes: i32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            utc_offset_minutes: 330,
        }
    }
}

impl LedgerConfig {
    /// Capacity as a retention bound; `None` means unbounded.
    pub fn retention(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// The configured offset, or `None` if it is out of range.
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

/// Notification routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Initial recipient. Settings persisted by an operator take precedence.
    pub recipient: Option<String>,
    /// Prepended to every notification subject. Default `[HSM ALERT]`.
    pub subject_prefix: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            subject_prefix: "[HSM ALERT]".to_string(),
        }
    }
}

/// Which trigger cause names are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CauseConfig {
    /// Reject LOCKED reports whose event name is not in the catalog. Default true.
    pub strict: bool,
    /// Names accepted in addition to the built-in causes.
    pub extra: Vec<String>,
}

impl Default for CauseConfig {
    fn default() -> Self {
        Self {
            strict: true,
            extra: Vec::new(),
        }
    }
}
