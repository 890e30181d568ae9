//! Security status, the monitor snapshot, and the projections built from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cause::CauseSet,
    error::{VigilError, VigilResult},
};

/// The appliance's security status.
///
/// `Offline` is display-only: the monitor never stores it. It is what
/// `query_status` reports while liveness is silent but the grace window
/// still prevents escalation to `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityStatus {
    Safe,
    Locked,
    Maintenance,
    Offline,
}

impl SecurityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityStatus::Safe => "SAFE",
            SecurityStatus::Locked => "LOCKED",
            SecurityStatus::Maintenance => "MAINTENANCE",
            SecurityStatus::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status label a sensor may attach to a reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportedStatus {
    /// The event is a tamper signal; the event name becomes a trigger cause.
    Locked,
    /// Informational; recorded in the ledger only.
    Safe,
}

impl ReportedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportedStatus::Locked => "LOCKED",
            ReportedStatus::Safe => "SAFE",
        }
    }
}

impl FromStr for ReportedStatus {
    type Err = VigilError;

    fn from_str(s: &str) -> VigilResult<Self> {
        match s {
            "LOCKED" => Ok(ReportedStatus::Locked),
            "SAFE" => Ok(ReportedStatus::Safe),
            other => Err(VigilError::InvalidReport {
                reason: format!("status label must be LOCKED or SAFE, got '{}'", other),
            }),
        }
    }
}

/// Identifier for one boot window (process start or administrative reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BootId(pub uuid::Uuid);

impl BootId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BootId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything the state machine knows about the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySnapshot {
    /// Stored status. Never `Offline`.
    pub status: SecurityStatus,
    /// Active trigger causes. Non-empty only while `Locked`.
    pub triggers: CauseSet,
    /// When false, inbound tamper reports are ignored.
    pub sensing_enabled: bool,
    /// Key material is considered destroyed until the next reset/recovery.
    pub zeroized: bool,
    /// Most recent accepted liveness signal.
    pub last_liveness_at: DateTime<Utc>,
    /// Start of the current boot window; anchors the grace period.
    pub boot_at: DateTime<Utc>,
    pub boot_id: BootId,
}

impl SecuritySnapshot {
    /// A freshly booted, armed, SAFE appliance.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            status: SecurityStatus::Safe,
            triggers: CauseSet::default(),
            sensing_enabled: true,
            zeroized: false,
            last_liveness_at: now,
            boot_at: now,
            boot_id: BootId::new(),
        }
    }

    /// Rebuild after a restart.
    ///
    /// Status and causes come from `state`; the liveness clock and boot
    /// window restart at `now` so the device gets a full grace period.
    pub fn restore(state: PersistedState, now: DateTime<Utc>) -> Self {
        let status = match state.status {
            SecurityStatus::Offline => SecurityStatus::Safe,
            other => other,
        };
        Self {
            status,
            triggers: state.triggers,
            sensing_enabled: state.sensing_enabled,
            zeroized: state.zeroized,
            last_liveness_at: now,
            boot_at: now,
            boot_id: BootId::new(),
        }
    }

    /// The fields that must survive a restart.
    pub fn to_persisted(&self, saved_at: DateTime<Utc>) -> PersistedState {
        PersistedState {
            status: self.status,
            triggers: self.triggers.clone(),
            sensing_enabled: self.sensing_enabled,
            zeroized: self.zeroized,
            saved_at,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.status == SecurityStatus::Locked
    }
}

/// Durable subset of [`SecuritySnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub status: SecurityStatus,
    pub triggers: CauseSet,
    pub sensing_enabled: bool,
    pub zeroized: bool,
    pub saved_at: DateTime<Utc>,
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Displayed status (may be `Offline`).
    pub status: SecurityStatus,
    pub locked: bool,
    pub triggers: Vec<String>,
    pub boot_id: BootId,
    pub checked_at: DateTime<Utc>,
}

/// What the physical appliance polls for: whether to hold keys, arm
/// sensors, and whether its key material must be treated as destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceDirective {
    pub locked: bool,
    pub sensing_enabled: bool,
    pub zeroized: bool,
}

impl From<&SecuritySnapshot> for ApplianceDirective {
    fn from(snapshot: &SecuritySnapshot) -> Self {
        Self {
            locked: snapshot.is_locked(),
            sensing_enabled: snapshot.sensing_enabled,
            zeroized: snapshot.zeroized,
        }
    }
}
