//! Trigger causes and the set of causes holding the appliance LOCKED.
//!
//! Causes are an open string set so new sensors can report without a code
//! change. The catalog in `vigil-config` narrows that set at the boundary.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Enclosure lid or service panel opened.
pub const ENCLOSURE_OPENED: &str = "ENCLOSURE_OPENED";
/// Accelerometer reported movement of a fixed appliance.
pub const PHYSICAL_MOVEMENT: &str = "PHYSICAL_MOVEMENT";
/// Supply-rail glitch consistent with fault injection.
pub const VOLTAGE_GLITCH: &str = "VOLTAGE_GLITCH";
/// On-device anomaly model flagged the sensor vector.
pub const AI_ANOMALY: &str = "AI_ANOMALY";
/// Entropy-collapse pattern reported by the key-usage monitor.
pub const QUANTUM_DECRYPTION_ATTEMPT: &str = "QUANTUM_DECRYPTION_ATTEMPT";
/// Liveness signal silent past the watchdog timeout.
pub const DEVICE_DISCONNECTED: &str = "DEVICE_DISCONNECTED";
/// Step-up code guessed wrong too many times.
pub const STEP_UP_LOCKOUT: &str = "STEP_UP_LOCKOUT";
/// Administrator-initiated key destruction.
pub const KEY_ZEROIZED: &str = "KEY_ZEROIZED";

/// Every cause VIGIL itself knows about.
pub const BUILTIN_CAUSES: &[&str] = &[
    ENCLOSURE_OPENED,
    PHYSICAL_MOVEMENT,
    VOLTAGE_GLITCH,
    AI_ANOMALY,
    QUANTUM_DECRYPTION_ATTEMPT,
    DEVICE_DISCONNECTED,
    STEP_UP_LOCKOUT,
    KEY_ZEROIZED,
];

/// A named reason contributing to a LOCKED state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerCause(pub String);

impl TriggerCause {
    /// Construct a cause from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The active trigger causes. Set semantics: adding a cause twice is a no-op.
///
/// Ordered so status reports and persisted snapshots are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CauseSet {
    inner: BTreeSet<TriggerCause>,
}

impl CauseSet {
    /// Add a cause. Returns false if it was already active.
    pub fn add(&mut self, cause: TriggerCause) -> bool {
        self.inner.insert(cause)
    }

    /// Remove a cause. Returns false if it was not active.
    pub fn remove(&mut self, cause: &str) -> bool {
        self.inner.remove(&TriggerCause::new(cause))
    }

    pub fn contains(&self, cause: &str) -> bool {
        self.inner.contains(&TriggerCause::new(cause))
    }

    /// True if `cause` is the one and only active cause.
    pub fn is_sole(&self, cause: &str) -> bool {
        self.inner.len() == 1 && self.contains(cause)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerCause> {
        self.inner.iter()
    }

    /// Cause names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.inner.iter().map(|c| c.0.clone()).collect()
    }
}
