//! Outbound notification types.

use serde::{Deserialize, Serialize};

/// One best-effort message handed to a `Notifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// Operator-managed alert routing, persisted alongside the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Where alerts and step-up codes are delivered. `None` disables delivery.
    pub recipient: Option<String>,
}

impl AlertSettings {
    pub fn is_configured(&self) -> bool {
        self.recipient.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}
