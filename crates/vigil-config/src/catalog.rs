//! The closed catalog of trigger causes accepted at the boundary.
//!
//! Inside the monitor a cause is just a string. Letting any string in would
//! mean a typo in a sensor's firmware creates a cause no operator expects;
//! the catalog rejects it before any state changes.

use std::collections::BTreeSet;

use tracing::warn;

use vigil_contracts::{
    cause::{TriggerCause, BUILTIN_CAUSES},
    error::{VigilError, VigilResult},
};

use crate::schema::CauseConfig;

#[derive(Debug, Clone)]
pub struct CauseCatalog {
    known: BTreeSet<String>,
    strict: bool,
}

impl CauseCatalog {
    /// Built-in causes plus `config.extra`.
    pub fn from_config(config: &CauseConfig) -> Self {
        let known = BUILTIN_CAUSES
            .iter()
            .map(|c| c.to_string())
            .chain(config.extra.iter().cloned())
            .collect();
        Self {
            known,
            strict: config.strict,
        }
    }

    /// A catalog that accepts any well-formed name.
    pub fn permissive() -> Self {
        Self {
            known: BUILTIN_CAUSES.iter().map(|c| c.to_string()).collect(),
            strict: false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Admit `name` as a trigger cause.
    ///
    /// Empty names are always rejected. In strict mode, names outside the
    /// catalog are rejected with `UnknownCause`.
    pub fn admit(&self, name: &str) -> VigilResult<TriggerCause> {
        if name.trim().is_empty() {
            return Err(VigilError::InvalidReport {
                reason: "event name must not be empty".to_string(),
            });
        }
        if self.strict && !self.contains(name) {
            warn!(cause = %name, "rejected trigger cause outside catalog");
            return Err(VigilError::UnknownCause {
                cause: name.to_string(),
            });
        }
        Ok(TriggerCause::new(name))
    }
}

impl Default for CauseCatalog {
    fn default() -> Self {
        Self::from_config(&CauseConfig::default())
    }
}

/// Upper-case ASCII letters, digits and underscores, non-empty.
pub fn is_well_formed_cause(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
