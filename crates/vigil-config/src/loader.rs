//! Loading and validating `MonitorConfig`.

use std::path::Path;

use tracing::debug;

use vigil_contracts::error::{VigilError, VigilResult};

use crate::{catalog::is_well_formed_cause, schema::MonitorConfig};

/// Upper bound for every duration setting: one day.
pub const MAX_DURATION_SECS: u64 = 86_400;

impl MonitorConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `VigilError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or fails validation.
    pub fn from_toml_str(s: &str) -> VigilResult<Self> {
        let config: MonitorConfig = toml::from_str(s).map_err(|e| VigilError::ConfigError {
            reason: format!("failed to parse monitor TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as monitor configuration.
    pub fn from_file(path: &Path) -> VigilResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| VigilError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "monitor configuration loaded");
        Ok(config)
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> VigilResult<()> {
        if self.watchdog.timeout_secs == 0 {
            return Err(config_error("watchdog.timeout_secs must be greater than zero"));
        }
        for (key, secs) in [
            ("watchdog.timeout_secs", self.watchdog.timeout_secs),
            ("watchdog.grace_period_secs", self.watchdog.grace_period_secs),
            ("step_up.code_ttl_secs", self.step_up.code_ttl_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(config_error(&format!(
                    "{} = {} exceeds the {}s limit",
                    key, secs, MAX_DURATION_SECS
                )));
            }
        }
        if self.step_up.max_failures == 0 {
            return Err(config_error("step_up.max_failures must be at least 1"));
        }
        if self.step_up.code_ttl_secs == 0 {
            return Err(config_error("step_up.code_ttl_secs must be greater than zero"));
        }
        if self.ledger.offset().is_none() {
            return Err(config_error(&format!(
                "ledger.utc_offset_minutes {} is outside +/-24h",
                self.ledger.utc_offset_minutes
            )));
        }
        if let Some(name) = self.causes.extra.iter().find(|n| !is_well_formed_cause(n)) {
            return Err(config_error(&format!(
                "causes.extra entry '{}' must be upper-case letters, digits and '_'",
                name
            )));
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> VigilError {
    VigilError::ConfigError {
        reason: reason.to_string(),
    }
}
