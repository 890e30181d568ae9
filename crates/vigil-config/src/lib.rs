//! # vigil-config
//!
//! TOML-driven configuration for the VIGIL monitor, and the cause catalog
//! that validates trigger causes at the boundary.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use vigil_config::{CauseCatalog, MonitorConfig};
//!
//! let config = MonitorConfig::from_file(Path::new("config/appliance.toml"))?;
//! let catalog = CauseCatalog::from_config(&config.causes);
//! ```

pub mod catalog;
pub mod loader;
pub mod schema;

pub use catalog::CauseCatalog;
pub use schema::{AlertConfig, CauseConfig, LedgerConfig, MonitorConfig, StepUpConfig, WatchdogConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use vigil_contracts::{cause::ENCLOSURE_OPENED, error::VigilError};

    use crate::{CauseCatalog, CauseConfig, MonitorConfig};

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.watchdog.timeout_secs, 15);
        assert_eq!(config.watchdog.grace_period_secs, 30);
        assert_eq!(config.step_up.max_failures, 3);
        assert_eq!(config.ledger.retention(), Some(1000));
        assert_eq!(config.alerts.subject_prefix, "[HSM ALERT]");
        assert!(config.causes.strict);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml = r#"
            [watchdog]
            timeout_secs = 60
        "#;
        let config = MonitorConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.watchdog.timeout_secs, 60);
        assert_eq!(config.watchdog.grace_period_secs, 30);
        assert!(config.watchdog.enforce_during_maintenance);
    }

    #[test]
    fn test_full_document() {
        let toml = r#"
            [watchdog]
            timeout_secs = 10
            grace_period_secs = 20
            enforce_during_maintenance = false

            [step_up]
            max_failures = 5
            code_ttl_secs = 120
            required_for_maintenance = false
            required_for_reactivate = false

            [ledger]
            capacity = 0
            utc_offset_minutes = -300

            [alerts]
            recipient = "secops@example.test"
            subject_prefix = "[VAULT]"

            [causes]
            strict = false
            extra = ["FAN_STALL"]
        "#;
        let config = MonitorConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ledger.retention(), None);
        assert_eq!(config.ledger.offset().unwrap().local_minus_utc(), -300 * 60);
        assert_eq!(config.alerts.recipient.as_deref(), Some("secops@example.test"));
        assert_eq!(config.step_up.code_ttl().num_seconds(), 120);
        assert!(!config.causes.strict);
    }

    // ── Validation ────────────────────────────────────────────────────────────

    fn expect_config_error(toml: &str, needle: &str) {
        match MonitorConfig::from_toml_str(toml) {
            Err(VigilError::ConfigError { reason }) => {
                assert!(reason.contains(needle), "reason '{reason}' should mention '{needle}'")
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        expect_config_error("[watchdog]\ntimeout_secs = 0", "timeout_secs");
    }

    #[test]
    fn test_durations_longer_than_a_day_rejected() {
        expect_config_error("[watchdog]\ntimeout_secs = 9223372036854775807", "watchdog.timeout_secs");
        expect_config_error("[watchdog]\ngrace_period_secs = 86401", "watchdog.grace_period_secs");
        expect_config_error("[step_up]\ncode_ttl_secs = 86401", "step_up.code_ttl_secs");

        let config = MonitorConfig::from_toml_str("[watchdog]\ntimeout_secs = 86400").unwrap();
        assert_eq!(config.watchdog.timeout().num_seconds(), 86_400);
    }

    #[test]
    fn test_zero_failures_rejected() {
        expect_config_error("[step_up]\nmax_failures = 0", "max_failures");
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        expect_config_error("[ledger]\nutc_offset_minutes = 1500", "utc_offset_minutes");
    }

    #[test]
    fn test_malformed_extra_cause_rejected() {
        expect_config_error("[causes]\nextra = [\"fan stall\"]", "fan stall");
    }

    #[test]
    fn test_malformed_toml_rejected() {
        expect_config_error("[watchdog\ntimeout_secs = 1", "failed to parse");
    }

    #[test]
    fn test_unknown_type_rejected() {
        expect_config_error("[watchdog]\ntimeout_secs = \"soon\"", "failed to parse");
    }

    // ── Catalog ───────────────────────────────────────────────────────────────

    #[test]
    fn test_strict_catalog_admits_builtin_and_extra() {
        let catalog = CauseCatalog::from_config(&CauseConfig {
            strict: true,
            extra: vec!["FAN_STALL".to_string()],
        });
        assert_eq!(catalog.admit(ENCLOSURE_OPENED).unwrap().as_str(), ENCLOSURE_OPENED);
        assert!(catalog.admit("FAN_STALL").is_ok());
    }

    #[test]
    fn test_strict_catalog_rejects_typo() {
        let catalog = CauseCatalog::default();
        match catalog.admit("ENCLOSURE_OPEND") {
            Err(VigilError::UnknownCause { cause }) => assert_eq!(cause, "ENCLOSURE_OPEND"),
            other => panic!("expected UnknownCause, got {:?}", other),
        }
    }

    #[test]
    fn test_permissive_catalog_admits_anything_non_empty() {
        let catalog = CauseCatalog::permissive();
        assert!(catalog.admit("SOMETHING_NEW").is_ok());
        assert!(matches!(catalog.admit(" "), Err(VigilError::InvalidReport { .. })));
    }
}
