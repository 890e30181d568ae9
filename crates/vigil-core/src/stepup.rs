//! Step-up gate: one short-lived six-digit code at a time.
//!
//! A correct code yields a `StepUpApproval`, the single-use token every
//! security-relaxing transition consumes. Repeated wrong guesses are treated
//! as a tamper signal: at the failure threshold the code is discarded and
//! the caller learns the gate is exhausted, which the monitor turns into a
//! lockdown.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use vigil_config::StepUpConfig;

use crate::traits::CodeGenerator;

/// Proof that a step-up code was verified.
///
/// Only the gate can mint one, and relaxing transitions take it by value,
/// so each verification authorizes exactly one action.
#[derive(Debug)]
pub struct StepUpApproval {
    approved_at: DateTime<Utc>,
}

impl StepUpApproval {
    pub fn approved_at(&self) -> DateTime<Utc> {
        self.approved_at
    }
}

/// A freshly issued code, handed to the notifier for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a candidate code was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepUpRejection {
    /// Nothing issued, already consumed, discarded, or expired.
    NoActiveCode,
    /// Wrong code; the active code stays live.
    Invalid { failures: u32 },
    /// Wrong code that reached the threshold; the active code is gone.
    Exhausted { failures: u32 },
}

#[derive(Debug, Clone)]
struct ActiveCode {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct StepUpGate {
    generator: Box<dyn CodeGenerator>,
    active: Option<ActiveCode>,
    failures: u32,
    max_failures: u32,
    ttl: Duration,
}

impl StepUpGate {
    pub fn new(config: &StepUpConfig, generator: Box<dyn CodeGenerator>) -> Self {
        Self {
            generator,
            active: None,
            failures: 0,
            max_failures: config.max_failures,
            ttl: config.code_ttl(),
        }
    }

    /// Issue a new code, silently replacing any outstanding one.
    pub fn issue(&mut self, now: DateTime<Utc>) -> IssuedCode {
        let replaced = self.active.is_some();
        let code = self.generator.generate();
        let expires_at = now + self.ttl;

        self.active = Some(ActiveCode {
            value: code.clone(),
            expires_at,
        });
        self.failures = 0;

        info!(replaced, expires_at = %expires_at, "step-up code issued");
        IssuedCode { code, expires_at }
    }

    /// Check `candidate` against the active code.
    pub fn verify(&mut self, candidate: &str, now: DateTime<Utc>) -> Result<StepUpApproval, StepUpRejection> {
        let Some(active) = &self.active else {
            debug!("step-up verification with no active code");
            return Err(StepUpRejection::NoActiveCode);
        };

        if now > active.expires_at {
            debug!(expired_at = %active.expires_at, "step-up code expired");
            self.discard();
            return Err(StepUpRejection::NoActiveCode);
        }

        if candidate == active.value {
            self.discard();
            info!("step-up code accepted");
            return Ok(StepUpApproval { approved_at: now });
        }

        self.failures += 1;
        let failures = self.failures;
        if failures >= self.max_failures {
            warn!(failures, "step-up failure threshold reached, code discarded");
            self.discard();
            return Err(StepUpRejection::Exhausted { failures });
        }

        warn!(failures, remaining = self.max_failures - failures, "step-up code rejected");
        Err(StepUpRejection::Invalid { failures })
    }

    /// Consecutive failures against the current code.
    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    pub fn has_active_code(&self) -> bool {
        self.active.is_some()
    }

    fn discard(&mut self) {
        self.active = None;
        self.failures = 0;
    }
}
