//! Runtime error types for the VIGIL appliance monitor.
//!
//! All fallible operations return `VigilResult<T>`. Two conditions that look
//! like errors are deliberately not here: an event reported while sensing is
//! disabled is an `EventDisposition::Ignored` acknowledgement, and a broken
//! hash chain is a `VerifyReport` finding.

use thiserror::Error;

/// The unified error type for the VIGIL crates.
#[derive(Debug, Error)]
pub enum VigilError {
    /// The step-up code did not match the active code.
    ///
    /// `locked` is true when this failure reached the attempt threshold and
    /// the monitor has been forced into LOCKED as a consequence.
    #[error("invalid step-up code ({failures} consecutive failure(s), locked: {locked})")]
    InvalidCode { failures: u32, locked: bool },

    /// A step-up code was verified while none was outstanding.
    #[error("no step-up code is active")]
    NoActiveCode,

    /// A security-relaxing action was attempted without a step-up approval.
    #[error("step-up approval required for '{action}'")]
    StepUpRequired { action: String },

    /// The requested transition is not legal from the current status.
    #[error("cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    /// A trigger cause outside the configured catalog was reported.
    #[error("unknown trigger cause '{cause}'")]
    UnknownCause { cause: String },

    /// An inbound report was malformed (empty name, unknown status label).
    #[error("invalid report: {reason}")]
    InvalidReport { reason: String },

    /// The durable store could not be read or written.
    ///
    /// On the append path this is downgraded to a warning on the
    /// acknowledgement; the in-memory decision is never rolled back.
    #[error("persistence failure: {reason}")]
    PersistenceFailure { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The monitor's state lock was poisoned by a panicking holder.
    #[error("state lock poisoned: {reason}")]
    StateLockPoisoned { reason: String },
}

/// Convenience alias used throughout the VIGIL crates.
pub type VigilResult<T> = Result<T, VigilError>;
