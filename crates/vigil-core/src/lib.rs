//! # vigil-core
//!
//! The serialized security state machine for the VIGIL appliance monitor.
//!
//! This crate provides:
//! - The collaborator traits (`Notifier`, `Clock`, `CodeGenerator`) and
//!   their stock implementations
//! - The poll-driven liveness `Watchdog`
//! - The `StepUpGate` that mints single-use `StepUpApproval` tokens
//! - `SecurityMonitor`, which owns all of the above plus the ledger behind
//!   one lock and exposes the boundary operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil_config::MonitorConfig;
//! use vigil_core::{Collaborators, SecurityMonitor, traits::TracingNotifier};
//! use vigil_contracts::status::ReportedStatus;
//! use vigil_ledger::JsonFileStore;
//!
//! let store = Arc::new(JsonFileStore::open("/var/lib/vigil")?);
//! let monitor = SecurityMonitor::open(
//!     MonitorConfig::default(),
//!     Collaborators::new(store, Arc::new(TracingNotifier)),
//! )?;
//! monitor.report_event("ENCLOSURE_OPENED", ReportedStatus::Locked)?;
//! assert!(monitor.query_status()?.locked);
//! ```

pub mod monitor;
pub mod stepup;
pub mod traits;
pub mod watchdog;

pub use monitor::{Collaborators, EventDisposition, LivenessAck, SecurityMonitor, StepUpTicket, TransitionAck};
pub use stepup::{StepUpApproval, StepUpGate};
pub use watchdog::Watchdog;
