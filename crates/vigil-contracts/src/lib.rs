//! # vigil-contracts
//!
//! Shared types and error contracts for the VIGIL appliance monitor.
//!
//! Every crate in the workspace imports from here. No business logic lives
//! in this crate, only data definitions, projections, and the error type.

pub mod cause;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod posture;
pub mod status;
