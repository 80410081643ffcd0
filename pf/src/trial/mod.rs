//! Trial runs against external models
//!
//! A closed set of [`ModelId`]s, resolved to clients through one
//! [`BackendResolver`] lookup, gated by the per-session
//! [`TrialOrchestrator`] cooldown.

mod backend;
mod error;
mod model;
mod orchestrator;

pub use backend::{BackendResolver, ConfiguredBackends};
pub use error::TrialError;
pub use model::{ModelId, Provider};
pub use orchestrator::{AcceptedTrial, TrialOrchestrator, TrialOutput, TrialRequest};
