//! Trial error types

use std::time::Duration;

use thiserror::Error;

use super::ModelId;

/// Why a trial was refused or failed
#[derive(Debug, Clone, Error)]
pub enum TrialError {
    /// Refused by the cooldown, or because another trial holds the slot
    #[error("{}", rate_limited_message(.retry_after, .in_flight))]
    RateLimited { retry_after: Duration, in_flight: bool },

    #[error("No credentials for {model}: set the {env_var} environment variable")]
    MissingCredentials { model: ModelId, env_var: String },

    #[error("Unknown model '{id}'")]
    InvalidModel { id: String },

    #[error("{model} request failed: {message}")]
    Upstream { model: ModelId, message: String },

    #[error("Prompt is empty")]
    EmptyPrompt,
}

fn rate_limited_message(retry_after: &Duration, in_flight: &bool) -> String {
    match (*in_flight, whole_seconds(retry_after)) {
        (true, 0) => "A trial is still running, try again when it finishes".to_string(),
        (true, secs) => format!("A trial is still running, try again in {}s", secs),
        (false, secs) => format!("Trials are cooling down, try again in {}s", secs),
    }
}

/// Round up so a sub-second wait never reads as "0s"
fn whole_seconds(duration: &Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}
