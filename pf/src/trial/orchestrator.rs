//! Rate-limited trial runs
//!
//! One orchestrator per session. A trial is accepted only when the cooldown
//! since the last accepted trial has passed and no other trial is in flight;
//! anything else is refused at once with the remaining wait. Acceptance is
//! split from invocation so the cooldown is stamped synchronously, before any
//! network I/O starts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{BackendResolver, ModelId, TrialError};
use crate::config::TrialConfig;
use crate::llm::{CompletionRequest, LlmClient, StopReason, TokenUsage};

/// A trial as accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRequest {
    pub model: ModelId,
    pub prompt: String,
    pub submitted_at: DateTime<Utc>,
}

/// A completed trial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutput {
    pub model: ModelId,
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct CooldownState {
    last_accepted: Option<Instant>,
    in_flight: bool,
}

impl CooldownState {
    fn remaining(&self, cooldown: Duration) -> Duration {
        match self.last_accepted {
            Some(at) => cooldown.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }
}

pub struct TrialOrchestrator {
    resolver: Arc<dyn BackendResolver>,
    cooldown: Duration,
    max_tokens: u32,
    system_prompt: Option<String>,
    state: Arc<Mutex<CooldownState>>,
}

impl TrialOrchestrator {
    pub fn new(resolver: Arc<dyn BackendResolver>, config: &TrialConfig) -> Self {
        debug!(cooldown_ms = config.cooldown_ms, max_tokens = config.max_tokens, "TrialOrchestrator::new: called");
        Self {
            resolver,
            cooldown: config.cooldown(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            state: Arc::new(Mutex::new(CooldownState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CooldownState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a trial would be accepted right now
    pub fn can_run_now(&self) -> bool {
        let state = self.lock();
        !state.in_flight && state.remaining(self.cooldown).is_zero()
    }

    /// Remaining cooldown, zero when a trial may start
    pub fn time_until_next_allowed(&self) -> Duration {
        self.lock().remaining(self.cooldown)
    }

    /// Check, resolve and stamp a trial without starting it
    ///
    /// Refusals other than `RateLimited` leave the cooldown untouched.
    pub fn accept(&self, model: ModelId, prompt: &str) -> Result<AcceptedTrial, TrialError> {
        debug!(%model, prompt_len = prompt.len(), "TrialOrchestrator::accept: called");
        let mut state = self.lock();

        let remaining = state.remaining(self.cooldown);
        if state.in_flight || !remaining.is_zero() {
            debug!(in_flight = state.in_flight, ?remaining, "TrialOrchestrator::accept: rate limited");
            return Err(TrialError::RateLimited {
                retry_after: remaining,
                in_flight: state.in_flight,
            });
        }

        if prompt.trim().is_empty() {
            return Err(TrialError::EmptyPrompt);
        }

        let client = self.resolver.resolve(model)?;

        state.last_accepted = Some(Instant::now());
        state.in_flight = true;
        drop(state);

        info!(%model, "Trial accepted");
        Ok(AcceptedTrial {
            request: TrialRequest {
                model,
                prompt: prompt.to_string(),
                submitted_at: Utc::now(),
            },
            client,
            max_tokens: self.max_tokens,
            system_prompt: self.system_prompt.clone(),
            _guard: InFlightGuard {
                state: Arc::clone(&self.state),
            },
        })
    }

    /// Accept and run a trial in one step
    pub async fn run_trial(&self, model: ModelId, prompt: &str) -> Result<TrialOutput, TrialError> {
        self.accept(model, prompt)?.run().await
    }

    /// [`run_trial`](Self::run_trial) for a model given by its identifier
    pub async fn run_trial_named(&self, model: &str, prompt: &str) -> Result<TrialOutput, TrialError> {
        let model: ModelId = model.parse()?;
        self.run_trial(model, prompt).await
    }
}

/// Clears the in-flight flag however the trial ends, including cancellation
struct InFlightGuard {
    state: Arc<Mutex<CooldownState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).in_flight = false;
    }
}

/// A trial that has passed acceptance and holds the in-flight slot
pub struct AcceptedTrial {
    request: TrialRequest,
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    system_prompt: Option<String>,
    _guard: InFlightGuard,
}

impl AcceptedTrial {
    pub fn request(&self) -> &TrialRequest {
        &self.request
    }

    /// Invoke the model once
    pub async fn run(self) -> Result<TrialOutput, TrialError> {
        let model = self.request.model;
        debug!(%model, "AcceptedTrial::run: called");
        let started = Instant::now();

        let request = CompletionRequest::single(self.request.prompt, self.system_prompt, self.max_tokens);
        let response = self.client.complete(request).await.map_err(|e| {
            warn!(%model, error = %e, "Trial failed");
            TrialError::Upstream {
                model,
                message: e.to_string(),
            }
        })?;

        let text = response.content.ok_or_else(|| TrialError::Upstream {
            model,
            message: "Response contained no text".to_string(),
        })?;

        let elapsed = started.elapsed();
        info!(%model, ?elapsed, output_tokens = response.usage.output_tokens, stop_reason = ?response.stop_reason, "Trial completed");
        Ok(TrialOutput {
            model,
            text,
            stop_reason: response.stop_reason,
            usage: response.usage,
            elapsed,
        })
    }
}
