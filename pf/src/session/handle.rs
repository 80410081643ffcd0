//! SessionHandle - host interface to a running session

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{SessionCommand, SessionError, SessionResponse, Submission};
use crate::preview::DerivedView;
use crate::trial::{ModelId, TrialOrchestrator};

/// Cloneable handle for sending host events to a session
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    tx: mpsc::Sender<SessionCommand>,
    trials: Arc<TrialOrchestrator>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, tx: mpsc::Sender<SessionCommand>, trials: Arc<TrialOrchestrator>) -> Self {
        Self { id, tx, trials }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> SessionResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).await.map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// A form field now holds `value`
    pub async fn field_changed(&self, field: &str, value: &str) -> SessionResponse<()> {
        debug!(session = %self.id, %field, "SessionHandle::field_changed: called");
        self.tx
            .send(SessionCommand::FieldChanged {
                field: field.to_string(),
                value: value.to_string(),
            })
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Publish the initial view and look for a saved draft
    ///
    /// Returns true when a restore has been offered.
    pub async fn attach(&self) -> SessionResponse<bool> {
        debug!(session = %self.id, "SessionHandle::attach: called");
        self.request(|reply| SessionCommand::Attach { reply }).await?
    }

    /// Accept the offered draft
    pub async fn restore_draft(&self) -> SessionResponse<()> {
        debug!(session = %self.id, "SessionHandle::restore_draft: called");
        self.request(|reply| SessionCommand::RestoreDraft { reply }).await?
    }

    /// Decline the offered draft and delete it
    pub async fn discard_draft(&self) -> SessionResponse<()> {
        debug!(session = %self.id, "SessionHandle::discard_draft: called");
        self.request(|reply| SessionCommand::DiscardDraft { reply }).await?
    }

    pub async fn submit(&self) -> SessionResponse<Submission> {
        debug!(session = %self.id, "SessionHandle::submit: called");
        self.request(|reply| SessionCommand::Submit { reply }).await?
    }

    /// Start a trial; the outcome arrives later as a view update
    pub async fn request_trial(&self, model: &str) -> SessionResponse<ModelId> {
        debug!(session = %self.id, %model, "SessionHandle::request_trial: called");
        self.request(|reply| SessionCommand::RequestTrial {
            model: model.to_string(),
            reply,
        })
        .await?
    }

    pub async fn copy_preview(&self) -> SessionResponse<()> {
        debug!(session = %self.id, "SessionHandle::copy_preview: called");
        self.request(|reply| SessionCommand::CopyPreview { reply }).await?
    }

    /// Views derived from the buffer as it is right now
    pub async fn current_view(&self) -> SessionResponse<DerivedView> {
        self.request(|reply| SessionCommand::CurrentView { reply }).await
    }

    /// Stop the session, dropping any pending preview or autosave
    pub async fn detach(&self) -> SessionResponse<()> {
        debug!(session = %self.id, "SessionHandle::detach: called");
        self.request(|reply| SessionCommand::Detach { reply }).await
    }

    /// Time until the next trial may start
    pub fn cooldown_remaining(&self) -> Duration {
        self.trials.time_until_next_allowed()
    }

    pub fn can_run_trial(&self) -> bool {
        self.trials.can_run_now()
    }
}
