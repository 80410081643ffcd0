//! Session messages
//!
//! Commands and responses for the actor pattern, plus the view updates the
//! session pushes to its host.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::draft::{DraftError, DraftSnapshot};
use crate::preview::DerivedView;
use crate::template::{FilledPrompt, Template, TemplateError};
use crate::trial::{ModelId, TrialError, TrialOutput};

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session has ended")]
    Closed,

    #[error("No draft is waiting to be restored")]
    NoPendingDraft,

    #[error("Clipboard copy failed: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Trial(#[from] TrialError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// What a successful submit produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Author-mode: the template as written
    Template(Template),
    /// Use-mode: the template filled with every value
    Prompt(FilledPrompt),
}

/// Updates pushed to the host view
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    /// Variable badge list, first-occurrence order
    Badges(Vec<String>),
    /// Rendered preview (use-mode)
    Preview(String),
    /// Human-readable failure; the session keeps running
    ErrorBanner(String),
    /// A saved draft exists; the host must restore or discard it
    OfferRestore {
        saved_at: DateTime<Utc>,
        fields: DraftSnapshot,
    },
    TrialStarted {
        model: ModelId,
    },
    TrialResult(Result<TrialOutput, TrialError>),
    Copied,
    Submitted,
}

/// Commands sent to the Session actor
#[derive(Debug)]
pub enum SessionCommand {
    FieldChanged {
        field: String,
        value: String,
    },
    Attach {
        reply: oneshot::Sender<SessionResponse<bool>>,
    },
    RestoreDraft {
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    DiscardDraft {
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    Submit {
        reply: oneshot::Sender<SessionResponse<Submission>>,
    },
    RequestTrial {
        model: String,
        reply: oneshot::Sender<SessionResponse<ModelId>>,
    },
    CopyPreview {
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    CurrentView {
        reply: oneshot::Sender<DerivedView>,
    },
    Detach {
        reply: oneshot::Sender<()>,
    },
}
