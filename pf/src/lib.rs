//! PromptForge - prompt template authoring
//!
//! PromptForge turns `<%= name %>` templates into finished prompts while they
//! are being written. A form session keeps the variable badges and rendered
//! preview current as the user types, autosaves drafts, and can send the
//! rendered prompt to a model for a quick trial.
//!
//! # Core Concepts
//!
//! - **Fail-open rendering**: unresolved placeholders stay in the output
//! - **Debounced derivation**: only the final state of a burst of edits is shown
//! - **Explicit restore**: a saved draft is offered, never silently applied
//! - **Cooldown at acceptance**: trials are spaced from when they start
//!
//! # Modules
//!
//! - [`template`] - Placeholder grammar, rendering and the template record
//! - [`preview`] - Debounced badge and preview derivation
//! - [`draft`] - Draft snapshots over a key-value store
//! - [`trial`] - Model selection and rate-limited trial runs
//! - [`session`] - Per-form actor tying the above together
//! - [`llm`] - Provider clients
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod debounce;
pub mod draft;
pub mod llm;
pub mod preview;
pub mod repl;
pub mod session;
pub mod template;
pub mod trial;

// Re-export commonly used types
pub use config::Config;
pub use debounce::Debouncer;
pub use draft::{DraftError, DraftSnapshot, DraftStore, SavedDraft};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient};
pub use preview::{DerivedView, Mode, PreviewController, PreviewState};
pub use session::{
    Clipboard, CommandClipboard, Session, SessionError, SessionHandle, SessionOptions, SessionServices, Submission,
    ViewUpdate,
};
pub use template::{
    FilledPrompt, MissingPolicy, Segment, Template, TemplateError, Values, extract_variables, highlight, render,
    render_with,
};
pub use trial::{BackendResolver, ConfiguredBackends, ModelId, Provider, TrialError, TrialOrchestrator, TrialOutput};
