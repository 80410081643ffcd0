//! Live preview controller
//!
//! Keeps the editable form buffer and derives the variable badge list and, in
//! use-mode, the rendered preview. Derivation only happens once edits have
//! been quiet for the debounce window:
//!
//! ```text
//! Idle --edit--> Editing --edit--> Editing (timer restarted)
//!                   |
//!                   +--quiet window--> Settled --edit--> Editing
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::debounce::Debouncer;
use crate::template::{Values, extract_variables, render};

/// Form field holding the template text
pub const TEXT_FIELD: &str = "text";

/// Prefix of form fields holding variable values, e.g. `variable_values.name`
pub const VALUE_FIELD_PREFIX: &str = "variable_values.";

/// Default quiet period before derived views refresh
pub const DEFAULT_PREVIEW_DEBOUNCE: Duration = Duration::from_millis(300);

/// Form field name for a variable's value
pub fn value_field(variable: &str) -> String {
    format!("{}{}", VALUE_FIELD_PREFIX, variable)
}

/// What the host form is being used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Writing or editing a template: badges only
    Author,
    /// Filling in a template's variables: badges and rendered preview
    Use,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Editing,
    Settled,
}

/// Views derived from the buffer at the end of a quiet period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedView {
    /// Variable badge list, first-occurrence order
    pub variables: Vec<String>,
    /// Rendered output, present in use-mode only
    pub preview: Option<String>,
}

#[derive(Debug)]
pub struct PreviewController {
    mode: Mode,
    state: PreviewState,
    /// Every form field seen so far, by name
    fields: BTreeMap<String, String>,
    text: String,
    values: Values,
    timer: Debouncer,
}

impl PreviewController {
    /// Create a controller; `text` seeds the template (the fixed template in use-mode)
    pub fn new(mode: Mode, text: impl Into<String>, window: Duration) -> Self {
        let text = text.into();
        debug!(?mode, text_len = text.len(), ?window, "PreviewController::new: called");
        Self {
            mode,
            state: PreviewState::Idle,
            fields: BTreeMap::new(),
            text,
            values: Values::new(),
            timer: Debouncer::new("preview", window),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Current form fields, as a draft would record them
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// The pending refresh timer
    pub fn timer(&self) -> &Debouncer {
        &self.timer
    }

    /// Record a field's full current content and restart the quiet period
    pub fn on_edit(&mut self, field: &str, value: &str) {
        debug!(%field, value_len = value.len(), state = ?self.state, "PreviewController::on_edit: called");
        if field == TEXT_FIELD {
            self.text = value.to_string();
        } else if let Some(variable) = field.strip_prefix(VALUE_FIELD_PREFIX) {
            self.values.insert(variable.to_string(), value.to_string());
        }
        self.fields.insert(field.to_string(), value.to_string());

        self.state = PreviewState::Editing;
        self.timer.arm();
    }

    /// Finish the quiet period and derive the views
    ///
    /// Called when [`timer`](Self::timer) expires. Returns `None` when no edit
    /// is pending, e.g. after [`cancel`](Self::cancel).
    pub fn settle(&mut self) -> Option<DerivedView> {
        if self.state != PreviewState::Editing {
            self.timer.cancel();
            return None;
        }
        self.timer.cancel();
        self.state = PreviewState::Settled;
        Some(self.derive())
    }

    /// Derive the views from the current buffer without touching the timer
    pub fn derive(&self) -> DerivedView {
        let variables = extract_variables(&self.text);
        let preview = match self.mode {
            Mode::Use => Some(render(&self.text, &self.values)),
            Mode::Author => None,
        };
        debug!(variable_count = variables.len(), has_preview = preview.is_some(), "PreviewController::derive: done");
        DerivedView { variables, preview }
    }

    /// Drop any pending refresh without deriving
    pub fn cancel(&mut self) {
        self.timer.cancel();
        if self.state == PreviewState::Editing {
            self.state = PreviewState::Idle;
        }
    }
}
