//! Template variable engine
//!
//! Detects, extracts, highlights and renders `<%= name %>` placeholders.

mod grammar;
mod model;
mod render;
mod suggest;

use thiserror::Error;

pub use grammar::{CLOSE, OPEN, Placeholder, Segment, extract_variables, highlight, placeholders};
pub use model::{FilledPrompt, Template};
pub use render::{MissingPolicy, Values, render, render_with};
pub use suggest::{DEFAULT_CATEGORY, suggest_category, suggest_name};

/// Errors from template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Missing values for variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Template name must not be empty")]
    EmptyName,

    #[error("Invalid template record: {0}")]
    InvalidRecord(String),
}
