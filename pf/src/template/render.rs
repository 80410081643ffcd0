//! Placeholder substitution

use std::collections::HashMap;

use regex::Captures;
use tracing::debug;

use super::TemplateError;
use super::grammar::{self, extract_variables};

/// Mapping from variable name to its value
pub type Values = HashMap<String, String>;

/// What to do with a placeholder whose name has no value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Leave the placeholder text untouched
    #[default]
    Keep,
    /// Substitute `[NAME]` so the preview shows where input goes
    Sample,
    /// Fail with [`TemplateError::MissingVariables`]
    Error,
}

/// Substitute every placeholder whose name is in `values`
///
/// Placeholders without a value are kept verbatim, and keys that do not occur
/// in `text` are ignored. Values are inserted as-is and never re-scanned.
pub fn render(text: &str, values: &Values) -> String {
    // Keep cannot fail
    substitute(text, values, MissingPolicy::Keep)
}

/// Render with an explicit policy for placeholders that have no value
pub fn render_with(text: &str, values: &Values, policy: MissingPolicy) -> Result<String, TemplateError> {
    debug!(text_len = text.len(), value_count = values.len(), ?policy, "render_with: called");
    if policy == MissingPolicy::Error {
        let missing: Vec<String> = extract_variables(text)
            .into_iter()
            .filter(|name| !values.contains_key(name))
            .collect();
        if !missing.is_empty() {
            debug!(?missing, "render_with: missing variables");
            return Err(TemplateError::MissingVariables(missing));
        }
    }
    Ok(substitute(text, values, policy))
}

fn substitute(text: &str, values: &Values, policy: MissingPolicy) -> String {
    grammar::pattern()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            match values.get(name) {
                Some(value) => value.clone(),
                None if policy == MissingPolicy::Sample => format!("[{}]", name.to_uppercase()),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
