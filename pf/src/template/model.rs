//! Template record and strict fill

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TemplateError;
use super::grammar::extract_variables;
use super::render::{MissingPolicy, Values, render_with};

/// A named, reusable prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Unique name for the template
    pub name: String,

    /// Brief description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template text containing `<%= name %>` placeholders
    pub text: String,

    /// Variables used in `text`, in first-occurrence order
    #[serde(default)]
    pub variables: Vec<String>,

    /// Template category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Template {
    /// Create a template, deriving its variable list from `text`
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Result<Self, TemplateError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TemplateError::EmptyName);
        }
        let text = text.into();
        let variables = extract_variables(&text);
        debug!(%name, variable_count = variables.len(), "Template::new: called");
        Ok(Self {
            name,
            description: None,
            text,
            variables,
            category: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Parse a saved template record, correcting its variable list
    pub fn from_yaml(yaml: &str) -> Result<Self, TemplateError> {
        let mut template: Template =
            serde_yaml::from_str(yaml).map_err(|e| TemplateError::InvalidRecord(e.to_string()))?;
        if template.name.trim().is_empty() {
            return Err(TemplateError::EmptyName);
        }
        template.normalize();
        Ok(template)
    }

    /// Load a template file
    ///
    /// `.yml`/`.yaml` files hold a full record as written by author-mode
    /// submit; anything else is bare template text named after the file stem.
    pub fn from_file(path: &Path) -> eyre::Result<Self> {
        debug!(?path, "Template::from_file: called");
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read template {}: {}", path.display(), e))?;

        let is_record = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"));

        let template = if is_record {
            Self::from_yaml(&content)?
        } else {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Self::new(name, content)?
        };
        Ok(template)
    }

    /// Make `variables` agree with `text`
    ///
    /// A declared list that names a different set of variables than the text
    /// actually uses is replaced. Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let detected = extract_variables(&self.text);
        if detected == self.variables {
            return false;
        }
        warn!(
            name = %self.name,
            declared = ?self.variables,
            ?detected,
            "Template variables disagree with text, correcting"
        );
        self.variables = detected;
        true
    }

    /// Render with every variable required
    pub fn fill(&self, values: &Values) -> Result<FilledPrompt, TemplateError> {
        debug!(name = %self.name, value_count = values.len(), "Template::fill: called");
        let final_prompt = render_with(&self.text, values, MissingPolicy::Error)?;

        let variables_used = self
            .variables
            .iter()
            .filter_map(|name| values.get(name).map(|v| (name.clone(), v.clone())))
            .collect();

        Ok(FilledPrompt {
            final_prompt,
            template_name: self.name.clone(),
            variables_used,
        })
    }
}

/// Result of filling a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilledPrompt {
    /// The rendered prompt
    pub final_prompt: String,
    /// Name of the template used
    pub template_name: String,
    /// Values that were substituted, in variable order
    pub variables_used: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELCOME: &str = "Welcome to our platform, <%= userName %>! Your account uses <%= userEmail %>. \
                           Visit <%= loginUrl %> to get started, <%= userName %>.";

    #[test]
    fn test_new_derives_variables() {
        let template = Template::new("welcome", WELCOME).unwrap();
        assert_eq!(template.variables, vec!["userName", "userEmail", "loginUrl"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(Template::new("  ", "x"), Err(TemplateError::EmptyName)));
    }

    #[test]
    fn test_normalize_corrects_declared_list() {
        let mut template: Template = serde_json::from_value(serde_json::json!({
            "name": "t",
            "text": "<%= a %> <%= b %>",
            "variables": ["b", "zzz"],
        }))
        .unwrap();

        assert!(template.normalize());
        assert_eq!(template.variables, vec!["a", "b"]);
        assert!(!template.normalize());
    }

    #[test]
    fn test_from_yaml_corrects_variables() {
        let yaml = "name: welcome\ntext: \"Hi <%= user %>, see <%= url %>\"\nvariables: [user, stale]\ncategory: Email\n";
        let template = Template::from_yaml(yaml).unwrap();
        assert_eq!(template.variables, vec!["user", "url"]);
        assert_eq!(template.category.as_deref(), Some("Email"));

        assert!(matches!(
            Template::from_yaml("name: \"\"\ntext: x\n"),
            Err(TemplateError::EmptyName)
        ));
        assert!(matches!(
            Template::from_yaml("text: [unclosed"),
            Err(TemplateError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_from_file_text_and_record() {
        let dir = tempfile::TempDir::new().unwrap();

        let text_path = dir.path().join("greeting.txt");
        std::fs::write(&text_path, "Hello <%= who %>\n").unwrap();
        let template = Template::from_file(&text_path).unwrap();
        assert_eq!(template.name, "greeting");
        assert_eq!(template.text, "Hello <%= who %>\n");
        assert_eq!(template.variables, vec!["who"]);

        let record_path = dir.path().join("welcome.yaml");
        std::fs::write(&record_path, "name: welcome\ntext: \"<%= a %>\"\nvariables: []\n").unwrap();
        let template = Template::from_file(&record_path).unwrap();
        assert_eq!(template.name, "welcome");
        assert_eq!(template.variables, vec!["a"]);

        assert!(Template::from_file(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_fill_requires_all_values() {
        let template = Template::new("welcome", WELCOME).unwrap();
        let mut values = Values::new();
        values.insert("userName".into(), "John Doe".into());

        let err = template.fill(&values).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing values for variables: userEmail, loginUrl"
        );

        values.insert("userEmail".into(), "john@example.com".into());
        values.insert("loginUrl".into(), "https://example.com/login".into());
        values.insert("extra".into(), "ignored".into());

        let filled = template.fill(&values).unwrap();
        assert!(filled.final_prompt.starts_with("Welcome to our platform, John Doe!"));
        assert!(filled.final_prompt.ends_with("get started, John Doe."));
        assert_eq!(filled.template_name, "welcome");
        assert_eq!(filled.variables_used.len(), 3);
        assert_eq!(filled.variables_used[0], ("userName".to_string(), "John Doe".to_string()));
    }
}
