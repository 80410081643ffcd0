//! Property tests for placeholder extraction and rendering

use std::collections::HashSet;

use proptest::prelude::*;
use promptforge::template::{Values, extract_variables, placeholders, render};

/// Text mixing literal runs with well-formed, malformed and partial placeholders
fn template_text() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[a-zA-Z ,.!\n]{0,12}",
        "[a-c_][a-c0-9_]{0,3}".prop_map(|name| format!("<%= {} %>", name)),
        "[a-c_][a-c0-9_]{0,3}".prop_map(|name| format!("<%={}%>", name)),
        Just("<%= 9bad %>".to_string()),
        Just("<%= a".to_string()),
        Just("%>".to_string()),
        Just("<%=\ta\t%>".to_string()),
    ];
    prop::collection::vec(piece, 0..12).prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    fn extract_has_no_duplicates(text in template_text()) {
        let variables = extract_variables(&text);
        let unique: HashSet<&String> = variables.iter().collect();
        prop_assert_eq!(unique.len(), variables.len());
    }

    #[test]
    fn extract_is_first_occurrence_projection(text in template_text()) {
        let mut seen = HashSet::new();
        let expected: Vec<String> = placeholders(&text)
            .map(|p| p.name.to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect();
        prop_assert_eq!(extract_variables(&text), expected);
    }

    #[test]
    fn extract_is_stable(text in template_text()) {
        prop_assert_eq!(extract_variables(&text), extract_variables(&text));
    }

    #[test]
    fn render_with_no_values_is_identity(text in template_text()) {
        prop_assert_eq!(render(&text, &Values::new()), text);
    }

    #[test]
    fn render_with_all_values_leaves_no_placeholders(text in template_text()) {
        let values: Values = extract_variables(&text)
            .into_iter()
            .map(|name| (name, "-".to_string()))
            .collect();
        let rendered = render(&text, &values);
        prop_assert!(extract_variables(&rendered).is_empty());
    }
}
