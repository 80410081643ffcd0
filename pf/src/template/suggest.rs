//! Name and category suggestions for a new template
//!
//! Keyword tables are checked in order, first hit wins.

const NAME_PATTERNS: &[(&str, &str)] = &[
    ("email", "email-template"),
    ("invitation", "invitation-template"),
    ("apology", "apology-template"),
    ("product description", "product-description-template"),
    ("social media", "social-media-template"),
    ("blog post", "blog-post-template"),
    ("newsletter", "newsletter-template"),
    ("announcement", "announcement-template"),
    ("marketing", "marketing-template"),
    ("sales", "sales-template"),
    ("customer service", "customer-service-template"),
    ("review", "review-template"),
    ("feedback", "feedback-template"),
];

const CATEGORY_PATTERNS: &[(&str, &str)] = &[
    ("email", "Email"),
    ("invitation", "Email"),
    ("apology", "Communication"),
    ("product", "E-commerce"),
    ("social media", "Social Media"),
    ("blog", "Content"),
    ("newsletter", "Marketing"),
    ("announcement", "Communication"),
    ("marketing", "Marketing"),
    ("sales", "Sales"),
    ("customer", "Customer Service"),
    ("review", "Feedback"),
    ("feedback", "Feedback"),
    ("educational", "Education"),
    ("technical", "Technical"),
    ("creative", "Creative"),
];

/// Category used when no keyword matches
pub const DEFAULT_CATEGORY: &str = "General";

/// Suggest a kebab-case template name from a requirement description
pub fn suggest_name(requirement: &str) -> String {
    let lower = requirement.to_lowercase();
    if let Some((_, name)) = NAME_PATTERNS.iter().find(|(pattern, _)| lower.contains(pattern)) {
        return name.to_string();
    }

    // Fall back to the first few plain words
    let words: Vec<String> = requirement
        .split_whitespace()
        .take(3)
        .filter(|w| w.chars().all(char::is_alphanumeric))
        .map(str::to_lowercase)
        .collect();

    if words.is_empty() {
        "custom-template".to_string()
    } else {
        format!("{}-template", words.join("-"))
    }
}

/// Suggest a category from a requirement description
pub fn suggest_category(requirement: &str) -> &'static str {
    let lower = requirement.to_lowercase();
    CATEGORY_PATTERNS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}
