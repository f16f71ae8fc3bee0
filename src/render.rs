use std::sync::LazyLock;

use regex::Regex;

use crate::models::MessageTemplate;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// A template after variable substitution, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

/// Substitute {{name}} placeholders in all three template fields.
///
/// Pure: no I/O, no hidden state, same inputs always yield the same
/// output. Placeholders with no matching key (or a null value) are left
/// verbatim rather than stripped.
pub fn render(template: &MessageTemplate, variables: &serde_json::Value) -> RenderedEmail {
    RenderedEmail {
        subject: substitute(&template.subject, variables),
        body_html: substitute(&template.body_html, variables),
        body_text: substitute(&template.body_text, variables),
    }
}

fn substitute(input: &str, variables: &serde_json::Value) -> String {
    PLACEHOLDER_RE
        .replace_all(input, |caps: &regex::Captures| {
            match value_as_string(variables, &caps[1]) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

fn value_as_string(variables: &serde_json::Value, key: &str) -> Option<String> {
    match variables.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
