// Template variable substitution
use crate::application::collaborators::TemplateSrv;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(\w+)\}|\$(\w+)|\[\[(\w+)\]\]").expect("variable pattern is valid")
});

/// Replaces `$name`, `${name}` and `[[name]]` with configured values.
///
/// Unknown variables are left untouched so the backend sees them verbatim.
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    vars: HashMap<String, String>,
}

impl VariableMap {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TemplateSrv for VariableMap {
    fn replace(&self, text: &str) -> String {
        if self.vars.is_empty() || !(text.contains('$') || text.contains("[[")) {
            return text.to_string();
        }

        VARIABLE_PATTERN
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                match self.vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
