// Series label formatting - alias templates and group-by tag suffixes
use super::query::BackendQuery;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};

static ALIAS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\w+)|\[\[([\s\S]+?)\]\]").expect("alias pattern is valid"));

/// Tag keys the caller wants distinguished in series labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupByTags(BTreeSet<String>);

impl GroupByTags {
    /// Every tag key used by any query in the batch is a group-by dimension.
    pub fn from_queries(queries: &[BackendQuery]) -> Self {
        Self(
            queries
                .iter()
                .flat_map(|q| q.tags.keys().cloned())
                .collect(),
        )
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for GroupByTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Expand `$name` and `[[name]]` placeholders from `scope`.
///
/// Names that are missing from the scope, or bound to an empty value, are left verbatim.
pub fn expand_alias(template: &str, scope: &BTreeMap<String, String>) -> String {
    ALIAS_PATTERN
        .replace_all(template, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();

            match scope.get(name) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Build the display label for a series.
///
/// An alias wins outright; its scope is the series tags plus `metric`. Without one the label
/// is the metric name followed by `{k=v, ...}` for every group-by tag present on the series.
pub fn create_metric_label(
    metric: &str,
    tags: &BTreeMap<String, String>,
    group_by: &GroupByTags,
    alias: Option<&str>,
) -> String {
    if let Some(alias) = alias.filter(|a| !a.is_empty()) {
        let mut scope = tags.clone();
        scope.insert("metric".to_string(), metric.to_string());
        return expand_alias(alias, &scope);
    }

    let distinct: Vec<String> = tags
        .iter()
        .filter(|(k, _)| group_by.contains(k))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    if distinct.is_empty() {
        metric.to_string()
    } else {
        format!("{}{{{}}}", metric, distinct.join(", "))
    }
}
