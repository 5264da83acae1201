// Metric and tag autocompletion
use super::OpenTsdbDatasource;
use crate::domain::intersect::intersect_sorted;
use crate::domain::query::{LookupKind, QueryTarget};
use crate::domain::series::LookupResponse;
use crate::error::{DatasourceError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

const WILDCARD: &str = "*";

/// What a template-variable query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKind {
    Metric,
    Tagk,
    Tagv,
}

/// Metric-name filter from the part before `{`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricMatch {
    Any,
    Exact(String),
    /// `prefix*suffix`, anchored at both ends
    Wildcard { prefix: String, suffix: String },
}

impl MetricMatch {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == WILDCARD {
            return MetricMatch::Any;
        }
        match text.split_once('*') {
            Some((prefix, suffix)) => MetricMatch::Wildcard {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            None => MetricMatch::Exact(text.to_string()),
        }
    }

    pub fn matches(&self, metric: &str) -> bool {
        match self {
            MetricMatch::Any => true,
            MetricMatch::Exact(name) => metric == name,
            MetricMatch::Wildcard { prefix, suffix } => {
                metric.len() >= prefix.len() + suffix.len()
                    && metric.starts_with(prefix.as_str())
                    && metric.ends_with(suffix.as_str())
            }
        }
    }
}

/// A decomposed `metric{tag=value,...}` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindQuery {
    pub kind: FindKind,
    pub metric: MetricMatch,
    /// Tag key (for `tagv`) or tag value (for `tagk`) taken from the wildcard filter
    pub tag_match: Option<String>,
    /// Expression sent to `/api/search/lookup`
    pub lookup: String,
}

impl FindQuery {
    fn collect(&self, response: &LookupResponse) -> Vec<FindResult> {
        let mut found = BTreeSet::new();

        for row in response.results.iter().filter(|r| self.metric.matches(&r.metric)) {
            match (self.kind, self.tag_match.as_deref()) {
                (FindKind::Metric, _) => {
                    found.insert(row.metric.clone());
                }
                (FindKind::Tagk, Some(value)) => {
                    found.extend(
                        row.tags
                            .iter()
                            .filter(|(_, v)| *v == value)
                            .map(|(k, _)| k.clone()),
                    );
                }
                (FindKind::Tagv, Some(key)) => {
                    found.extend(
                        row.tags
                            .iter()
                            .filter(|(k, _)| *k == key)
                            .map(|(_, v)| v.clone()),
                    );
                }
                _ => {}
            }
        }

        found.into_iter().map(FindResult::new).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindResult {
    pub text: String,
    pub expandable: bool,
}

impl FindResult {
    fn new(text: String) -> Self {
        Self {
            text,
            expandable: false,
        }
    }
}

/// Split an already-expanded `metric{tags}` query.
///
/// The lookup API cannot filter on a wildcard metric, so anything but an exact metric is
/// dropped from the lookup expression and applied to the rows afterwards.
pub fn parse_find_query(query: &str) -> Result<FindQuery> {
    let Some((metric_part, rest)) = query.split_once('{') else {
        return Err(DatasourceError::malformed_find_query(query, "missing tag list"));
    };
    let Some((tag_part, trailing)) = rest.split_once('}') else {
        return Err(DatasourceError::malformed_find_query(query, "unterminated tag list"));
    };
    if metric_part.contains('}') || tag_part.contains('{') || !trailing.trim().is_empty() {
        return Err(DatasourceError::malformed_find_query(
            query,
            "expected a single metric{tag=value,...} expression",
        ));
    }

    let mut kind = FindKind::Metric;
    let mut tag_match = None;
    for filter in tag_part.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let Some((key, value)) = filter.split_once('=') else {
            tracing::debug!("Ignoring tag filter without '=': {}", filter);
            continue;
        };
        match (key.trim(), value.trim()) {
            (WILDCARD, WILDCARD) => {
                return Err(DatasourceError::malformed_find_query(
                    query,
                    "tag filter has a wildcard on both sides",
                ));
            }
            (key, WILDCARD) => {
                kind = FindKind::Tagv;
                tag_match = Some(key.to_string());
            }
            (WILDCARD, value) => {
                kind = FindKind::Tagk;
                tag_match = Some(value.to_string());
            }
            _ => {}
        }
    }

    let metric = MetricMatch::parse(metric_part);
    let lookup = match &metric {
        MetricMatch::Exact(name) => format!("{}{{{}}}", name, tag_part),
        _ => format!("{{{}}}", tag_part),
    };

    Ok(FindQuery {
        kind,
        metric,
        tag_match,
        lookup,
    })
}

/// `[metric]{k=v,...}` for `/api/search/lookup`, including the editor's fixed key or value.
pub fn build_lookup_expression(kind: LookupKind, target: &QueryTarget) -> String {
    let mut filters: Vec<String> = target
        .tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    match kind {
        LookupKind::Tagv => {
            if let Some(key) = target.current_tag_key.as_deref().filter(|k| !k.is_empty()) {
                filters.push(format!("{}=*", key));
            }
        }
        LookupKind::Tagk => {
            if let Some(value) = target.current_tag_value.as_deref().filter(|v| !v.is_empty()) {
                filters.push(format!("*={}", value));
            }
        }
        LookupKind::Metrics => {}
    }

    let metric = if kind == LookupKind::Metrics {
        ""
    } else {
        target.metric.as_str()
    };
    format!("{}{{{}}}", metric, filters.join(","))
}

fn collect_lookup(
    kind: LookupKind,
    target: &QueryTarget,
    response: &LookupResponse,
) -> Vec<String> {
    let fixed_key = target.current_tag_key.as_deref().filter(|k| !k.is_empty());
    let fixed_value = target.current_tag_value.as_deref().filter(|v| !v.is_empty());
    let mut found = BTreeSet::new();

    for row in &response.results {
        match kind {
            LookupKind::Metrics => {
                found.insert(row.metric.clone());
            }
            LookupKind::Tagk => found.extend(
                row.tags
                    .iter()
                    .filter(|(_, v)| fixed_value.is_none_or(|fixed| fixed == v.as_str()))
                    .map(|(k, _)| k.clone()),
            ),
            LookupKind::Tagv => found.extend(
                row.tags
                    .iter()
                    .filter(|(k, _)| fixed_key.is_none_or(|fixed| fixed == k.as_str()))
                    .map(|(_, v)| v.clone()),
            ),
        }
    }

    found.into_iter().collect()
}

impl OpenTsdbDatasource {
    /// Sorted metric names, tag keys or tag values consistent with the target's filters.
    ///
    /// The most recent `(kind, expression)` is answered from the lookup cache.
    pub async fn perform_search_lookup(
        &self,
        kind: LookupKind,
        target: &QueryTarget,
    ) -> Result<Vec<String>> {
        let expression = build_lookup_expression(kind, target);

        if let Some(cached) = self.lookup_cache.get(kind, &expression) {
            tracing::debug!("Lookup cache hit for {} {}", kind, expression);
            return Ok(cached.as_ref().clone());
        }

        let ticket = self.lookup_cache.begin(kind, &expression);
        tracing::debug!("Lookup cache miss for {} {}", kind, expression);
        let response = self.backend.search_lookup(&expression).await?;

        let results = Arc::new(collect_lookup(kind, target, &response));
        self.lookup_cache.complete(ticket, results.clone());
        Ok(results.as_ref().clone())
    }

    /// Suggestions for `query`, narrowed to values consistent with the target's tag filters.
    pub async fn perform_suggest_query(
        &self,
        query: &str,
        kind: LookupKind,
        target: &QueryTarget,
    ) -> Result<Vec<String>> {
        let mut suggestions = self.backend.suggest(kind, query).await?;
        suggestions.sort();

        if (kind == LookupKind::Metrics || target.metric.is_empty()) && target.tags.is_empty() {
            return Ok(suggestions);
        }

        let lookup = self.perform_search_lookup(kind, target).await?;
        Ok(intersect_sorted(&lookup, &suggestions))
    }

    /// Resolve a template-variable query such as `sys.*{host=*}`.
    pub async fn metric_find_query(&self, query: &str) -> Result<Vec<FindResult>> {
        let expanded = self.templates.replace(query);
        let find = parse_find_query(&expanded)?;
        tracing::debug!("Find query {:?} classified as {:?}", expanded, find.kind);

        // Shares the lookup endpoint, so it takes over the single cache slot.
        self.lookup_cache.invalidate();
        let response = self.backend.search_lookup(&find.lookup).await?;
        Ok(find.collect(&response))
    }
}
