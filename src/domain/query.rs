// Query domain models - panel targets and their OpenTSDB wire form
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One user-authored query as stored on a panel.
///
/// Field names follow the panel JSON (`shouldComputeRate`, `counterMax`, ...) so targets
/// can be deserialized straight from a dashboard definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryTarget {
    pub metric: String,
    pub aggregator: Option<String>,
    /// Iterated in key order
    pub tags: BTreeMap<String, String>,
    pub should_compute_rate: bool,
    pub is_counter: bool,
    pub counter_max: Option<String>,
    pub counter_reset_value: Option<String>,
    pub should_downsample: bool,
    pub downsample_interval: Option<String>,
    pub downsample_aggregator: Option<String>,
    pub alias: Option<String>,
    /// Tag key fixed while the editor autocompletes a tag value
    pub current_tag_key: Option<String>,
    /// Tag value fixed while the editor autocompletes a tag key
    pub current_tag_value: Option<String>,
}

impl QueryTarget {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateOptions {
    pub counter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_value: Option<i64>,
}

/// A translated target, ready for the `queries` array of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendQuery {
    pub metric: String,
    pub aggregator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_options: Option<RateOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downsample: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Time range as the dashboard hands it over: `now`, `now-6h`, or an absolute date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimeRange {
    pub from: String,
    pub to: String,
}

impl RawTimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Backend-native range in epoch milliseconds; `end == None` means "up to now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: Option<i64>,
}

/// Body of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub start: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    pub queries: Vec<BackendQuery>,
    pub global_annotations: bool,
}

impl QueryRequest {
    pub fn new(range: TimeRange, queries: Vec<BackendQuery>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            queries,
            global_annotations: true,
        }
    }
}

/// A panel's query call: the range plus every target in declared order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    pub range: RawTimeRange,
    #[serde(default)]
    pub targets: Vec<QueryTarget>,
}

/// The `type` parameter of `/api/suggest` and of lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    Metrics,
    Tagk,
    Tagv,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Metrics => "metrics",
            LookupKind::Tagk => "tagk",
            LookupKind::Tagv => "tagv",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
