// Series domain models - what OpenTSDB returns and what the panel receives
use super::annotation::Annotation;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

// Panels expect `[value, timestamp_ms]` pairs.
impl Serialize for TimeSeriesPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.value)?;
        pair.serialize_element(&self.time_ms)?;
        pair.end()
    }
}

/// One element of the `POST /api/query` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesResult {
    pub metric: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Epoch seconds (as strings) to values
    #[serde(default)]
    pub dps: BTreeMap<String, f64>,
}

impl SeriesResult {
    /// Datapoints in ascending time order, timestamps scaled to milliseconds.
    pub fn points(&self) -> Vec<TimeSeriesPoint> {
        let mut points: Vec<TimeSeriesPoint> = self
            .dps
            .iter()
            .filter_map(|(ts, value)| {
                let time_ms = ts.parse::<i64>().ok().and_then(|s| s.checked_mul(1000));
                if time_ms.is_none() {
                    tracing::warn!(
                        "Dropping datapoint with invalid timestamp {:?} in {}",
                        ts,
                        self.metric
                    );
                }
                time_ms.map(|t| TimeSeriesPoint::new(t, *value))
            })
            .collect();

        points.sort_by_key(|p| p.time_ms);
        points
    }
}

/// A labelled series as handed back to the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datapoints {
    pub target: String,
    pub datapoints: Vec<TimeSeriesPoint>,
    /// Reserved; always empty for now
    pub annotations: Vec<Annotation>,
}

impl Datapoints {
    pub fn new(target: String, datapoints: Vec<TimeSeriesPoint>) -> Self {
        Self {
            target,
            datapoints,
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResponse {
    pub data: Vec<Datapoints>,
}

/// Body of `GET /api/search/lookup`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub results: Vec<LookupRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupRow {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}
