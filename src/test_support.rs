// In-memory backend for unit tests
use crate::application::tsdb_backend::TsdbBackend;
use crate::domain::annotation::{AnnotationDataset, RawAnnotation};
use crate::domain::query::{LookupKind, QueryRequest};
use crate::domain::series::{LookupResponse, LookupRow, SeriesResult};
use crate::error::{DatasourceError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Barrier;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Suggest(LookupKind, String),
    Lookup(String),
    Query(QueryRequest),
    Annotation {
        start: i64,
        end: Option<i64>,
        expression: String,
    },
}

#[derive(Default)]
pub struct FakeBackend {
    suggestions: Vec<String>,
    lookup_rows: Vec<LookupRow>,
    series: Vec<SeriesResult>,
    fail_queries: bool,
    fail_suggestions: bool,
    lookup_failures: Mutex<usize>,
    annotations: HashMap<String, Option<Vec<RawAnnotation>>>,
    annotation_barrier: Option<Arc<Barrier>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suggestions(mut self, values: &[&str]) -> Self {
        self.suggestions = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_lookup_row(mut self, metric: &str, tags: &[(&str, &str)]) -> Self {
        self.lookup_rows.push(LookupRow {
            metric: metric.to_string(),
            tags: tag_map(tags),
        });
        self
    }

    pub fn with_series(mut self, metric: &str, tags: &[(&str, &str)], dps: &[(i64, f64)]) -> Self {
        self.series.push(SeriesResult {
            metric: metric.to_string(),
            tags: tag_map(tags),
            dps: dps.iter().map(|(ts, v)| (ts.to_string(), *v)).collect(),
        });
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn failing_suggestions(mut self) -> Self {
        self.fail_suggestions = true;
        self
    }

    /// The next `count` lookups fail; later ones answer normally.
    pub fn failing_lookups(self, count: usize) -> Self {
        *self.lookup_failures.lock() = count;
        self
    }

    /// Annotation rows served for `expression` (e.g. `sum:deploys`).
    pub fn with_annotations(mut self, expression: &str, rows: Vec<RawAnnotation>) -> Self {
        self.annotations.insert(expression.to_string(), Some(rows));
        self
    }

    pub fn with_failing_annotations(mut self, expression: &str) -> Self {
        self.annotations.insert(expression.to_string(), None);
        self
    }

    /// Every annotation query waits on `barrier` before answering.
    pub fn with_annotation_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.annotation_barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn lookup_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Lookup(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

pub fn tag_map(tags: &[(&str, &str)]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl TsdbBackend for FakeBackend {
    async fn suggest(&self, kind: LookupKind, prefix: &str) -> Result<Vec<String>> {
        self.record(Call::Suggest(kind, prefix.to_string()));
        if self.fail_suggestions {
            return Err(DatasourceError::Status {
                status: 503,
                body: "suggest unavailable".to_string(),
            });
        }
        Ok(self
            .suggestions
            .iter()
            .filter(|s| s.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn search_lookup(&self, query: &str) -> Result<LookupResponse> {
        self.record(Call::Lookup(query.to_string()));
        {
            let mut remaining = self.lookup_failures.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DatasourceError::Transport(format!("lookup {} refused", query)));
            }
        }
        Ok(LookupResponse {
            results: self.lookup_rows.clone(),
        })
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<SeriesResult>> {
        self.record(Call::Query(request.clone()));
        if self.fail_queries {
            return Err(DatasourceError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.series.clone())
    }

    async fn annotation_query(
        &self,
        start: i64,
        end: Option<i64>,
        expression: &str,
    ) -> Result<Vec<AnnotationDataset>> {
        self.record(Call::Annotation {
            start,
            end,
            expression: expression.to_string(),
        });

        if let Some(barrier) = &self.annotation_barrier {
            barrier.wait().await;
        }

        match self.annotations.get(expression) {
            Some(Some(rows)) => Ok(vec![AnnotationDataset {
                annotations: rows.clone(),
            }]),
            Some(None) => Err(DatasourceError::Transport(format!(
                "annotation query {} refused",
                expression
            ))),
            None => Ok(Vec::new()),
        }
    }
}
