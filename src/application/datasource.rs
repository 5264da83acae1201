// OpenTSDB datasource - panel queries, annotation queries, and (in `search`) autocompletion
mod search;

pub use search::{
    FindKind, FindQuery, FindResult, MetricMatch, build_lookup_expression, parse_find_query,
};

use crate::application::annotations_service::AnnotationDatasource;
use crate::application::collaborators::{DateParser, TemplateSrv};
use crate::application::lookup_cache::LookupCache;
use crate::application::reconciler::reconcile;
use crate::application::translator::{translate_range, translate_target};
use crate::application::tsdb_backend::TsdbBackend;
use crate::domain::annotation::{AnnotationEvent, AnnotationSource};
use crate::domain::label::GroupByTags;
use crate::domain::query::{QueryOptions, QueryRequest, RawTimeRange};
use crate::domain::series::QueryResponse;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct OpenTsdbDatasource {
    name: String,
    backend: Arc<dyn TsdbBackend>,
    templates: Arc<dyn TemplateSrv>,
    dates: Arc<dyn DateParser>,
    lookup_cache: LookupCache,
}

impl OpenTsdbDatasource {
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn TsdbBackend>,
        templates: Arc<dyn TemplateSrv>,
        dates: Arc<dyn DateParser>,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            templates,
            dates,
            lookup_cache: LookupCache::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run every target of a panel as one batched `POST /api/query` and label the results.
    ///
    /// Targets without a metric are dropped; if nothing is left the backend is not called.
    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResponse> {
        let queries = options
            .targets
            .iter()
            .filter_map(|t| translate_target(t, self.templates.as_ref()).transpose())
            .collect::<Result<Vec<_>>>()?;

        if queries.is_empty() {
            tracing::debug!("No queryable targets, skipping OpenTSDB round trip");
            return Ok(QueryResponse::default());
        }

        let range = translate_range(&options.range, self.dates.as_ref())?;
        let group_by = GroupByTags::from_queries(&queries);
        let request = QueryRequest::new(range, queries);

        tracing::debug!(
            "Querying {} series expressions from {} (start={}, end={:?})",
            request.queries.len(),
            self.name,
            request.start,
            request.end
        );
        let series = self.backend.query(&request).await?;
        tracing::debug!("OpenTSDB returned {} series", series.len());

        Ok(QueryResponse {
            data: reconcile(&series, &options.targets, &group_by, self.templates.as_ref()),
        })
    }
}

#[async_trait]
impl AnnotationDatasource for OpenTsdbDatasource {
    async fn annotation_query(
        &self,
        source: &AnnotationSource,
        range: &RawTimeRange,
    ) -> Result<Vec<AnnotationEvent>> {
        let range = translate_range(range, self.dates.as_ref())?;

        let expanded = self.templates.replace(&source.query);
        let expression = if expanded.trim().is_empty() {
            "*".to_string()
        } else {
            expanded
        };

        let datasets = self
            .backend
            .annotation_query(range.start, range.end, &format!("sum:{}", expression))
            .await?;

        Ok(datasets
            .iter()
            .flat_map(|dataset| dataset.annotations.iter())
            .filter_map(|raw| {
                let event = AnnotationEvent::from_raw(source, raw);
                if event.is_none() {
                    tracing::warn!(
                        "Skipping annotation with out-of-range time {} in {}",
                        raw.start_time,
                        source.name
                    );
                }
                event
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::RawAnnotation;
    use crate::domain::query::QueryTarget;
    use crate::error::DatasourceError;
    use crate::infrastructure::dates::RelativeDateParser;
    use crate::infrastructure::variables::VariableMap;
    use crate::test_support::{Call, FakeBackend};
    use chrono::{TimeZone, Utc};

    fn datasource(backend: Arc<FakeBackend>) -> OpenTsdbDatasource {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        OpenTsdbDatasource::new(
            "opentsdb",
            backend,
            Arc::new(VariableMap::from_pairs([("host", "web01")])),
            Arc::new(RelativeDateParser::with_now(now)),
        )
    }

    fn last_hour(targets: Vec<QueryTarget>) -> QueryOptions {
        QueryOptions {
            range: RawTimeRange::new("now-1h", "now"),
            targets,
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_backend() {
        let backend = Arc::new(FakeBackend::new());
        let ds = datasource(backend.clone());

        let response = ds
            .query(&last_hour(vec![QueryTarget::new(""), QueryTarget::default()]))
            .await
            .unwrap();

        assert!(response.data.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_batches_and_labels() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_series("sys.cpu", &[("host", "web01")], &[(100, 1.0), (160, 2.0)])
                .with_series("sys.mem", &[("host", "web01")], &[(100, 512.0)]),
        );
        let ds = datasource(backend.clone());

        let mut mem = QueryTarget::new("sys.mem").with_tag("host", "$host");
        mem.alias = Some("memory on $host".to_string());
        let targets = vec![
            QueryTarget::new(""),
            QueryTarget::new("sys.cpu").with_tag("host", "*"),
            mem,
        ];

        let response = ds.query(&last_hour(targets)).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        let Call::Query(request) = &calls[0] else {
            panic!("expected a query call, got {:?}", calls[0]);
        };
        assert_eq!(request.queries.len(), 2);
        assert_eq!(request.end, None);
        assert!(request.global_annotations);
        assert_eq!(
            request.queries[1].tags.get("host").map(String::as_str),
            Some("web01")
        );

        let labels: Vec<&str> = response.data.iter().map(|d| d.target.as_str()).collect();
        assert_eq!(labels, vec!["sys.cpu{host=web01}", "memory on web01"]);
        assert_eq!(response.data[0].datapoints[1].time_ms, 160_000);
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let backend = Arc::new(FakeBackend::new().failing_queries());
        let ds = datasource(backend);

        let err = ds
            .query(&last_hour(vec![QueryTarget::new("sys.cpu")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatasourceError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_annotation_query() {
        let backend = Arc::new(FakeBackend::new().with_annotations(
            "sum:deploys.web01",
            vec![RawAnnotation {
                start_time: 1000,
                end_time: Some(2000),
                description: "d".to_string(),
                notes: "n".to_string(),
            }],
        ));
        let ds = datasource(backend.clone());
        let source = AnnotationSource {
            datasource: None,
            query: "deploys.$host".to_string(),
            enable: true,
            name: "Deploys".to_string(),
        };

        let events = ds
            .annotation_query(&source, &RawTimeRange::new("now-1h", "now"))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].min, 1_000_000);
        assert_eq!(events[0].max, 2_000_000);
        assert_eq!(events[0].title, "d");
        assert_eq!(events[0].text, "n");
        assert!(matches!(
            &backend.calls()[0],
            Call::Annotation { end: None, expression, .. } if expression == "sum:deploys.web01"
        ));
    }

    #[tokio::test]
    async fn test_annotation_with_overflowing_time_skipped() {
        let backend = Arc::new(FakeBackend::new().with_annotations(
            "sum:deploys",
            vec![
                RawAnnotation {
                    start_time: i64::MAX / 10,
                    ..RawAnnotation::default()
                },
                RawAnnotation {
                    start_time: 30,
                    ..RawAnnotation::default()
                },
            ],
        ));
        let ds = datasource(backend);
        let source = AnnotationSource {
            query: "deploys".to_string(),
            ..AnnotationSource::default()
        };

        let events = ds
            .annotation_query(&source, &RawTimeRange::new("now-1h", "now"))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].min, 30_000);
    }

    #[tokio::test]
    async fn test_annotation_query_defaults_to_wildcard() {
        let backend = Arc::new(FakeBackend::new());
        let ds = datasource(backend.clone());

        let events = ds
            .annotation_query(&AnnotationSource::default(), &RawTimeRange::new("now-1h", "now"))
            .await
            .unwrap();

        assert!(events.is_empty());
        assert!(matches!(
            &backend.calls()[0],
            Call::Annotation { expression, .. } if expression == "sum:*"
        ));
    }
}
