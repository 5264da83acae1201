// Backend trait for OpenTSDB HTTP access
use crate::domain::annotation::AnnotationDataset;
use crate::domain::query::{LookupKind, QueryRequest};
use crate::domain::series::{LookupResponse, SeriesResult};
use crate::error::Result;
use async_trait::async_trait;

/// One method per OpenTSDB endpoint the datasource uses.
///
/// Timeouts and retries belong to the implementation; callers see a single outcome per call.
#[async_trait]
pub trait TsdbBackend: Send + Sync {
    /// `GET /api/suggest?type=..&q=..&max=99999`
    async fn suggest(&self, kind: LookupKind, prefix: &str) -> Result<Vec<String>>;

    /// `GET /api/search/lookup?m=..`
    async fn search_lookup(&self, query: &str) -> Result<LookupResponse>;

    /// `POST /api/query`
    async fn query(&self, request: &QueryRequest) -> Result<Vec<SeriesResult>>;

    /// `GET /api/query?start=..&end=..&m=..`, used for annotation lookups
    async fn annotation_query(
        &self,
        start: i64,
        end: Option<i64>,
        expression: &str,
    ) -> Result<Vec<AnnotationDataset>>;
}
