// OpenTSDB HTTP client
use crate::application::tsdb_backend::TsdbBackend;
use crate::domain::annotation::AnnotationDataset;
use crate::domain::query::{LookupKind, QueryRequest};
use crate::domain::series::{LookupResponse, SeriesResult};
use crate::error::{DatasourceError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

const SUGGEST_MAX: &str = "99999";

#[derive(Debug, Clone)]
pub struct OpenTsdbClient {
    base_url: String,
    client: reqwest::Client,
}

impl OpenTsdbClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();

        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query.join("&"))
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("OpenTSDB request failed with status {}: {}", status, body);
            return Err(DatasourceError::Status { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DatasourceError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::read_json(response).await
    }
}

#[async_trait]
impl TsdbBackend for OpenTsdbClient {
    async fn suggest(&self, kind: LookupKind, prefix: &str) -> Result<Vec<String>> {
        let url = self.build_url(
            "/api/suggest",
            &[("type", kind.as_str()), ("q", prefix), ("max", SUGGEST_MAX)],
        );
        self.get_json(&url).await
    }

    async fn search_lookup(&self, query: &str) -> Result<LookupResponse> {
        let url = self.build_url("/api/search/lookup", &[("m", query)]);
        self.get_json(&url).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<SeriesResult>> {
        let url = self.build_url("/api/query", &[]);
        tracing::debug!("POST {} with {} queries", url, request.queries.len());

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn annotation_query(
        &self,
        start: i64,
        end: Option<i64>,
        expression: &str,
    ) -> Result<Vec<AnnotationDataset>> {
        let start = start.to_string();
        let end = end.map(|e| e.to_string());

        let mut params = vec![("start", start.as_str())];
        if let Some(end) = end.as_deref() {
            params.push(("end", end));
        }
        params.push(("m", expression));

        let url = self.build_url("/api/query", &params);
        self.get_json(&url).await
    }
}
