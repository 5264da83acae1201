// Datasource error type shared by every layer
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DatasourceError {
    #[error("Invalid {field} value {value:?}: {source}")]
    InvalidInteger {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Invalid date {input:?}: {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("Malformed find query {query:?}: {reason}")]
    MalformedFindQuery { query: String, reason: String },

    #[error("OpenTSDB request failed: {0}")]
    Transport(String),

    #[error("OpenTSDB returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode OpenTSDB response: {0}")]
    Decode(String),

    #[error("Unknown datasource: {0}")]
    UnknownDatasource(String),
}

impl DatasourceError {
    pub fn malformed_find_query(query: &str, reason: impl Into<String>) -> Self {
        DatasourceError::MalformedFindQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_date(input: &str, reason: impl Into<String>) -> Self {
        DatasourceError::InvalidDate {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for DatasourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DatasourceError::Decode(err.to_string())
        } else {
            DatasourceError::Transport(err.to_string())
        }
    }
}

impl IntoResponse for DatasourceError {
    fn into_response(self) -> Response {
        let status = match self {
            DatasourceError::InvalidInteger { .. }
            | DatasourceError::InvalidDate { .. }
            | DatasourceError::MalformedFindQuery { .. } => StatusCode::BAD_REQUEST,
            DatasourceError::UnknownDatasource(_) => StatusCode::NOT_FOUND,
            DatasourceError::Transport(_)
            | DatasourceError::Status { .. }
            | DatasourceError::Decode(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DatasourceError>;
