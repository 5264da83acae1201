// Services the datasource consumes but does not own
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Dashboard template-variable substitution.
pub trait TemplateSrv: Send + Sync {
    fn replace(&self, text: &str) -> String;
}

/// Parser for the dashboard's date strings (`now-1h`, absolute dates, ...).
pub trait DateParser: Send + Sync {
    fn parse_instant(&self, text: &str) -> Result<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Side channel for failures the user should see without failing the caller.
pub trait AlertSink: Send + Sync {
    fn set(&self, title: &str, message: &str, severity: Severity);
}
