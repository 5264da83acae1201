// Annotation domain models - sources, raw events and the normalized overlay record
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

const TOOLTIP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An annotation query configured on a dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSource {
    /// Datasource name; `None` selects the default datasource
    pub datasource: Option<String>,
    pub query: String,
    pub enable: bool,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    #[default]
    Utc,
    Browser,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardAnnotations {
    pub enable: bool,
    pub list: Vec<AnnotationSource>,
}

/// The parts of a dashboard the annotation aggregator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dashboard {
    pub annotations: DashboardAnnotations,
    pub timezone: Timezone,
}

/// One row of the `annotations` array in a `GET /api/query` response. Times are epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAnnotation {
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub description: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationDataset {
    #[serde(default)]
    pub annotations: Vec<RawAnnotation>,
}

/// An annotation event as produced by a datasource, times in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEvent {
    pub annotation: AnnotationSource,
    pub min: i64,
    pub max: i64,
    pub title: String,
    pub text: String,
    pub tags: Option<String>,
}

impl AnnotationEvent {
    /// OpenTSDB leaves `endTime` unset (or zero) for point events.
    ///
    /// `None` when a timestamp cannot be expressed in milliseconds.
    pub fn from_raw(source: &AnnotationSource, raw: &RawAnnotation) -> Option<Self> {
        let min = raw.start_time.checked_mul(1000)?;
        let max = match raw.end_time {
            Some(end) if end > 0 => end.checked_mul(1000)?,
            _ => min,
        };

        Some(Self {
            annotation: source.clone(),
            min,
            max,
            title: raw.description.clone(),
            text: raw.notes.clone(),
            tags: None,
        })
    }
}

/// Normalized overlay record.
///
/// `title`, tags and text are carried raw; the renderer sanitizes them before display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub annotation: AnnotationSource,
    pub min: i64,
    pub max: i64,
    pub event_type: String,
    pub title: String,
    pub description: String,
    pub score: u32,
}

impl Annotation {
    pub fn from_event(event: AnnotationEvent, timezone: Timezone) -> Self {
        let description = render_tooltip(&event, timezone);
        Self {
            event_type: event.annotation.name.clone(),
            annotation: event.annotation,
            min: event.min,
            max: event.max,
            title: event.title,
            description,
            score: 1,
        }
    }
}

fn format_instant(ms: i64, timezone: Timezone) -> String {
    let utc = DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default();
    match timezone {
        Timezone::Utc => utc.format(TOOLTIP_TIME_FORMAT).to_string(),
        Timezone::Browser => utc.with_timezone(&Local).format(TOOLTIP_TIME_FORMAT).to_string(),
    }
}

fn render_tooltip(event: &AnnotationEvent, timezone: Timezone) -> String {
    let mut tooltip = String::from("<small>");

    if let Some(tags) = &event.tags {
        tooltip.push_str(&format!("<span class=\"tag label label-tag\">{}</span><br/>", tags));
    }

    let start = format_instant(event.min, timezone);
    if event.max != event.min {
        let end = format_instant(event.max, timezone);
        match timezone {
            Timezone::Browser => tooltip.push_str(&format!(
                "<i><b>Start:</b> {}</i> <i><b>End:</b> {}</i><br/>",
                start, end
            )),
            Timezone::Utc => tooltip.push_str(&format!(
                "<i>Start: {}</i><br/><i>End: {}</i><br/>",
                start, end
            )),
        }
    } else {
        tooltip.push_str(&format!("<i>{}</i><br/>", start));
    }

    if !event.text.is_empty() {
        tooltip.push_str(&event.text.replace('\n', "<br/>"));
    }

    tooltip.push_str("</small>");
    tooltip
}
