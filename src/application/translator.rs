// Query translation - panel targets and ranges into OpenTSDB request parts
use crate::application::collaborators::{DateParser, TemplateSrv};
use crate::domain::query::{BackendQuery, QueryTarget, RateOptions, RawTimeRange, TimeRange};
use crate::error::{DatasourceError, Result};

const DEFAULT_AGGREGATOR: &str = "avg";

/// Translate one target. Targets without a metric yield `Ok(None)` and are left out of the batch.
pub fn translate_target(
    target: &QueryTarget,
    templates: &dyn TemplateSrv,
) -> Result<Option<BackendQuery>> {
    if target.metric.is_empty() {
        return Ok(None);
    }

    let aggregator = match target.aggregator.as_deref() {
        Some(agg) if !agg.is_empty() => templates.replace(agg),
        _ => DEFAULT_AGGREGATOR.to_string(),
    };

    let (rate, rate_options) = if target.should_compute_rate {
        let options = RateOptions {
            counter: target.is_counter,
            counter_max: parse_optional_int("counterMax", target.counter_max.as_deref())?,
            reset_value: parse_optional_int(
                "counterResetValue",
                target.counter_reset_value.as_deref(),
            )?,
        };
        (Some(true), Some(options))
    } else {
        (None, None)
    };

    let downsample = target.should_downsample.then(|| {
        let interval = templates.replace(target.downsample_interval.as_deref().unwrap_or_default());
        let aggregator = target
            .downsample_aggregator
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AGGREGATOR);
        format!("{}-{}", interval, aggregator)
    });

    let tags = target
        .tags
        .iter()
        .map(|(k, v)| (k.clone(), templates.replace(v)))
        .collect();

    Ok(Some(BackendQuery {
        metric: templates.replace(&target.metric),
        aggregator,
        rate,
        rate_options,
        downsample,
        tags,
    }))
}

/// Empty strings mean "not set"; anything else must be a valid integer.
fn parse_optional_int(field: &'static str, value: Option<&str>) -> Result<Option<i64>> {
    match value {
        Some(text) if !text.is_empty() => text
            .parse::<i64>()
            .map(Some)
            .map_err(|source| DatasourceError::InvalidInteger {
                field,
                value: text.to_string(),
                source,
            }),
        _ => Ok(None),
    }
}

/// `now` is an open bound (`None`); anything else becomes epoch milliseconds.
pub fn convert_to_tsdb_time(text: &str, dates: &dyn DateParser) -> Result<Option<i64>> {
    if text == "now" {
        return Ok(None);
    }

    Ok(Some(dates.parse_instant(text)?.timestamp_millis()))
}

pub fn translate_range(range: &RawTimeRange, dates: &dyn DateParser) -> Result<TimeRange> {
    let start = match convert_to_tsdb_time(&range.from, dates)? {
        Some(start) => start,
        None => dates.parse_instant("now")?.timestamp_millis(),
    };
    let end = convert_to_tsdb_time(&range.to, dates)?;

    Ok(TimeRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::dates::RelativeDateParser;
    use crate::infrastructure::variables::VariableMap;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn templates() -> VariableMap {
        VariableMap::from_pairs([("host", "web01"), ("interval", "5m")])
    }

    #[test]
    fn test_empty_metric_skipped() {
        let target = QueryTarget::new("").with_tag("host", "*");
        assert_eq!(translate_target(&target, &templates()).unwrap(), None);
    }

    #[test]
    fn test_rate_counter_scenario() {
        let mut target = QueryTarget::new("sys.cpu").with_tag("host", "*");
        target.should_compute_rate = true;
        target.is_counter = true;

        let query = translate_target(&target, &templates()).unwrap().unwrap();
        assert_eq!(
            query,
            BackendQuery {
                metric: "sys.cpu".to_string(),
                aggregator: "avg".to_string(),
                rate: Some(true),
                rate_options: Some(RateOptions {
                    counter: true,
                    counter_max: None,
                    reset_value: None,
                }),
                downsample: None,
                tags: BTreeMap::from([("host".to_string(), "*".to_string())]),
            }
        );

        let wire = serde_json::to_value(&query).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "metric": "sys.cpu",
                "aggregator": "avg",
                "rate": true,
                "rateOptions": {"counter": true},
                "tags": {"host": "*"}
            })
        );
    }

    #[test]
    fn test_counter_limits_parsed() {
        let mut target = QueryTarget::new("net.bytes");
        target.should_compute_rate = true;
        target.counter_max = Some("65535".to_string());
        target.counter_reset_value = Some(String::new());

        let query = translate_target(&target, &templates()).unwrap().unwrap();
        let options = query.rate_options.unwrap();
        assert!(!options.counter);
        assert_eq!(options.counter_max, Some(65535));
        assert_eq!(options.reset_value, None);
    }

    #[test]
    fn test_malformed_counter_max_surfaced() {
        let mut target = QueryTarget::new("net.bytes");
        target.should_compute_rate = true;
        target.counter_max = Some("lots".to_string());

        let err = translate_target(&target, &templates()).unwrap_err();
        assert!(matches!(
            err,
            DatasourceError::InvalidInteger { field: "counterMax", .. }
        ));
    }

    #[test]
    fn test_rate_fields_ignored_without_rate() {
        let mut target = QueryTarget::new("net.bytes");
        target.counter_max = Some("lots".to_string());

        let query = translate_target(&target, &templates()).unwrap().unwrap();
        assert_eq!(query.rate, None);
        assert_eq!(query.rate_options, None);
    }

    #[test]
    fn test_downsample_and_variables() {
        let mut target = QueryTarget::new("sys.cpu").with_tag("host", "$host");
        target.aggregator = Some("sum".to_string());
        target.should_downsample = true;
        target.downsample_interval = Some("$interval".to_string());
        target.downsample_aggregator = Some("max".to_string());

        let query = translate_target(&target, &templates()).unwrap().unwrap();
        assert_eq!(query.aggregator, "sum");
        assert_eq!(query.downsample.as_deref(), Some("5m-max"));
        assert_eq!(query.tags.get("host").map(String::as_str), Some("web01"));
    }

    #[test]
    fn test_range_translation() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let dates = RelativeDateParser::with_now(now);

        let range = translate_range(&RawTimeRange::new("now-1h", "now"), &dates).unwrap();
        assert_eq!(range.start, now.timestamp_millis() - 3_600_000);
        assert_eq!(range.end, None);

        let range = translate_range(
            &RawTimeRange::new("2024-01-01T00:00:00Z", "2024-01-01T06:00:00Z"),
            &dates,
        )
        .unwrap();
        assert_eq!(range.end, Some(range.start + 6 * 3_600_000));
    }

    #[test]
    fn test_range_open_start_uses_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let dates = RelativeDateParser::with_now(now);

        let range = translate_range(&RawTimeRange::new("now", "now"), &dates).unwrap();
        assert_eq!(range.start, now.timestamp_millis());
        assert_eq!(range.end, None);
    }
}
