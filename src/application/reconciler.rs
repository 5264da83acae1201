// Response reconciliation - attribute each returned series to the target that asked for it
use crate::application::collaborators::TemplateSrv;
use crate::domain::label::{GroupByTags, create_metric_label};
use crate::domain::query::QueryTarget;
use crate::domain::series::{Datapoints, SeriesResult};
use std::collections::BTreeMap;

const WILDCARD: &str = "*";

/// Does `target` plausibly describe `series`?
///
/// Metric names must match after variable expansion. A target without tags accepts any
/// tag set. Otherwise each target tag is variable-expanded, wildcard keys or values are
/// skipped, and the series must carry every remaining tag with the same value.
pub fn target_matches(
    series: &SeriesResult,
    target: &QueryTarget,
    templates: &dyn TemplateSrv,
) -> bool {
    if target.metric.is_empty() || series.metric != templates.replace(&target.metric) {
        return false;
    }
    if target.tags.is_empty() {
        return true;
    }

    let expanded: BTreeMap<String, String> = target
        .tags
        .iter()
        .map(|(k, v)| (templates.replace(k), templates.replace(v)))
        .filter(|(k, v)| k != WILDCARD && v != WILDCARD)
        .collect();

    expanded
        .iter()
        .all(|(k, v)| series.tags.get(k) == Some(v))
}

/// First matching target in declared order, falling back to the first declared target.
///
/// The fallback can mislabel a series when several targets share a metric and none of
/// their tag filters match, but it keeps every series visible.
pub fn find_target<'a>(
    series: &SeriesResult,
    targets: &'a [QueryTarget],
    templates: &dyn TemplateSrv,
) -> Option<&'a QueryTarget> {
    targets
        .iter()
        .find(|t| target_matches(series, t, templates))
        .or_else(|| {
            tracing::debug!(
                "No target matched series {} {:?}, attributing to first target",
                series.metric,
                series.tags
            );
            targets.first()
        })
}

pub fn transform_series(
    series: &SeriesResult,
    group_by: &GroupByTags,
    target: Option<&QueryTarget>,
) -> Datapoints {
    let alias = target.and_then(|t| t.alias.as_deref());
    let label = create_metric_label(&series.metric, &series.tags, group_by, alias);
    Datapoints::new(label, series.points())
}

/// Label every series in response order.
pub fn reconcile(
    series: &[SeriesResult],
    targets: &[QueryTarget],
    group_by: &GroupByTags,
    templates: &dyn TemplateSrv,
) -> Vec<Datapoints> {
    series
        .iter()
        .map(|s| transform_series(s, group_by, find_target(s, targets, templates)))
        .collect()
}
