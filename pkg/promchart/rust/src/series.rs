// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Raw query results to plottable, gap-aware series.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::datetime::SECOND_MS;
use crate::model::{Labels, PrometheusResult, PrometheusValue};

/// Min and max number of data samples per data series.
pub const MIN_SAMPLES: u32 = 10;
pub const MAX_SAMPLES: u32 = 300;

/// Minimum step (milliseconds between data samples).
pub const MIN_STEP_MS: i64 = 5 * SECOND_MS;

/// Label holding the metric name.
const METRIC_NAME_LABEL: &str = "__name__";

/// A plotted value. `Gap` marks a timestamp with no usable reading and
/// serializes as `null` so renderers break the line there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampleValue {
    Value(f64),
    Gap,
}

impl SampleValue {
    /// Coerces a Prometheus sample string. Anything that is not a finite
    /// number (including "NaN" and "+Inf") is a gap.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => SampleValue::Value(v),
            _ => SampleValue::Gap,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            SampleValue::Value(v) => Some(*v),
            SampleValue::Gap => None,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, SampleValue::Gap)
    }
}

/// One point of a plotted series; `x` is epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphPoint {
    pub x: i64,
    pub y: SampleValue,
}

impl GraphPoint {
    pub fn new(x: i64, y: f64) -> Self {
        Self {
            x,
            y: SampleValue::Value(y),
        }
    }

    pub fn gap(x: i64) -> Self {
        Self {
            x,
            y: SampleValue::Gap,
        }
    }
}

/// A labeled series ready for plotting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub labels: Labels,
    pub points: Vec<GraphPoint>,
}

/// Converts raw samples to points and fills missing timestamps with gaps.
///
/// The query API silently omits timestamps it has no data for, which would
/// otherwise be drawn as a line connecting both sides of the hole. Walking the
/// expected timestamps at `span / samples` from the first to the last sample
/// and inserting a gap wherever the next real sample is later than expected
/// restores the break.
pub fn format_series_values(values: &[PrometheusValue], samples: u32, span: i64) -> Vec<GraphPoint> {
    let mut real = values.iter().map(|v| GraphPoint {
        x: v.timestamp_ms(),
        y: SampleValue::parse(&v.1),
    });

    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return Vec::new();
    };
    let start = first.timestamp_ms() as f64;
    let end = last.timestamp_ms() as f64;
    let step = span as f64 / f64::from(samples);
    // Sub-millisecond steps cannot produce distinct timestamps.
    if !step.is_finite() || step < 1.0 {
        return real.collect();
    }

    // Samples far outside the window would otherwise walk an unbounded grid.
    let max_slots = usize::try_from(samples).unwrap_or(usize::MAX).saturating_add(values.len());
    let mut points = Vec::with_capacity(values.len());
    let mut next = real.next();
    for slot in 0..max_slots {
        let expected = start + step * slot as f64;
        if expected >= end {
            break;
        }
        let x = expected.trunc() as i64;
        match next {
            Some(point) if point.x > x => points.push(GraphPoint::gap(x)),
            Some(point) => {
                points.push(point);
                next = real.next();
            }
            None => break,
        }
    }
    points.extend(next);
    points.extend(real);
    points
}

/// Builds one [`Series`] per labeled result, using its range `values`.
pub fn series_from_results(results: Vec<PrometheusResult>, samples: u32, span: i64) -> Vec<Series> {
    results
        .into_iter()
        .map(|result| Series {
            points: format_series_values(result.values.as_deref().unwrap_or_default(), samples, span),
            labels: result.metric,
        })
        .collect()
}

/// Two points drawing a constant reference line across `[end - span, end]`.
pub fn threshold_data(threshold: f64, span: i64, end: i64) -> Vec<GraphPoint> {
    vec![
        GraphPoint::new(end - span, threshold),
        GraphPoint::new(end, threshold),
    ]
}

/// The synthetic threshold series plus the values it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdData {
    pub points: Vec<GraphPoint>,
    pub threshold: f64,
    pub text: Option<String>,
}

impl ThresholdData {
    pub const DEFAULT_TEXT: &'static str = "Limit";

    pub fn new(threshold: f64, text: Option<String>, span: i64, end: i64) -> Self {
        Self {
            points: threshold_data(threshold, span, end),
            threshold,
            text,
        }
    }

    /// Legend and tooltip label.
    pub fn label(&self) -> &str {
        self.text.as_deref().unwrap_or(Self::DEFAULT_TEXT)
    }
}

/// Largest sample count for `span` that keeps the step at or above
/// [`MIN_STEP_MS`], within `[MIN_SAMPLES, MAX_SAMPLES]`.
pub fn max_samples_for_span(span: i64) -> u32 {
    let samples = (span as f64 / MIN_STEP_MS as f64).round();
    samples.clamp(f64::from(MIN_SAMPLES), f64::from(MAX_SAMPLES)) as u32
}

/// X axis domain for a window ending at `end`.
pub fn x_domain(end: i64, span: i64) -> (i64, i64) {
    (end - span, end)
}

/// Default series name: `metric{label=value,...}`.
pub fn format_labels(labels: &Labels) -> String {
    let name = labels.get(METRIC_NAME_LABEL).map(String::as_str).unwrap_or_default();
    let other = labels
        .iter()
        .filter(|(k, _)| k.as_str() != METRIC_NAME_LABEL)
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}{{{other}}}")
}

/// Replaces `{label}` placeholders with label values; unknown labels render
/// empty and unmatched braces are kept as-is.
fn render_template(template: &str, labels: &Labels) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let (before, after) = rest.split_at(open);
        out.push_str(before);
        match after.find('}') {
            Some(close) => {
                let key = after.get(1..close).unwrap_or_default();
                out.push_str(labels.get(key).map(String::as_str).unwrap_or_default());
                rest = after.get(close + 1..).unwrap_or_default();
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub type TitleFn = Arc<dyn Fn(&Labels, usize) -> String + Send + Sync>;

/// How series are named in legends and tooltips.
#[derive(Clone, Default)]
pub enum SeriesTitle {
    /// `metric{label=value,...}`
    #[default]
    Labels,
    /// A template such as `"cpu{cpu}"`.
    Template(String),
    /// Called with the series labels and the index of the query that
    /// produced it.
    Custom(TitleFn),
}

impl SeriesTitle {
    pub fn title(&self, labels: &Labels, query_index: usize) -> String {
        match self {
            SeriesTitle::Labels => format_labels(labels),
            SeriesTitle::Template(template) => render_template(template, labels),
            SeriesTitle::Custom(f) => f(labels, query_index),
        }
    }
}

impl fmt::Debug for SeriesTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesTitle::Labels => write!(f, "Labels"),
            SeriesTitle::Template(t) => f.debug_tuple("Template").field(t).finish(),
            SeriesTitle::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
