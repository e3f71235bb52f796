// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Tooltip content and placement for a cursor over the chart.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::datetime::format_date_time_with_seconds;
use crate::humanize::format_value;
use crate::series::{SampleValue, Series, ThresholdData};

pub const TOOLTIP_MAX_ENTRIES: usize = 20;
pub const TOOLTIP_MAX_WIDTH: f64 = 300.0;
pub const TOOLTIP_MAX_HEIGHT: f64 = 400.0;

/// Plot area padding; the cursor outside of it is over the axes or legend.
pub const CHART_PADDING_TOP: f64 = 25.0;
pub const CHART_PADDING_BOTTOM: f64 = 110.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// The value of one series at the hovered timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivePoint {
    /// Epoch milliseconds.
    pub x: i64,
    pub y: SampleValue,
    /// Top of the stack at this point when series are stacked.
    pub y1: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub fill: String,
    /// `None` for unnamed series such as the threshold line.
    pub name: Option<String>,
}

/// Hover state reported by the rendering surface. Active points and styles
/// are aligned by series index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TooltipInput {
    pub active_points: Option<Vec<ActivePoint>>,
    pub center: Option<Coordinates>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub x: Option<f64>,
    pub styles: Option<Vec<SeriesStyle>>,
    pub threshold: Option<f64>,
    pub threshold_text: Option<String>,
}

impl TooltipInput {
    pub fn with_threshold(mut self, threshold: Option<&ThresholdData>) -> Self {
        self.threshold = threshold.map(|t| t.threshold);
        self.threshold_text = threshold.and_then(|t| t.text.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipEntry {
    pub color: String,
    pub name: String,
    pub value: f64,
    pub total: f64,
    /// `value` through [`format_value`].
    pub formatted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Vertical guide line under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuideLine {
    pub x: f64,
    pub y1: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub header: String,
    pub entries: Vec<TooltipEntry>,
    /// Box is drawn left of the cursor.
    pub on_left: bool,
    pub bounds: Rect,
    pub line: GuideLine,
}

/// A missing, zero or non-finite dimension means the surface has nothing to
/// hover yet.
fn present(v: Option<f64>) -> Option<f64> {
    v.filter(|v| *v != 0.0 && v.is_finite())
}

fn header<Tz: TimeZone>(input: &TooltipInput, time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match input.threshold.filter(|t| *t != 0.0 && t.is_finite()) {
        Some(threshold) => {
            let text = input.threshold_text.as_deref().unwrap_or(ThresholdData::DEFAULT_TEXT);
            format!("{text}: {}", format_value(threshold))
        }
        None => format_date_time_with_seconds(time),
    }
}

/// Decides whether and where to show the tooltip, rendering times in the
/// local time zone.
pub fn select_tooltip(input: &TooltipInput) -> Option<Tooltip> {
    select_tooltip_in(input, &Local)
}

/// [`select_tooltip`] with an explicit time zone for the header.
pub fn select_tooltip_in<Tz: TimeZone>(input: &TooltipInput, tz: &Tz) -> Option<Tooltip>
where
    Tz::Offset: std::fmt::Display,
{
    let active_points = input.active_points.as_deref()?;
    let center = input.center?;
    let height = present(input.height)?;
    let width = present(input.width)?;
    let styles = input.styles.as_deref()?;
    let x = present(input.x)?;

    let time = DateTime::from_timestamp_millis(active_points.first()?.x)?.with_timezone(tz);

    // Cursor too far from the active points, e.g. over a range with no data.
    if (x - center.x).abs() > width / 15.0 {
        return None;
    }
    // Cursor outside of the plot area.
    if height - center.y <= CHART_PADDING_BOTTOM || center.y <= CHART_PADDING_TOP {
        return None;
    }

    let box_width = (width / 2.0 + 60.0).min(TOOLTIP_MAX_WIDTH);
    let on_left = x > (width - 40.0) / 2.0;

    let mut entries: Vec<TooltipEntry> = active_points
        .iter()
        .zip(styles)
        .filter_map(|(point, style)| {
            let value = point.y.value()?;
            let name = style.name.clone()?;
            Some(TooltipEntry {
                color: style.fill.clone(),
                name,
                value,
                total: point.y1.unwrap_or(value),
                formatted: format_value(value),
            })
        })
        .collect();
    entries.sort_by(|a, b| b.total.total_cmp(&a.total));
    entries.truncate(TOOLTIP_MAX_ENTRIES);

    Some(Tooltip {
        header: header(input, &time),
        entries,
        on_left,
        bounds: Rect {
            x: if on_left { x - box_width } else { x },
            y: center.y - TOOLTIP_MAX_HEIGHT / 2.0,
            width: box_width,
            height: TOOLTIP_MAX_HEIGHT,
        },
        line: GuideLine {
            x,
            y1: CHART_PADDING_TOP,
            y2: height - CHART_PADDING_BOTTOM,
        },
    })
}

/// Points under a cursor at `cursor_ms`, one per series.
///
/// All series snap to the single timestamp nearest to the cursor; a series
/// without a sample there contributes a gap. When `stacked`, `y1` carries the
/// running total over the preceding series.
pub fn active_points<'a, I>(series: I, cursor_ms: i64, stacked: bool) -> Vec<ActivePoint>
where
    I: IntoIterator<Item = &'a Series>,
    I::IntoIter: Clone,
{
    let series = series.into_iter();
    let nearest = series
        .clone()
        .flat_map(|s| s.points.iter())
        .filter(|p| !p.y.is_gap())
        .map(|p| p.x)
        .min_by_key(|x| x.abs_diff(cursor_ms));
    let Some(nearest) = nearest else {
        return Vec::new();
    };

    let mut running = 0.0;
    series
        .map(|s| {
            let y = s
                .points
                .binary_search_by_key(&nearest, |p| p.x)
                .ok()
                .and_then(|i| s.points.get(i))
                .map_or(SampleValue::Gap, |p| p.y);
            let y1 = match (stacked, y) {
                (true, SampleValue::Value(v)) => {
                    running += v;
                    Some(running)
                }
                _ => None,
            };
            ActivePoint { x: nearest, y, y1 }
        })
        .collect()
}
