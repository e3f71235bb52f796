// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Chart controller: polls the configured queries, keeps the latest series
//! per query and publishes snapshots for rendering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::datetime::{format_duration, parse_duration};
use crate::error::{Error, Result};
use crate::model::{PrometheusResponse, PrometheusResult};
use crate::poll::{Poller, poll_delay};
use crate::series::{Series, ThresholdData, max_samples_for_span, series_from_results, x_domain};
use crate::tooltip::{ActivePoint, SeriesStyle, TooltipInput, active_points};
use crate::transport::Transport;
use crate::url::{PrometheusEndpoint, PrometheusUrlParams, prometheus_url};

pub use crate::series::SeriesTitle;

/// Series palette, assigned in series order and reused cyclically.
pub const COLORS: [&str; 15] = [
    "#06c", "#4cb140", "#009596", "#f4c145", "#5752d1", "#ec7a08", "#7d1007", "#b8bbbe", "#8bc1f7", "#23511e",
    "#a2d9d9", "#f9e0a2", "#8481dd", "#f4b678", "#c9190b",
];

pub const THRESHOLD_COLOR: &str = "#4f5255";

/// Server-side evaluation timeout sent with every range query.
pub const QUERY_TIMEOUT: &str = "30s";

const DEFAULT_TIMESPAN: &str = "30m";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// Stacked areas.
    Area,
    #[default]
    Line,
}

impl GraphType {
    pub fn is_stacked(self) -> bool {
        self == GraphType::Area
    }
}

pub type ProducerFn = Arc<dyn Fn() -> BoxFuture<'static, Result<PrometheusResponse>> + Send + Sync>;

/// Where series come from.
#[derive(Clone)]
pub enum FetchOptions {
    /// One range query per entry of `queries` against `base_path`. Request
    /// options (timeout, headers) live in the transport.
    Structured {
        base_path: String,
        queries: Vec<String>,
        transport: Arc<dyn Transport>,
    },
    /// A caller-supplied producer returning a single response.
    Custom { producer: ProducerFn },
}

impl FetchOptions {
    pub fn custom<F>(producer: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<PrometheusResponse>> + Send + Sync + 'static,
    {
        FetchOptions::Custom {
            producer: Arc::new(producer),
        }
    }

    fn slots(&self) -> usize {
        match self {
            FetchOptions::Structured { queries, .. } => queries.len(),
            FetchOptions::Custom { .. } => 1,
        }
    }
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOptions::Structured { base_path, queries, .. } => f
                .debug_struct("Structured")
                .field("base_path", base_path)
                .field("queries", queries)
                .finish_non_exhaustive(),
            FetchOptions::Custom { .. } => f.debug_struct("Custom").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub fetch: FetchOptions,
    pub graph_type: GraphType,
    /// Samples per series; derived from the span when unset.
    pub samples: Option<u32>,
    pub show_legend: bool,
    /// Window width in milliseconds; 30 minutes when unset.
    pub timespan: Option<i64>,
    /// Derived from the span when unset or zero.
    pub poll_interval: Option<Duration>,
    pub threshold: Option<f64>,
    pub threshold_text: Option<String>,
    pub series_title: SeriesTitle,
}

impl ChartOptions {
    pub fn new(fetch: FetchOptions) -> Self {
        Self {
            fetch,
            graph_type: GraphType::default(),
            samples: None,
            show_legend: false,
            timespan: None,
            poll_interval: None,
            threshold: None,
            threshold_text: None,
            series_title: SeriesTitle::default(),
        }
    }

    fn samples_for_span(&self, span: i64) -> u32 {
        self.samples.filter(|s| *s > 0).unwrap_or_else(|| max_samples_for_span(span))
    }

    /// Zero and non-finite thresholds are treated as unset.
    fn threshold(&self) -> Option<f64> {
        self.threshold.filter(|t| *t != 0.0 && t.is_finite())
    }
}

/// A series with its display name and color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub name: String,
    pub color: String,
    /// Index of the query that produced this series.
    pub query_index: usize,
    #[serde(flatten)]
    pub series: Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendSymbol {
    Series,
    Threshold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub name: String,
    pub color: String,
    pub symbol: LegendSymbol,
}

/// Everything a rendering surface needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub series: Vec<PlotSeries>,
    pub threshold: Option<ThresholdData>,
    /// Empty when the legend is disabled.
    pub legend: Vec<LegendEntry>,
    pub x_domain: (i64, i64),
    pub span: i64,
    pub samples: u32,
    pub stacked: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChartSnapshot {
    /// Tooltip styles aligned with [`ChartSnapshot::series`].
    pub fn tooltip_styles(&self) -> Vec<SeriesStyle> {
        self.series
            .iter()
            .map(|s| SeriesStyle {
                fill: s.color.clone(),
                name: Some(s.name.clone()),
            })
            .collect()
    }

    pub fn active_points(&self, cursor_ms: i64) -> Vec<ActivePoint> {
        active_points(self.series.iter().map(|s| &s.series), cursor_ms, self.stacked)
    }

    /// Tooltip input for a cursor at `cursor_ms`. The surface fills in the
    /// geometry (`center`, `height`, `width`, `x`).
    pub fn tooltip_input(&self, cursor_ms: i64) -> TooltipInput {
        TooltipInput {
            active_points: Some(self.active_points(cursor_ms)),
            styles: Some(self.tooltip_styles()),
            ..TooltipInput::default()
        }
        .with_threshold(self.threshold.as_ref())
    }
}

struct State {
    span: i64,
    samples: u32,
    /// Latest series per query slot.
    series: Vec<Vec<Series>>,
    threshold: Option<ThresholdData>,
    end: i64,
    updated_at: Option<DateTime<Utc>>,
    /// Sequence number of the last tick whose results were applied, or of
    /// the last tick issued before a stop.
    committed: u64,
}

struct Inner {
    options: ChartOptions,
    state: Mutex<State>,
    sequence: AtomicU64,
    snapshots: watch::Sender<ChartSnapshot>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn tick(&self) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let (span, samples) = {
            let state = self.state();
            (state.span, state.samples)
        };
        // Shared by every query so all series have the same X values.
        let now = Utc::now();
        let end = now.timestamp_millis();

        let threshold = self
            .options
            .threshold()
            .map(|t| ThresholdData::new(t, self.options.threshold_text.clone(), span, end));

        let results: Vec<Option<Vec<Series>>> = match &self.options.fetch {
            FetchOptions::Structured {
                base_path,
                queries,
                transport,
            } => {
                join_all(
                    queries
                        .iter()
                        .map(|query| fetch_query(transport.as_ref(), base_path, query, end, samples, span)),
                )
                .await
            }
            FetchOptions::Custom { producer } => {
                let result = producer()
                    .await
                    .and_then(|resp| decode(resp, "custom"))
                    .map(|results| series_from_results(results, samples, span));
                vec![log_failure(result, "custom")]
            }
        };

        let snapshot = {
            let mut state = self.state();
            let latest = self.sequence.load(Ordering::SeqCst);
            if seq != latest || seq <= state.committed {
                debug!(seq, latest, committed = state.committed, "discarding stale tick");
                return;
            }
            state.committed = seq;
            state.series.resize_with(results.len(), Vec::new);
            for (slot, result) in state.series.iter_mut().zip(results) {
                if let Some(series) = result {
                    *slot = series;
                }
            }
            state.threshold = threshold;
            state.end = end;
            state.updated_at = Some(now);
            self.build_snapshot(&state)
        };

        debug!(seq, series = snapshot.series.len(), "chart updated");
        self.snapshots.send_replace(snapshot);
    }

    fn build_snapshot(&self, state: &State) -> ChartSnapshot {
        let series: Vec<PlotSeries> = state
            .series
            .iter()
            .enumerate()
            .flat_map(|(query_index, slot)| slot.iter().map(move |s| (query_index, s)))
            .zip(COLORS.iter().cycle())
            .map(|((query_index, s), color)| PlotSeries {
                name: self.options.series_title.title(&s.labels, query_index),
                color: color.to_string(),
                query_index,
                series: s.clone(),
            })
            .collect();

        let mut legend = Vec::new();
        if self.options.show_legend {
            legend.extend(series.iter().map(|s| LegendEntry {
                name: s.name.clone(),
                color: s.color.clone(),
                symbol: LegendSymbol::Series,
            }));
            if let Some(threshold) = &state.threshold {
                legend.push(LegendEntry {
                    name: threshold.label().to_string(),
                    color: THRESHOLD_COLOR.to_string(),
                    symbol: LegendSymbol::Threshold,
                });
            }
        }

        ChartSnapshot {
            series,
            threshold: state.threshold.clone(),
            legend,
            x_domain: x_domain(state.end, state.span),
            span: state.span,
            samples: state.samples,
            stacked: self.options.graph_type.is_stacked(),
            updated_at: state.updated_at,
        }
    }

    /// Makes every tick started so far stale.
    fn invalidate_in_flight(&self) {
        let latest = self.sequence.load(Ordering::SeqCst);
        let mut state = self.state();
        state.committed = state.committed.max(latest);
    }
}

fn decode(resp: PrometheusResponse, query: &str) -> Result<Vec<PrometheusResult>> {
    for warning in &resp.warnings {
        warn!(query, warning = %warning, "query API warning");
    }
    resp.into_results()
}

fn log_failure(result: Result<Vec<Series>>, query: &str) -> Option<Vec<Series>> {
    match result {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(query, error = %e, "query failed, keeping previous series");
            None
        }
    }
}

/// `None` when the query failed; an empty query yields no series.
async fn fetch_query(
    transport: &dyn Transport,
    base_path: &str,
    query: &str,
    end: i64,
    samples: u32,
    span: i64,
) -> Option<Vec<Series>> {
    if query.is_empty() {
        return Some(Vec::new());
    }
    let url = prometheus_url(
        base_path,
        PrometheusEndpoint::QueryRange,
        &PrometheusUrlParams {
            end_time: Some(end),
            query: Some(query.to_string()),
            samples: Some(samples),
            timeout: Some(QUERY_TIMEOUT.to_string()),
            timespan: Some(span),
        },
    );
    let result = transport
        .fetch(&url)
        .await
        .and_then(|resp| decode(resp, query))
        .map(|results| series_from_results(results, samples, span));
    log_failure(result, query)
}

/// A live chart. Dropping it stops polling.
pub struct Chart {
    inner: Arc<Inner>,
    poller: Poller,
}

impl Chart {
    pub fn new(options: ChartOptions) -> Self {
        let span = options
            .timespan
            .filter(|t| *t > 0)
            .unwrap_or_else(|| parse_duration(DEFAULT_TIMESPAN));
        let samples = options.samples_for_span(span);

        let state = State {
            span,
            samples,
            series: vec![Vec::new(); options.fetch.slots()],
            threshold: None,
            end: Utc::now().timestamp_millis(),
            updated_at: None,
            committed: 0,
        };

        let (snapshots, _) = watch::channel(ChartSnapshot::default());
        let inner = Arc::new(Inner {
            options,
            state: Mutex::new(state),
            sequence: AtomicU64::new(0),
            snapshots,
        });
        inner.snapshots.send_replace(inner.build_snapshot(&inner.state()));

        let ticker = Arc::clone(&inner);
        let poller = Poller::new(move || {
            let inner = Arc::clone(&ticker);
            async move { inner.tick().await }
        });

        Self { inner, poller }
    }

    pub fn options(&self) -> &ChartOptions {
        &self.inner.options
    }

    pub fn span(&self) -> i64 {
        self.inner.state().span
    }

    pub fn samples(&self) -> u32 {
        self.inner.state().samples
    }

    /// Poll delay for the current span.
    pub fn poll_delay(&self) -> Duration {
        poll_delay(self.inner.options.poll_interval, self.span())
    }

    /// Fetches once and publishes the result.
    pub async fn tick(&self) {
        self.inner.tick().await;
    }

    /// Fetches immediately, then keeps polling in the background.
    pub async fn start(&mut self) {
        let delay = self.poll_delay();
        info!(
            span = %format_duration(self.span()),
            samples = self.samples(),
            poll_ms = delay.as_millis() as u64,
            "chart polling started"
        );
        self.poller.restart(Some(delay)).await;
    }

    /// Stops polling. Ticks still in flight are not applied.
    pub fn stop(&mut self) {
        if self.poller.is_running() {
            info!("chart polling stopped");
        }
        self.poller.stop();
        self.inner.invalidate_in_flight();
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_running()
    }

    /// Changes the window width. Samples follow the span unless fixed in
    /// the options; a running chart refetches immediately.
    pub async fn set_span(&mut self, span: i64) {
        if span <= 0 {
            warn!(span, "ignoring non-positive span");
            return;
        }
        {
            let mut state = self.inner.state();
            state.span = span;
            state.samples = self.inner.options.samples_for_span(span);
        }
        if self.is_running() {
            self.start().await;
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChartSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        self.inner.snapshots.borrow().clone()
    }
}

impl Drop for Chart {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Producer error helper for custom fetchers.
pub fn producer_error(message: impl Into<String>) -> Error {
    Error::Producer(message.into())
}
