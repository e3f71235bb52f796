// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::chart::{ChartOptions, FetchOptions, GraphType, SeriesTitle};
use crate::datetime::parse_duration;
use crate::series::{MAX_SAMPLES, MIN_SAMPLES};
use crate::transport::HttpTransport;

pub const CONFIG_PATH_ENV: &str = "DD_PROMCHART_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "/etc/datadog-agent/promchart.yaml";

fn default_query_timeout() -> String {
    "30s".to_string()
}

/// Chart definition as read from YAML. Durations use the `1h 10m` syntax.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub queries: Vec<String>,
    pub samples: Option<u32>,
    pub timespan: Option<String>,
    pub poll_interval: Option<String>,
    pub threshold: Option<f64>,
    pub threshold_text: Option<String>,
    /// Label template such as `"cpu {cpu}"`.
    pub series_title: Option<String>,
    #[serde(default)]
    pub show_legend: bool,
    #[serde(default)]
    pub graph_type: GraphType,
    /// HTTP request timeout.
    #[serde(default = "default_query_timeout")]
    pub query_timeout: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_config(path: &Path) -> Result<ChartConfig> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: ChartConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    debug!("loaded chart config from {}", path.display());
    Ok(config)
}

/// Parses an optional duration field; unparseable or zero values count as
/// unset.
fn duration_field(name: &str, value: Option<&str>) -> Option<i64> {
    let text = value.filter(|v| !v.trim().is_empty())?;
    match parse_duration(text) {
        0 => {
            warn!(field = name, value = text, "ignoring invalid duration");
            None
        }
        ms => Some(ms),
    }
}

impl ChartConfig {
    /// Span in milliseconds, `None` to use the default.
    pub fn timespan_ms(&self) -> Option<i64> {
        duration_field("timespan", self.timespan.as_deref())
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        duration_field("poll_interval", self.poll_interval.as_deref())
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        duration_field("query_timeout", Some(&self.query_timeout))
            .and_then(|ms| u64::try_from(ms).ok())
            .map_or(HttpTransport::DEFAULT_TIMEOUT, Duration::from_millis)
    }

    /// Explicit sample count, clamped to the supported range.
    pub fn samples(&self) -> Option<u32> {
        self.samples
            .filter(|s| *s > 0)
            .map(|s| s.clamp(MIN_SAMPLES, MAX_SAMPLES))
    }

    pub fn into_options(self) -> Result<ChartOptions> {
        if self.base_path.is_empty() {
            bail!("base_path is required");
        }
        if self.queries.iter().all(String::is_empty) {
            bail!("at least one non-empty query is required");
        }

        let transport =
            HttpTransport::new(self.request_timeout(), &self.headers).context("building HTTP transport")?;

        Ok(ChartOptions {
            graph_type: self.graph_type,
            samples: self.samples(),
            show_legend: self.show_legend,
            timespan: self.timespan_ms(),
            poll_interval: self.poll_interval(),
            threshold: self.threshold,
            threshold_text: self.threshold_text.clone(),
            series_title: self
                .series_title
                .clone()
                .map_or(SeriesTitle::Labels, SeriesTitle::Template),
            fetch: FetchOptions::Structured {
                base_path: self.base_path,
                queries: self.queries,
                transport: Arc::new(transport),
            },
        })
    }
}
