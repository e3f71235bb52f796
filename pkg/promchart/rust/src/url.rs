// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Prometheus HTTP API URL construction.

use std::fmt;

use chrono::Utc;

use crate::datetime::MINUTE_MS;

/// Defaults applied to range queries when the caller leaves a value out.
pub const DEFAULT_SAMPLES: u32 = 30;
pub const DEFAULT_TIMESPAN_MS: i64 = 30 * MINUTE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrometheusEndpoint {
    Label,
    Rules,
    Query,
    QueryRange,
}

impl PrometheusEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrometheusEndpoint::Label => "api/v1/label",
            PrometheusEndpoint::Rules => "api/v1/rules",
            PrometheusEndpoint::Query => "api/v1/query",
            PrometheusEndpoint::QueryRange => "api/v1/query_range",
        }
    }
}

impl fmt::Display for PrometheusEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for [`prometheus_url`].
///
/// `end_time`, `samples` and `timespan` only apply to
/// [`PrometheusEndpoint::QueryRange`]; `query` and `timeout` are passed through
/// for every endpoint when non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrometheusUrlParams {
    /// End of the range in epoch milliseconds.
    pub end_time: Option<i64>,
    pub query: Option<String>,
    pub samples: Option<u32>,
    /// Query evaluation timeout, in Prometheus duration syntax ("30s").
    pub timeout: Option<String>,
    /// Range width in milliseconds.
    pub timespan: Option<i64>,
}

/// Range vector queries require start, end and step, all in seconds.
fn range_vector_params(end_time: i64, samples: u32, timespan: i64) -> Vec<(&'static str, String)> {
    let start = (end_time - timespan) as f64 / 1000.0;
    let end = end_time as f64 / 1000.0;
    let step = timespan as f64 / f64::from(samples) / 1000.0;
    vec![
        ("start", start.to_string()),
        ("end", end.to_string()),
        ("step", step.to_string()),
    ]
}

fn search_params(endpoint: PrometheusEndpoint, params: &PrometheusUrlParams) -> Vec<(&'static str, String)> {
    let mut search = if endpoint == PrometheusEndpoint::QueryRange {
        range_vector_params(
            params.end_time.unwrap_or_else(|| Utc::now().timestamp_millis()),
            params.samples.filter(|s| *s > 0).unwrap_or(DEFAULT_SAMPLES),
            params.timespan.filter(|t| *t > 0).unwrap_or(DEFAULT_TIMESPAN_MS),
        )
    } else {
        Vec::new()
    };

    let scalars = [("query", &params.query), ("timeout", &params.timeout)];
    for (key, value) in scalars {
        if let Some(value) = value
            && !value.is_empty()
        {
            search.push((key, value.clone()));
        }
    }
    search
}

/// application/x-www-form-urlencoded value encoding.
fn encode(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Builds `<base_path>/<endpoint>?<params>`.
pub fn prometheus_url(base_path: &str, endpoint: PrometheusEndpoint, params: &PrometheusUrlParams) -> String {
    let query = search_params(endpoint, params)
        .iter()
        .map(|(key, value)| format!("{key}={}", encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}/{}?{}", base_path.trim_end_matches('/'), endpoint, query)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn range(end_time: i64, timespan: i64, samples: u32) -> PrometheusUrlParams {
        PrometheusUrlParams {
            end_time: Some(end_time),
            samples: Some(samples),
            timespan: Some(timespan),
            ..Default::default()
        }
    }

    #[test]
    fn test_range_query_params() {
        let url = prometheus_url(
            "http://prom:9090",
            PrometheusEndpoint::QueryRange,
            &range(1_000_000, 1_800_000, 60),
        );
        assert_eq!(url, "http://prom:9090/api/v1/query_range?start=-800&end=1000&step=30");
    }

    #[test]
    fn test_range_query_fractional_seconds() {
        let url = prometheus_url(
            "http://prom:9090",
            PrometheusEndpoint::QueryRange,
            &range(1_700_000_000_500, 60_000, 40),
        );
        assert_eq!(
            url,
            "http://prom:9090/api/v1/query_range?start=1699999940.5&end=1700000000.5&step=1.5"
        );
    }

    #[test]
    fn test_range_query_with_scalars() {
        let params = PrometheusUrlParams {
            query: Some("rate(node_cpu_seconds_total{mode='system'}[1m])".to_string()),
            timeout: Some("30s".to_string()),
            ..range(1_000_000, 1_800_000, 60)
        };
        let url = prometheus_url("http://prom:9090", PrometheusEndpoint::QueryRange, &params);
        assert_eq!(
            url,
            "http://prom:9090/api/v1/query_range?start=-800&end=1000&step=30\
             &query=rate%28node_cpu_seconds_total%7Bmode%3D%27system%27%7D%5B1m%5D%29&timeout=30s"
        );
    }

    #[test]
    fn test_empty_scalars_omitted() {
        let params = PrometheusUrlParams {
            query: Some(String::new()),
            timeout: None,
            ..range(1_000_000, 1_800_000, 60)
        };
        let url = prometheus_url("http://prom:9090", PrometheusEndpoint::QueryRange, &params);
        assert!(!url.contains("query="));
        assert!(!url.contains("timeout"));
    }

    #[test]
    fn test_non_range_endpoint_has_no_window() {
        let params = PrometheusUrlParams {
            query: Some("up == 1".to_string()),
            ..range(1_000_000, 1_800_000, 60)
        };
        let url = prometheus_url("http://prom:9090", PrometheusEndpoint::Query, &params);
        assert_eq!(url, "http://prom:9090/api/v1/query?query=up+%3D%3D+1");

        let url = prometheus_url("/prom", PrometheusEndpoint::Rules, &PrometheusUrlParams::default());
        assert_eq!(url, "/prom/api/v1/rules?");
    }

    #[test]
    fn test_range_defaults() {
        let params = PrometheusUrlParams {
            end_time: Some(3_600_000),
            ..Default::default()
        };
        let url = prometheus_url("http://prom", PrometheusEndpoint::QueryRange, &params);
        assert_eq!(url, "http://prom/api/v1/query_range?start=1800&end=3600&step=60");
    }

    #[test]
    fn test_trailing_slash_in_base_path() {
        let url = prometheus_url("http://prom/", PrometheusEndpoint::Label, &PrometheusUrlParams::default());
        assert_eq!(url, "http://prom/api/v1/label?");
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(PrometheusEndpoint::Label.to_string(), "api/v1/label");
        assert_eq!(PrometheusEndpoint::Rules.to_string(), "api/v1/rules");
        assert_eq!(PrometheusEndpoint::Query.to_string(), "api/v1/query");
        assert_eq!(PrometheusEndpoint::QueryRange.to_string(), "api/v1/query_range");
    }
}
