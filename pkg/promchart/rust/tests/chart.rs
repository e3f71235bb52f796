// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dd_promchart::model::Labels;
use dd_promchart::{
    Chart, ChartOptions, Error, FetchOptions, GraphType, PrometheusResponse, PrometheusResult, PrometheusValue,
    Result, Transport, select_tooltip,
};
use futures::FutureExt;
use futures::future::BoxFuture;

type Handler = dyn Fn(usize, &str) -> (Duration, Result<PrometheusResponse>) + Send + Sync;

/// Records requested URLs and answers through `handler`, which gets the
/// call number (from 1) and the URL.
struct MockTransport {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    handler: Box<Handler>,
}

impl MockTransport {
    fn new(handler: impl Fn(usize, &str) -> (Duration, Result<PrometheusResponse>) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<PrometheusResponse>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.urls.lock().unwrap().push(url.to_string());
        let (delay, response) = (self.handler)(call, url);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
        .boxed()
    }
}

fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn matrix(metric: Labels) -> PrometheusResponse {
    PrometheusResponse::matrix(vec![PrometheusResult {
        metric,
        values: Some(vec![
            PrometheusValue(1_700_000_000.0, "1".to_string()),
            PrometheusValue(1_700_000_030.0, "2".to_string()),
        ]),
        value: None,
    }])
}

fn structured(transport: Arc<MockTransport>, queries: &[&str]) -> ChartOptions {
    ChartOptions::new(FetchOptions::Structured {
        base_path: "http://prom:9090/".to_string(),
        queries: queries.iter().map(|q| q.to_string()).collect(),
        transport,
    })
}

#[tokio::test]
async fn test_range_queries_issued_per_tick() {
    let transport = MockTransport::new(|_, _| (Duration::ZERO, Ok(matrix(labels(&[("job", "node")])))));
    let options = ChartOptions {
        samples: Some(60),
        timespan: Some(30 * 60 * 1000),
        ..structured(Arc::clone(&transport), &["up", "", "sum(rate(x[1m]))"])
    };
    let chart = Chart::new(options);
    chart.tick().await;

    let urls = transport.urls();
    assert_eq!(urls.len(), 2, "empty queries are not fetched");
    for url in &urls {
        assert!(url.starts_with("http://prom:9090/api/v1/query_range?start="));
        assert!(url.contains("&step=30&"));
        assert!(url.ends_with("&timeout=30s"));
    }
    assert!(urls[0].contains("&query=up&"));
    assert!(urls[1].contains("&query=sum%28rate%28x%5B1m%5D%29%29&"));

    let snapshot = chart.snapshot();
    assert_eq!(snapshot.series.len(), 2);
    assert_eq!(snapshot.series[0].query_index, 0);
    assert_eq!(snapshot.series[1].query_index, 2);
    assert_eq!(snapshot.samples, 60);
}

#[tokio::test]
async fn test_failed_query_keeps_its_previous_series() {
    let transport = MockTransport::new(|call, url| {
        let response = if url.contains("query=flaky") && call > 2 {
            Err(Error::Status(503))
        } else if url.contains("query=flaky") {
            Ok(matrix(labels(&[("q", "flaky")])))
        } else {
            Ok(matrix(labels(&[("q", "stable"), ("call", call.to_string().as_str())])))
        };
        (Duration::ZERO, response)
    });
    let chart = Chart::new(structured(Arc::clone(&transport), &["stable", "flaky"]));

    chart.tick().await;
    let first = chart.snapshot();
    chart.tick().await;
    let second = chart.snapshot();

    assert_eq!(transport.urls().len(), 4);
    assert_eq!(second.series.len(), 2);
    // The healthy query moved on, the failing one kept its last result.
    assert_ne!(first.series[0].series.labels, second.series[0].series.labels);
    assert_eq!(first.series[1].series, second.series[1].series);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_api_error_status_keeps_previous_series() {
    let transport = MockTransport::new(|call, _| {
        let response = if call == 1 {
            matrix(labels(&[("job", "a")]))
        } else {
            PrometheusResponse {
                status: "error".to_string(),
                data: None,
                error_type: Some("timeout".to_string()),
                error: Some("query timed out".to_string()),
                warnings: Vec::new(),
            }
        };
        (Duration::ZERO, Ok(response))
    });
    let chart = Chart::new(structured(transport, &["up"]));

    chart.tick().await;
    chart.tick().await;
    let snapshot = chart.snapshot();
    assert_eq!(snapshot.series.len(), 1);
    assert_eq!(snapshot.series[0].name, "{job=a}");
}

#[tokio::test(start_paused = true)]
async fn test_slow_tick_does_not_overwrite_newer_results() {
    let transport = MockTransport::new(|call, _| {
        let delay = if call == 1 { Duration::from_secs(10) } else { Duration::ZERO };
        (delay, Ok(matrix(labels(&[("call", call.to_string().as_str())]))))
    });
    let chart = Chart::new(structured(transport, &["up"]));

    tokio::join!(chart.tick(), chart.tick());

    let snapshot = chart.snapshot();
    assert_eq!(snapshot.series.len(), 1);
    assert_eq!(snapshot.series[0].series.labels.get("call").map(String::as_str), Some("2"));
}

#[tokio::test(start_paused = true)]
async fn test_polls_until_stopped() {
    let transport = MockTransport::new(|_, _| (Duration::ZERO, Ok(matrix(labels(&[("job", "a")])))));
    let options = ChartOptions {
        poll_interval: Some(Duration::from_secs(5)),
        ..structured(Arc::clone(&transport), &["up"])
    };
    let mut chart = Chart::new(options);
    let mut updates = chart.subscribe();

    chart.start().await;
    assert!(chart.is_running());
    assert_eq!(transport.urls().len(), 1);
    assert!(updates.has_changed().unwrap());
    drop(updates.borrow_and_update());

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(transport.urls().len(), 3);
    assert!(updates.has_changed().unwrap());

    chart.stop();
    assert!(!chart.is_running());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.urls().len(), 3);
}

#[tokio::test]
async fn test_snapshot_drives_tooltip() {
    let options = ChartOptions {
        graph_type: GraphType::Area,
        ..ChartOptions::new(FetchOptions::custom(|| {
            async {
                Ok::<_, Error>(PrometheusResponse::matrix(vec![
                    PrometheusResult {
                        metric: labels(&[("__name__", "mem"), ("pod", "a")]),
                        values: Some(vec![PrometheusValue(1_700_000_000.0, "1500".to_string())]),
                        value: None,
                    },
                    PrometheusResult {
                        metric: labels(&[("__name__", "mem"), ("pod", "b")]),
                        values: Some(vec![PrometheusValue(1_700_000_000.0, "2500".to_string())]),
                        value: None,
                    },
                ]))
            }
            .boxed()
        }))
    };
    let chart = Chart::new(options);
    chart.tick().await;

    let mut input = chart.snapshot().tooltip_input(1_700_000_001_000);
    input.center = Some(dd_promchart::tooltip::Coordinates { x: 400.0, y: 150.0 });
    input.height = Some(350.0);
    input.width = Some(900.0);
    input.x = Some(410.0);

    let tooltip = select_tooltip(&input).unwrap();
    let entries: Vec<_> = tooltip
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.formatted.as_str(), e.total))
        .collect();
    assert_eq!(entries, vec![("mem{pod=b}", "2.5k", 4000.0), ("mem{pod=a}", "1.5k", 1500.0)]);
    assert!(!tooltip.on_left);
}
