// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Polls Prometheus range queries on a schedule and reports each chart
//! update, either as log lines or as JSON snapshots on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

use dd_promchart::config::{self, CONFIG_PATH_ENV, ChartConfig};
use dd_promchart::datetime::{format_duration, format_time, parse_duration};
use dd_promchart::{Chart, ChartSnapshot, format_value, humanize_number_si};

/// Live Prometheus range-query chart
#[derive(Parser, Debug)]
#[command(name = "dd-promchart")]
#[command(about = "Poll Prometheus range queries and report chart updates")]
struct Args {
    /// Chart definition (YAML)
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Query API base URL; overrides the config file
    #[arg(long)]
    base_path: Option<String>,

    /// PromQL query, repeatable; overrides the config file queries
    #[arg(short, long = "query")]
    queries: Vec<String>,

    /// Window width, e.g. "1h 30m"
    #[arg(long)]
    timespan: Option<String>,

    /// Fetch once and exit
    #[arg(long, default_value = "false")]
    once: bool,

    /// Print each snapshot as a JSON line on stdout
    #[arg(long, default_value = "false")]
    json: bool,
}

fn resolve_config(args: &Args) -> Result<ChartConfig> {
    let mut cfg = match &args.config {
        Some(path) => config::load_config(path)?,
        // Flags alone are enough to describe a chart.
        None if args.base_path.is_some() && !args.queries.is_empty() => ChartConfig::default(),
        None => config::load_config(&config::config_path())?,
    };

    if let Some(base_path) = &args.base_path {
        cfg.base_path = base_path.clone();
    }
    if !args.queries.is_empty() {
        cfg.queries = args.queries.clone();
    }
    if let Some(timespan) = &args.timespan {
        cfg.timespan = Some(timespan.clone());
    }
    Ok(cfg)
}

fn local_time(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| format_time(&t.with_timezone(&Local)))
        .unwrap_or_default()
}

fn report(snapshot: &ChartSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot).context("serializing snapshot")?);
        return Ok(());
    }

    let (from, to) = snapshot.x_domain;
    info!(
        from = %local_time(from),
        to = %local_time(to),
        span = %format_duration(snapshot.span),
        series = snapshot.series.len(),
        "chart updated"
    );
    for plot in &snapshot.series {
        let latest = plot.series.points.iter().rev().find_map(|p| p.y.value());
        let gaps = plot.series.points.iter().filter(|p| p.y.is_gap()).count();
        info!(
            series = %plot.name,
            latest = %latest.map(|v| humanize_number_si(v).string).unwrap_or_else(|| "-".to_string()),
            points = plot.series.points.len(),
            gaps,
            "series"
        );
    }
    if let Some(threshold) = &snapshot.threshold {
        info!(threshold = %format_value(threshold.threshold), label = threshold.label(), "threshold");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing - RUST_LOG takes precedence, fallback to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Some(timespan) = &args.timespan
        && parse_duration(timespan) == 0
    {
        anyhow::bail!("invalid --timespan {timespan:?}, expected e.g. \"1h 30m\"");
    }

    let cfg = resolve_config(&args)?;
    info!(
        base_path = %cfg.base_path,
        queries = cfg.queries.len(),
        "dd-promchart starting (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let mut chart = Chart::new(cfg.into_options()?);

    if args.once {
        chart.tick().await;
        return report(&chart.snapshot(), args.json);
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut updates = chart.subscribe();
    chart.start().await;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                report(&snapshot, args.json)?;
            }
        }
    }

    chart.stop();
    info!("dd-promchart shutting down");
    Ok(())
}
