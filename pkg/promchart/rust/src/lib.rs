// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Live charting pipeline for Prometheus-compatible query APIs.
//!
//! The crate covers everything between "a chart is configured" and "a
//! rendering surface receives plottable series":
//!
//! 1. **URL building** (`url`) - range/instant/label/rules query URLs.
//! 2. **Polling** (`poll`) - immediate tick plus a fixed-cadence interval that
//!    always invokes the latest callback.
//! 3. **Series transformation** (`series`) - string samples to gap-aware
//!    points, threshold reference lines, series naming.
//! 4. **Formatting** (`humanize`, `datetime`) - SI magnitudes, durations,
//!    timestamps.
//! 5. **Tooltip selection** (`tooltip`) - which series values to show for a
//!    cursor position.
//!
//! [`Chart`] wires these together on top of a [`Transport`].

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod chart;
pub mod config;
pub mod datetime;
mod error;
pub mod humanize;
pub mod model;
pub mod poll;
pub mod series;
pub mod tooltip;
pub mod transport;
pub mod url;

// Re-export the public API
pub use chart::{Chart, ChartOptions, ChartSnapshot, FetchOptions, GraphType, SeriesTitle};
pub use config::ChartConfig;
pub use error::{Error, Result};
pub use humanize::{NumberSi, format_value, humanize_number_si};
pub use model::{PrometheusResponse, PrometheusResult, PrometheusValue};
pub use poll::{Poller, poll_delay};
pub use series::{GraphPoint, SampleValue, Series, ThresholdData};
pub use tooltip::{Tooltip, TooltipEntry, TooltipInput, select_tooltip};
pub use transport::{HttpTransport, Transport};
pub use url::{PrometheusEndpoint, PrometheusUrlParams, prometheus_url};
