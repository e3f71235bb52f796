// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Prometheus HTTP API response shapes.
//!
//! ```json
//! {"status": "success",
//!  "data": {"resultType": "matrix",
//!           "result": [{"metric": {"__name__": "up"}, "values": [[1700000000, "1"]]}]}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Series identity: label name to label value.
pub type Labels = BTreeMap<String, String>;

/// `[epochSeconds, "value"]`. Values stay strings until the series
/// transformer coerces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusValue(pub f64, pub String);

impl PrometheusValue {
    pub fn timestamp_ms(&self) -> i64 {
        (self.0 * 1000.0).round() as i64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrometheusResult {
    #[serde(default)]
    pub metric: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<PrometheusValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PrometheusValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum PrometheusData {
    Matrix(Vec<PrometheusResult>),
    Vector(Vec<PrometheusResult>),
    Scalar(PrometheusValue),
    #[serde(rename = "string")]
    Text(PrometheusValue),
}

impl PrometheusData {
    /// Labeled results; empty for scalar and string results.
    pub fn results(&self) -> &[PrometheusResult] {
        match self {
            PrometheusData::Matrix(r) | PrometheusData::Vector(r) => r,
            PrometheusData::Scalar(_) | PrometheusData::Text(_) => &[],
        }
    }

    pub fn into_results(self) -> Vec<PrometheusResult> {
        match self {
            PrometheusData::Matrix(r) | PrometheusData::Vector(r) => r,
            PrometheusData::Scalar(_) | PrometheusData::Text(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrometheusData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PrometheusResponse {
    pub const SUCCESS: &'static str = "success";

    /// A successful matrix response, mostly for custom producers and tests.
    pub fn matrix(result: Vec<PrometheusResult>) -> Self {
        Self {
            status: Self::SUCCESS.to_string(),
            data: Some(PrometheusData::Matrix(result)),
            error_type: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Returns the labeled results, or [`Error::Api`] when the API reported a
    /// failure.
    pub fn into_results(self) -> Result<Vec<PrometheusResult>> {
        if self.status != Self::SUCCESS {
            return Err(Error::Api {
                status: self.status,
                error_type: self.error_type.unwrap_or_default(),
                error: self.error.unwrap_or_default(),
            });
        }
        Ok(self.data.map(PrometheusData::into_results).unwrap_or_default())
    }
}
