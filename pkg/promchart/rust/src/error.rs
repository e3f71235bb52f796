// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of a single query fetch. None of these escape a poll tick; the
/// chart logs them and keeps the previous series for the failed query.
#[derive(Error, Debug)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("invalid request header {0:?}")]
    InvalidHeader(String),

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("query API returned {status}: {error_type}: {error}")]
    Api {
        status: String,
        error_type: String,
        error: String,
    },

    #[error("series producer failed: {0}")]
    Producer(String),
}
