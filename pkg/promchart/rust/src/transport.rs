// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP transport for the query API.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::PrometheusResponse;

/// Fetches and decodes one query API response.
///
/// API-level failures (`"status": "error"`) are returned as a decoded
/// response; callers decide what to do with them.
pub trait Transport: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<PrometheusResponse>>;
}

/// reqwest-backed [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a transport with a per-request timeout and headers sent with
    /// every request.
    pub fn new(timeout: Duration, headers: &BTreeMap<String, String>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.clone()))?;
            default_headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<PrometheusResponse>> {
        async move {
            debug!(url, "fetching");
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            let body = resp.bytes().await?;

            // The API reports query errors with a 4xx/5xx status and a JSON
            // body; only fall back to the HTTP status when there is no body.
            match serde_json::from_slice::<PrometheusResponse>(&body) {
                Ok(decoded) => Ok(decoded),
                Err(_) if !status.is_success() => Err(Error::Status(status.as_u16())),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }
}
