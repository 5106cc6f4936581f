// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AHR999 index signal.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_core::HeraldError;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Public index API host.
pub const DEFAULT_BASE_URL: &str = "https://dncapi.flink1.com";

const INDEX_PATH: &str = "/api/v2/index/arh999?code=bitcoin&webp=1";

/// One AHR999 observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ahr999Reading {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub ahr999: f64,
}

/// Source of the current AHR999 value.
#[async_trait]
pub trait Ahr999Source: Send + Sync + 'static {
    async fn latest(&self) -> Result<Ahr999Reading, HeraldError>;
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

/// Reads AHR999 from the public index API.
#[derive(Debug, Clone)]
pub struct HttpAhr999Source {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAhr999Source {
    pub fn new() -> Result<Self, HeraldError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HeraldError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the source at another host (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Ahr999Source for HttpAhr999Source {
    async fn latest(&self) -> Result<Ahr999Reading, HeraldError> {
        let url = format!("{}{INDEX_PATH}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HeraldError::Internal(format!("AHR999 request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HeraldError::Internal(format!(
                "AHR999 API returned status {status}"
            )));
        }

        let body: IndexResponse = response
            .json()
            .await
            .map_err(|e| HeraldError::Internal(format!("failed to parse AHR999 response: {e}")))?;
        if body.code != 200 {
            return Err(HeraldError::Internal(format!(
                "AHR999 API error {}: {}",
                body.code, body.msg
            )));
        }

        let reading = latest_reading(&body.data).ok_or_else(|| {
            HeraldError::Internal("AHR999 API returned no usable data points".to_string())
        })?;
        debug!(ahr999 = reading.ahr999, price = reading.price, at = %reading.timestamp, "AHR999 fetched");
        Ok(reading)
    }
}

/// Rows are `[unix_secs, ahr999, price, ...]`; short or non-numeric rows are skipped.
fn latest_reading(rows: &[Vec<Value>]) -> Option<Ahr999Reading> {
    rows.iter()
        .filter(|row| row.len() >= 5)
        .filter_map(|row| {
            let secs = row[0].as_f64()?;
            let ahr999 = row[1].as_f64()?;
            let price = row[2].as_f64()?;
            let timestamp = DateTime::from_timestamp(secs as i64, 0)?;
            Some(Ahr999Reading {
                timestamp,
                price,
                ahr999,
            })
        })
        .max_by_key(|reading| reading.timestamp)
}
