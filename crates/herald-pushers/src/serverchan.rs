// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ServerChan (WeChat) webhook pusher.
//!
//! Posts `{title, desp}` to `<endpoint>/<send_key>.send`. The API answers with
//! `{"code": 0, ...}` on success; any other code is a delivery failure even
//! when the HTTP status is 200.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use herald_core::{HealthStatus, HeraldError, Message, MessageLevel, Pusher};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    title: &'a str,
    desp: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Delivers messages through a personal ServerChan send key.
#[derive(Debug, Clone)]
pub struct ServerChanPusher {
    client: reqwest::Client,
    send_key: String,
    endpoint: String,
}

impl ServerChanPusher {
    pub const NAME: &'static str = "serverchan";

    /// Creates a pusher for `send_key`, posting to `endpoint`.
    pub fn new(send_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, HeraldError> {
        let send_key = send_key.into();
        if send_key.trim().is_empty() {
            return Err(HeraldError::Config(
                "serverchan send key must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| HeraldError::Delivery {
                pusher: Self::NAME.to_string(),
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            send_key,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn send_url(&self) -> String {
        format!("{}/{}.send", self.endpoint, self.send_key)
    }

    /// Renders the message body shown in the WeChat card.
    fn render_body(message: &Message) -> String {
        let level = match message.level {
            MessageLevel::Emergency => "EMERGENCY",
            MessageLevel::Normal => "normal",
        };

        let mut body = String::new();
        let _ = writeln!(body, "[{level}]");
        let _ = writeln!(body, "time: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(body, "from: {}\n", message.sender_id);
        let _ = writeln!(body, "id: {}\n", message.id);
        let _ = writeln!(body, "{}\n", message.content);

        if !message.metadata.is_empty() {
            body.push_str("\n---\n");
            for (key, value) in &message.metadata {
                let _ = writeln!(body, "{key}: {value}");
            }
        }
        body
    }
}

#[async_trait]
impl Pusher for ServerChanPusher {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn push(&self, message: &Message) -> Result<(), HeraldError> {
        let desp = Self::render_body(message);
        let request = SendRequest {
            title: &message.title,
            desp: &desp,
        };

        let response = self
            .client
            .post(self.send_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| HeraldError::Delivery {
                pusher: Self::NAME.to_string(),
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, message_id = %message.id, "serverchan response received");

        if !status.is_success() {
            return Err(HeraldError::delivery(
                Self::NAME,
                format!("API returned {status}: {body}"),
            ));
        }

        match serde_json::from_str::<SendResponse>(&body) {
            Ok(resp) if resp.code == 0 => Ok(()),
            Ok(resp) => Err(HeraldError::delivery(
                Self::NAME,
                format!("API rejected message (code {}): {}", resp.code, resp.message),
            )),
            Err(e) => Err(HeraldError::Delivery {
                pusher: Self::NAME.to_string(),
                message: format!("unreadable API response: {body}"),
                source: Some(Box::new(e)),
            }),
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        if self.send_key.trim().is_empty() {
            return Ok(HealthStatus::Unhealthy("no send key configured".to_string()));
        }
        Ok(HealthStatus::Healthy)
    }
}
