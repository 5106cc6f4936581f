// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value types shared by the dispatcher, its stores, and the delivery channels.
//!
//! Messages are plain values: status changes consume the message and return the
//! updated copy, so a queued or archived message can never be mutated behind a
//! caller's back.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use crate::error::HeraldError;

/// Highest accepted [`PushOptions::priority`].
pub const MAX_PRIORITY: u8 = 10;

/// Highest accepted [`PushOptions::retry`].
pub const MAX_RETRY: u8 = 5;

/// Classification level of a notification.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MessageLevel {
    #[default]
    Normal,
    Emergency,
}

/// Delivery lifecycle of a message.
///
/// `Initialized -> Pending -> {Success | Failed}`; the last two are terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SendStatus {
    #[default]
    Initialized,
    Pending,
    Success,
    Failed,
}

impl SendStatus {
    /// Returns true for `Success` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SendStatus::Success | SendStatus::Failed)
    }
}

/// A notification with identity, classification, metadata, and lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `{sender_id}_{yymmdd_hhmmss}_{micros}`; generated when left empty.
    #[serde(default)]
    pub id: String,
    /// Identifies the task or component that produced the message.
    pub sender_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub level: MessageLevel,
    /// Open key/value metadata carried alongside the message.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Set once a delivery attempt succeeds.
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SendStatus,
}

impl Message {
    /// Creates a message stamped with the current time and a generated id.
    pub fn new(
        sender_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        level: MessageLevel,
    ) -> Self {
        Self::new_at(sender_id, title, content, level, Utc::now())
    }

    /// Creates a `Normal` level message.
    pub fn normal(
        sender_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(sender_id, title, content, MessageLevel::Normal)
    }

    /// Creates a message as if constructed at `at`.
    pub fn new_at(
        sender_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        level: MessageLevel,
        at: DateTime<Utc>,
    ) -> Self {
        let sender_id = sender_id.into();
        Self {
            id: generate_message_id(&sender_id, at),
            sender_id,
            title: title.into(),
            content: content.into(),
            level,
            metadata: BTreeMap::new(),
            created_at: at,
            sent_at: None,
            status: SendStatus::Initialized,
        }
    }

    /// Adds a metadata entry, replacing any previous value for `key`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Fills in a generated id if the caller left it empty.
    pub fn ensure_id(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = generate_message_id(&self.sender_id, Utc::now());
        }
        self
    }

    /// Marks the message as about to be queued or sent.
    pub fn pending(self) -> Self {
        self.transition(SendStatus::Pending, None)
    }

    /// Marks the message as delivered at `at`.
    pub fn delivered(self, at: DateTime<Utc>) -> Self {
        self.transition(SendStatus::Success, Some(at))
    }

    /// Marks the delivery attempt as failed.
    pub fn failed(self) -> Self {
        self.transition(SendStatus::Failed, None)
    }

    fn transition(mut self, next: SendStatus, sent_at: Option<DateTime<Utc>>) -> Self {
        if self.status.is_terminal() {
            warn!(
                message_id = %self.id,
                from = %self.status,
                to = %next,
                "ignoring status change on a finished message"
            );
            return self;
        }
        self.status = next;
        if sent_at.is_some() {
            self.sent_at = sent_at;
        }
        self
    }
}

/// Generates `{sender_id}_{yymmdd_hhmmss}_{micros}` using the local wall clock.
pub fn generate_message_id(sender_id: &str, at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Local);
    format!(
        "{}_{}_{:06}",
        sender_id,
        local.format("%y%m%d_%H%M%S"),
        local.timestamp_subsec_micros() % 1_000_000
    )
}

/// Delivery options: who receives the message, its priority, and a retry budget.
///
/// The retry budget is recorded in history but not acted on by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOptions {
    pub receivers: Vec<String>,
    pub priority: u8,
    pub retry: u8,
}

impl PushOptions {
    /// Options for the given receivers with priority 5 and no retries.
    pub fn to<I, S>(receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            receivers: receivers.into_iter().map(Into::into).collect(),
            priority: 5,
            retry: 0,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retry(mut self, retry: u8) -> Self {
        self.retry = retry;
        self
    }
}

/// Default option rules shared by every built-in pusher.
///
/// Receivers must be non-empty, priority within `0..=10`, retry within `0..=5`.
pub fn validate_options(options: &PushOptions) -> Result<(), HeraldError> {
    if options.receivers.is_empty() {
        return Err(HeraldError::Validation(
            "receiver list must not be empty".to_string(),
        ));
    }
    if options.priority > MAX_PRIORITY {
        return Err(HeraldError::Validation(format!(
            "priority must be between 0 and {MAX_PRIORITY}, got {}",
            options.priority
        )));
    }
    if options.retry > MAX_RETRY {
        return Err(HeraldError::Validation(format!(
            "retry must be between 0 and {MAX_RETRY}, got {}",
            options.retry
        )));
    }
    Ok(())
}

/// A message waiting in a delay file for the next batch flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayMessage {
    pub message: Message,
    pub options: PushOptions,
    pub created_at: DateTime<Utc>,
}

/// A message bound to a wall-clock minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub message: Message,
    pub options: PushOptions,
    /// Always truncated to the minute.
    pub scheduled_at: DateTime<Utc>,
}

/// Immutable audit entry written after every delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub pusher_name: String,
    pub title: String,
    pub content: String,
    pub message_id: String,
    pub level: MessageLevel,
    pub receivers: Vec<String>,
    pub priority: u8,
    pub retry: u8,
    /// Present only on failure records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl HistoryRecord {
    /// Snapshot of a successful delivery.
    pub fn success(message: &Message, pusher_name: &str, options: &PushOptions) -> Self {
        Self {
            timestamp: Utc::now(),
            sender_id: message.sender_id.clone(),
            pusher_name: pusher_name.to_string(),
            title: message.title.clone(),
            content: message.content.clone(),
            message_id: message.id.clone(),
            level: message.level,
            receivers: options.receivers.clone(),
            priority: options.priority,
            retry: options.retry,
            error_reason: None,
        }
    }

    /// Snapshot of a failed attempt with its reason.
    pub fn failure(
        message: &Message,
        pusher_name: &str,
        options: &PushOptions,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            error_reason: Some(reason.into()),
            ..Self::success(message, pusher_name, options)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_reason.is_some()
    }
}

/// Health status reported by pusher health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Pusher is fully operational.
    Healthy,
    /// Pusher is operational but experiencing issues.
    Degraded(String),
    /// Pusher is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}
