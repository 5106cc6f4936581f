// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock pusher for deterministic testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::{HealthStatus, HeraldError, Message, Pusher};

/// A pusher that records every delivered message.
///
/// Clones share state, so a test can keep one handle while the dispatcher
/// owns another.
#[derive(Clone)]
pub struct MockPusher {
    name: String,
    sent: Arc<Mutex<Vec<Message>>>,
    attempts: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockPusher {
    /// Create a mock named `mock` that accepts every message.
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock whose every push fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Arc::new(Mutex::new(Some(reason.into()))),
            ..Self::new()
        }
    }

    /// Switch failure mode on (`Some(reason)`) or off (`None`).
    pub async fn set_failure(&self, reason: Option<&str>) {
        *self.failure.lock().await = reason.map(str::to_string);
    }

    /// Messages accepted so far, in delivery order.
    pub async fn sent_messages(&self) -> Vec<Message> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Push calls made, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockPusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Pusher for MockPusher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, message: &Message) -> Result<(), HeraldError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.failure.lock().await.clone() {
            return Err(HeraldError::delivery(&self.name, reason));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        match self.failure.lock().await.as_ref() {
            Some(reason) => Ok(HealthStatus::Degraded(reason.clone())),
            None => Ok(HealthStatus::Healthy),
        }
    }
}
