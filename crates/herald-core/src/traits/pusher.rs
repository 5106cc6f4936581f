// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delivery channel capability.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{HealthStatus, Message, PushOptions, validate_options};

/// A concrete delivery mechanism (log sink, chat webhook, ...).
///
/// The dispatcher holds exactly one active pusher behind an `Arc<dyn Pusher>`
/// and calls it from the immediate path, the batch flush, and the scheduled
/// sweep, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait Pusher: Send + Sync + 'static {
    /// Registry name of this pusher, also written into history records.
    fn name(&self) -> &str;

    /// Delivers a single message. Options are validated before this is called.
    async fn push(&self, message: &Message) -> Result<(), HeraldError>;

    /// Checks delivery options against this pusher's constraints.
    fn validate(&self, options: &PushOptions) -> Result<(), HeraldError> {
        validate_options(options)
    }

    /// Performs a health check and returns the pusher's current status.
    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}
