// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pusher that writes messages to the tracing log.

use async_trait::async_trait;
use herald_core::{HeraldError, Message, Pusher};
use tracing::info;

/// Emits every message as an `info!` event and always succeeds.
#[derive(Debug, Default, Clone)]
pub struct LogPusher;

impl LogPusher {
    pub const NAME: &'static str = "log";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Pusher for LogPusher {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn push(&self, message: &Message) -> Result<(), HeraldError> {
        info!(
            message_id = %message.id,
            sender = %message.sender_id,
            level = %message.level,
            title = %message.title,
            content = %message.content,
            "notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{HealthStatus, PushOptions};

    #[tokio::test]
    async fn log_pusher_always_delivers() {
        let pusher = LogPusher::new();
        assert_eq!(pusher.name(), "log");
        pusher
            .push(&Message::normal("test", "title", "body"))
            .await
            .unwrap();
        assert_eq!(pusher.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn log_pusher_uses_default_option_rules() {
        let pusher = LogPusher::new();
        let bad = PushOptions::to(["u"]).with_priority(11);
        assert!(matches!(
            pusher.validate(&bad),
            Err(HeraldError::Validation(_))
        ));
    }
}
