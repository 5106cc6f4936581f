// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-message notification task.

use std::sync::Arc;

use async_trait::async_trait;
use herald_config::{NotifyMode, NotifyTaskConfig};
use herald_core::{HeraldError, Message, PushOptions};
use herald_cron::Task;
use herald_dispatch::PushController;
use tracing::info;

/// Sends its configured message on every run.
pub struct NotifyTask {
    name: String,
    config: NotifyTaskConfig,
    controller: Arc<PushController>,
}

impl NotifyTask {
    pub fn new(
        name: impl Into<String>,
        config: NotifyTaskConfig,
        controller: Arc<PushController>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            controller,
        }
    }

    fn options(&self) -> PushOptions {
        PushOptions::to(&self.config.receivers)
            .with_priority(self.config.priority)
            .with_retry(self.config.retry)
    }
}

#[async_trait]
impl Task for NotifyTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<(), HeraldError> {
        let message = Message::normal(&self.name, &self.config.title, &self.config.content);
        match self.config.mode {
            NotifyMode::Now => {
                let sent = self.controller.push_now(message, self.options()).await?;
                info!(task = %self.name, message_id = %sent.id, "notification sent");
            }
            NotifyMode::Delayed => {
                self.controller.enqueue(message, self.options()).await?;
                info!(task = %self.name, "notification queued for next flush");
            }
        }
        Ok(())
    }
}
