// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::HeraldConfig;

/// Validate a deserialized configuration, collecting every error found.
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let push = &config.push;
    if push.pusher.trim().is_empty() {
        fail("push.pusher must not be empty".to_string());
    }
    if push.working_dir.trim().is_empty() {
        fail("push.working_dir must not be empty".to_string());
    }
    if push.history_dir.trim().is_empty() {
        fail("push.history_dir must not be empty".to_string());
    }
    if push.flush_interval_secs == 0 {
        fail("push.flush_interval_secs must be greater than 0".to_string());
    }
    if push.scheduled_tick_secs == 0 {
        fail("push.scheduled_tick_secs must be greater than 0".to_string());
    }
    if push.history_keep_months == 0 {
        fail("push.history_keep_months must be at least 1".to_string());
    }

    if push.pusher == "serverchan"
        && config
            .serverchan
            .send_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
    {
        fail("serverchan.send_key is required when push.pusher = \"serverchan\"".to_string());
    }

    let mut seen_names = HashSet::new();
    for (i, task) in config.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            fail(format!("tasks[{i}].name must not be empty"));
        } else if !seen_names.insert(task.name.as_str()) {
            fail(format!("duplicate task name `{}` in [[tasks]] array", task.name));
        }

        if task.schedule.trim().is_empty() {
            fail(format!("tasks[{i}].schedule must not be empty"));
        }

        match (&task.auto_buy, &task.notify) {
            (Some(_), Some(_)) => fail(format!(
                "task `{}` must define exactly one of [tasks.auto_buy] or [tasks.notify], found both",
                task.name
            )),
            (None, None) => fail(format!(
                "task `{}` must define one of [tasks.auto_buy] or [tasks.notify]",
                task.name
            )),
            (Some(auto_buy), None) => match auto_buy.base_amount {
                None => fail(format!("task `{}`: auto_buy.base_amount is required", task.name)),
                Some(amount) if amount <= 0.0 => fail(format!(
                    "task `{}`: auto_buy.base_amount must be positive, got {amount}",
                    task.name
                )),
                Some(_) => {}
            },
            (None, Some(notify)) => {
                if notify.title.trim().is_empty() {
                    fail(format!("task `{}`: notify.title must not be empty", task.name));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
