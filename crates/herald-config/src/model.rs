// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Herald configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// Process-level settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Dispatcher, queue, and history settings.
    #[serde(default)]
    pub push: PushConfig,

    /// ServerChan (WeChat webhook) channel settings.
    #[serde(default)]
    pub serverchan: ServerChanConfig,

    /// Scheduled tasks.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Dispatcher settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Registry name of the active pusher.
    #[serde(default = "default_pusher")]
    pub pusher: String,

    /// Queue capacity bound. Only meaningful for an in-memory queue; the
    /// file-backed store ignores it.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Seconds between delayed-message flushes.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Seconds between scheduled-message sweeps.
    #[serde(default = "default_scheduled_tick_secs")]
    pub scheduled_tick_secs: u64,

    /// Directory holding `delay_*.json` and `scheduled_*.json` slot files.
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Directory holding monthly history files.
    #[serde(default = "default_history_dir")]
    pub history_dir: String,

    /// Months of history kept by `prune` and at startup.
    #[serde(default = "default_history_keep_months")]
    pub history_keep_months: u32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            pusher: default_pusher(),
            queue_size: default_queue_size(),
            flush_interval_secs: default_flush_interval_secs(),
            scheduled_tick_secs: default_scheduled_tick_secs(),
            working_dir: default_working_dir(),
            history_dir: default_history_dir(),
            history_keep_months: default_history_keep_months(),
        }
    }
}

fn default_pusher() -> String {
    "log".to_string()
}

fn default_queue_size() -> usize {
    1000
}

fn default_flush_interval_secs() -> u64 {
    4 * 60 * 60
}

fn default_scheduled_tick_secs() -> u64 {
    60
}

fn data_subdir(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("herald").join(name))
        .unwrap_or_else(|| PathBuf::from("herald").join(name))
        .to_string_lossy()
        .into_owned()
}

fn default_working_dir() -> String {
    data_subdir("working")
}

fn default_history_dir() -> String {
    data_subdir("history")
}

fn default_history_keep_months() -> u32 {
    12
}

/// ServerChan channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerChanConfig {
    /// Personal send key. Required when `push.pusher = "serverchan"`.
    #[serde(default)]
    pub send_key: Option<String>,

    /// API base URL.
    #[serde(default = "default_serverchan_endpoint")]
    pub endpoint: String,
}

impl Default for ServerChanConfig {
    fn default() -> Self {
        Self {
            send_key: None,
            endpoint: default_serverchan_endpoint(),
        }
    }
}

fn default_serverchan_endpoint() -> String {
    "https://sctapi.ftqq.com".to_string()
}

/// One `[[tasks]]` entry.
///
/// Exactly one of `auto_buy` / `notify` must be present.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Unique task name, also used as the message sender id.
    pub name: String,

    /// Six-field cron expression (with seconds).
    pub schedule: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub auto_buy: Option<AutoBuyTaskConfig>,

    #[serde(default)]
    pub notify: Option<NotifyTaskConfig>,
}

fn default_true() -> bool {
    true
}

/// AHR999 dollar-cost-averaging task.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoBuyTaskConfig {
    /// Base investment amount per run, in quote currency.
    #[serde(default)]
    pub base_amount: Option<f64>,

    /// AHR999 range to multiplier, e.g. `"<0.45" = 2.0`, `"0.45-1.2" = 1.0`.
    #[serde(default)]
    pub multipliers: BTreeMap<String, f64>,

    /// Tag notifications as debug runs.
    #[serde(default)]
    pub debug: bool,

    /// Receivers for the run summary.
    #[serde(default = "default_receivers")]
    pub receivers: Vec<String>,
}

/// Generic notification task.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyTaskConfig {
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default = "default_receivers")]
    pub receivers: Vec<String>,

    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default)]
    pub retry: u8,

    #[serde(default)]
    pub mode: NotifyMode,
}

/// Delivery path used by a notify task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Push immediately.
    #[default]
    Now,
    /// Queue for the next batch flush.
    Delayed,
}

fn default_receivers() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_priority() -> u8 {
    5
}
