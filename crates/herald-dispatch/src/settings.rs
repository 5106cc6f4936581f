// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings for the dispatch controller.

use std::path::PathBuf;
use std::time::Duration;

use herald_config::PushConfig;

/// Where queues live and how often the background loops run.
#[derive(Debug, Clone)]
pub struct PushSettings {
    pub working_dir: PathBuf,
    pub flush_interval: Duration,
    pub scheduled_tick: Duration,
    /// Capacity bound for an in-memory queue. The file-backed store does not
    /// use it.
    pub queue_size: usize,
}

impl PushSettings {
    /// Settings for `working_dir` with a 4 h flush and a 1 min sweep.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            flush_interval: Duration::from_secs(4 * 60 * 60),
            scheduled_tick: Duration::from_secs(60),
            queue_size: 1000,
        }
    }

    pub fn with_intervals(mut self, flush_interval: Duration, scheduled_tick: Duration) -> Self {
        self.flush_interval = flush_interval;
        self.scheduled_tick = scheduled_tick;
        self
    }
}

impl From<&PushConfig> for PushSettings {
    fn from(config: &PushConfig) -> Self {
        Self {
            working_dir: PathBuf::from(&config.working_dir),
            flush_interval: Duration::from_secs(config.flush_interval_secs),
            scheduled_tick: Duration::from_secs(config.scheduled_tick_secs),
            queue_size: config.queue_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_push_config() {
        let config = PushConfig {
            working_dir: "/tmp/q".to_string(),
            flush_interval_secs: 90,
            scheduled_tick_secs: 15,
            ..PushConfig::default()
        };
        let settings = PushSettings::from(&config);
        assert_eq!(settings.working_dir, PathBuf::from("/tmp/q"));
        assert_eq!(settings.flush_interval, Duration::from_secs(90));
        assert_eq!(settings.scheduled_tick, Duration::from_secs(15));
        assert_eq!(settings.queue_size, 1000);
    }

    #[test]
    fn default_intervals_match_slot_cadence() {
        let settings = PushSettings::new("/tmp/q");
        assert_eq!(settings.flush_interval, Duration::from_secs(14_400));
        assert_eq!(settings.scheduled_tick, Duration::from_secs(60));
    }
}
