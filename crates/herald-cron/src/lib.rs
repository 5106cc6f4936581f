// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven task runner.
//!
//! Tasks implement [`Task`] and are registered against six-field cron
//! expressions (seconds first). Each task gets its own loop that sleeps until
//! the next occurrence, runs the task under a timeout, and records the
//! outcome in a bounded result log.

pub mod runner;

use async_trait::async_trait;
use herald_core::HeraldError;

pub use runner::{MAX_RESULTS, TASK_TIMEOUT, TaskRunResult, TaskRunner, parse_schedule, run_task};

/// A unit of scheduled work.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Unique task name, used in logs and run results.
    fn name(&self) -> &str;

    /// Runs the task once.
    async fn execute(&self) -> Result<(), HeraldError>;
}
