// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-task cron loops and the run-result log.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use croner::Cron;
use herald_core::HeraldError;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Task;

/// Upper bound on a single task execution.
pub const TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of run results kept.
pub const MAX_RESULTS: usize = 100;

/// Outcome of one task execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRunResult {
    pub task_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

/// Parses a six-field (seconds-first) cron expression.
pub fn parse_schedule(expression: &str) -> Result<Cron, HeraldError> {
    let fields = expression.split_whitespace().count();
    if fields != 6 {
        return Err(HeraldError::Config(format!(
            "cron expression `{expression}` must have 6 fields (sec min hour dom month dow), found {fields}"
        )));
    }
    Cron::from_str(expression).map_err(|e| {
        HeraldError::Config(format!("invalid cron expression `{expression}`: {e}"))
    })
}

/// Runs `task` once under `timeout` and reports the outcome.
pub async fn run_task(task: &dyn Task, timeout: Duration) -> TaskRunResult {
    let started_at = Utc::now();
    let outcome = tokio::time::timeout(timeout, task.execute()).await;
    let finished_at = Utc::now();

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("timed out after {}s", timeout.as_secs())),
    };

    match &error {
        None => info!(
            task = task.name(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "task completed"
        ),
        Some(reason) => warn!(task = task.name(), error = %reason, "task failed"),
    }

    TaskRunResult {
        task_name: task.name().to_string(),
        started_at,
        finished_at,
        success: error.is_none(),
        error,
    }
}

struct Registration {
    task: Arc<dyn Task>,
    schedule: Cron,
    expression: String,
}

/// Runs registered tasks on their cron schedules.
pub struct TaskRunner {
    registrations: Vec<Registration>,
    results: Arc<Mutex<VecDeque<TaskRunResult>>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    timeout: Duration,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            results: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_RESULTS))),
            cancel: CancellationToken::new(),
            handles: Vec::new(),
            timeout: TASK_TIMEOUT,
        }
    }

    /// Overrides the per-execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registers `task` to run on `expression`.
    ///
    /// Invalid expressions and duplicate task names are `Config` errors.
    pub fn register(&mut self, task: Arc<dyn Task>, expression: &str) -> Result<(), HeraldError> {
        if self
            .registrations
            .iter()
            .any(|r| r.task.name() == task.name())
        {
            return Err(HeraldError::Config(format!(
                "task `{}` is already registered",
                task.name()
            )));
        }
        let schedule = parse_schedule(expression)?;
        debug!(task = task.name(), schedule = expression, "task registered");
        self.registrations.push(Registration {
            task,
            schedule,
            expression: expression.to_string(),
        });
        Ok(())
    }

    /// Registered task names with their cron expressions.
    pub fn tasks(&self) -> Vec<(String, String)> {
        self.registrations
            .iter()
            .map(|r| (r.task.name().to_string(), r.expression.clone()))
            .collect()
    }

    /// Spawns one loop per registered task. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            return;
        }
        for registration in &self.registrations {
            let task = registration.task.clone();
            let schedule = registration.schedule.clone();
            let results = self.results.clone();
            let cancel = self.cancel.clone();
            let timeout = self.timeout;

            self.handles.push(tokio::spawn(async move {
                loop {
                    let now = Local::now();
                    let next = match schedule.find_next_occurrence(&now, false) {
                        Ok(next) => next,
                        Err(e) => {
                            error!(task = task.name(), error = %e, "no next occurrence, task loop exiting");
                            break;
                        }
                    };
                    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                    debug!(task = task.name(), next = %next, "task sleeping until next run");

                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {
                            let result = run_task(task.as_ref(), timeout).await;
                            push_result(&results, result).await;
                        }
                        _ = cancel.cancelled() => {
                            info!(task = task.name(), "task loop shutting down");
                            break;
                        }
                    }
                }
            }));
        }
        info!(tasks = self.handles.len(), "task runner started");
    }

    /// Most recent run results, oldest first.
    pub async fn recent_results(&self) -> Vec<TaskRunResult> {
        self.results.lock().await.iter().cloned().collect()
    }

    /// Cancels every task loop and waits for them to exit.
    ///
    /// A task that is mid-execution finishes first (bounded by the timeout).
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "task loop terminated abnormally");
            }
        }
        info!("task runner stopped");
    }
}

async fn push_result(results: &Mutex<VecDeque<TaskRunResult>>, result: TaskRunResult) {
    let mut results = results.lock().await;
    if results.len() == MAX_RESULTS {
        results.pop_front();
    }
    results.push_back(result);
}
