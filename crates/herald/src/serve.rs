// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve` command implementation.
//!
//! Builds the pusher registry from config, activates the configured pusher,
//! prunes old history, schedules the enabled tasks, and runs until a shutdown
//! signal arrives.

use std::sync::Arc;

use herald_config::HeraldConfig;
use herald_core::HeraldError;
use herald_cron::TaskRunner;
use herald_dispatch::{PushController, PushSettings};
use herald_history::HistoryLog;
use herald_pushers::PusherRegistry;
use tracing::{info, warn};

use crate::shutdown;

/// Creates the controller for `config` with its configured pusher active.
pub(crate) async fn start_controller(config: &HeraldConfig) -> Result<PushController, HeraldError> {
    let registry = PusherRegistry::with_builtins(config)?;
    info!(pushers = ?registry.list(), "pusher registry initialized");

    let controller = PushController::new(
        PushSettings::from(&config.push),
        HistoryLog::new(&config.push.history_dir),
    );
    controller.initialize(&registry, &config.push.pusher).await?;
    Ok(controller)
}

/// Runs the `herald serve` command.
pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    info!("starting herald serve");

    let controller = Arc::new(start_controller(&config).await?);

    match controller
        .history()
        .cleanup_old_records(config.push.history_keep_months)
        .await
    {
        Ok(removed) if removed > 0 => info!(removed, "pruned old history files"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "history pruning failed (non-fatal)"),
    }

    let mut runner = TaskRunner::new();
    for task_config in config.tasks.iter().filter(|t| t.enabled) {
        let task = herald_tasks::build_task(task_config, controller.clone())?;
        runner.register(task, &task_config.schedule)?;
    }
    let skipped = config.tasks.iter().filter(|t| !t.enabled).count();
    if skipped > 0 {
        info!(skipped, "disabled tasks not scheduled");
    }
    runner.start();

    let cancel = shutdown::install_signal_handler();
    info!(
        pusher = %config.push.pusher,
        tasks = runner.tasks().len(),
        "herald running"
    );
    cancel.cancelled().await;

    runner.stop().await;
    controller.stop().await;
    info!("herald stopped");
    Ok(())
}

/// Installs the global tracing subscriber.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("herald={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
