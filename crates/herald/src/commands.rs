// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands.

use herald_config::HeraldConfig;
use herald_core::{HeraldError, HistoryRecord, Message, PushOptions};
use herald_history::HistoryLog;
use herald_store::FlushOutcome;

use crate::serve::start_controller;

/// `herald send`: pushes one message immediately.
pub async fn run_send(
    config: &HeraldConfig,
    sender: &str,
    title: &str,
    content: &str,
    receivers: Vec<String>,
) -> Result<(), HeraldError> {
    let controller = start_controller(config).await?;
    let result = controller
        .push_now(Message::normal(sender, title, content), PushOptions::to(receivers))
        .await;
    controller.stop().await;

    let sent = result?;
    println!("sent {} via {}", sent.id, config.push.pusher);
    Ok(())
}

/// `herald flush`: sends the delayed queue as one digest.
pub async fn run_flush(config: &HeraldConfig) -> Result<(), HeraldError> {
    let controller = start_controller(config).await?;
    let result = controller.flush_queue().await;
    controller.stop().await;

    match result? {
        FlushOutcome::Empty => println!("no delayed messages"),
        FlushOutcome::Sent { merged, message_id } => {
            println!("flushed {merged} delayed messages as {message_id}")
        }
    }
    Ok(())
}

/// `herald history`: prints one month of records.
pub async fn run_history(
    config: &HeraldConfig,
    month: &str,
    failed: bool,
    json: bool,
) -> Result<(), HeraldError> {
    if month.len() != 6 || !month.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HeraldError::Validation(format!(
            "month must be YYYYMM, got `{month}`"
        )));
    }

    let history = HistoryLog::new(&config.push.history_dir);
    let records = if failed {
        history.failed_records(month).await?
    } else {
        history.success_records(month).await?
    };

    if json {
        let out = serde_json::to_string_pretty(&records)
            .map_err(|e| HeraldError::Internal(format!("failed to render records: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    if records.is_empty() {
        println!("no records for {month}");
    }
    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

/// `herald months`: lists months with history.
pub async fn run_months(config: &HeraldConfig) -> Result<(), HeraldError> {
    let months = HistoryLog::new(&config.push.history_dir)
        .available_months()
        .await?;
    for month in months {
        println!("{month}");
    }
    Ok(())
}

/// `herald prune`: removes history older than `keep` months (config default otherwise).
pub async fn run_prune(config: &HeraldConfig, keep: Option<u32>) -> Result<(), HeraldError> {
    let keep = keep.unwrap_or(config.push.history_keep_months);
    if keep == 0 {
        return Err(HeraldError::Validation(
            "--keep must be at least 1".to_string(),
        ));
    }
    let removed = HistoryLog::new(&config.push.history_dir)
        .cleanup_old_records(keep)
        .await?;
    println!("removed {removed} history files");
    Ok(())
}

fn format_record(record: &HistoryRecord) -> String {
    let mut line = format!(
        "{}  {:<10} {:<9} {}  [{}]",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.pusher_name,
        record.level,
        record.title,
        record.receivers.join(","),
    );
    if let Some(reason) = &record.error_reason {
        line.push_str("  error: ");
        line.push_str(reason);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::MessageLevel;

    fn config_in(dir: &std::path::Path) -> HeraldConfig {
        let mut config = HeraldConfig::default();
        config.push.working_dir = dir.join("working").display().to_string();
        config.push.history_dir = dir.join("history").display().to_string();
        config
    }

    #[tokio::test]
    async fn send_records_success_history() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        run_send(&config, "cli", "hello", "world", vec!["me".to_string()])
            .await
            .unwrap();

        let history = HistoryLog::new(&config.push.history_dir);
        let months = history.available_months().await.unwrap();
        assert_eq!(months.len(), 1);
        let records = history.success_records(&months[0]).await.unwrap();
        assert_eq!(records[0].title, "hello");
        assert_eq!(records[0].pusher_name, "log");
    }

    #[tokio::test]
    async fn flush_on_empty_queue_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        run_flush(&config_in(tmp.path())).await.unwrap();
    }

    #[tokio::test]
    async fn history_rejects_malformed_month() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run_history(&config_in(tmp.path()), "2024-01", false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Validation(_)));
    }

    #[tokio::test]
    async fn prune_rejects_zero() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run_prune(&config_in(tmp.path()), Some(0)).await.is_err());
    }

    #[test]
    fn failure_line_includes_reason() {
        let message = Message::new("a", "down", "c", MessageLevel::Emergency);
        let record = HistoryRecord::failure(&message, "log", &PushOptions::to(["x", "y"]), "timeout");
        let line = format_record(&record);
        assert!(line.contains("emergency"));
        assert!(line.contains("[x,y]"));
        assert!(line.ends_with("error: timeout"));
    }
}
