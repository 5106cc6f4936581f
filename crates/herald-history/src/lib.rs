// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery history log.
//!
//! Every delivery attempt is appended to a monthly JSON file:
//! `success_send_YYYYMM.json` or `failed_send_YYYYMM.json`. Months are taken
//! from the record timestamp in local time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Months, Utc};
use herald_core::json_file::{parse_array, read_optional, remove_if_exists, write_array};
use herald_core::{HeraldError, HistoryRecord, Message, PushOptions};
use strum::{Display, EnumString};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Which monthly file a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Success,
    Failed,
}

impl RecordKind {
    fn file_prefix(self) -> &'static str {
        match self {
            RecordKind::Success => "success_send_",
            RecordKind::Failed => "failed_send_",
        }
    }

    /// File name for `month` (`YYYYMM`).
    pub fn file_name(self, month: &str) -> String {
        format!("{}{month}.json", self.file_prefix())
    }
}

/// `YYYYMM` of an instant in local time.
pub fn month_of(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y%m").to_string()
}

/// Extracts `YYYYMM` from a history file name, if it is one.
fn parse_month(file_name: &str) -> Option<&str> {
    let rest = file_name
        .strip_prefix(RecordKind::Success.file_prefix())
        .or_else(|| file_name.strip_prefix(RecordKind::Failed.file_prefix()))?;
    let month = rest.strip_suffix(".json")?;
    (month.len() == 6 && month.bytes().all(|b| b.is_ascii_digit())).then_some(month)
}

/// Append-only, month-partitioned history of delivery attempts.
#[derive(Debug)]
pub struct HistoryLog {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl HistoryLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Records a successful delivery.
    pub async fn record_success(
        &self,
        message: &Message,
        pusher_name: &str,
        options: &PushOptions,
    ) -> Result<(), HeraldError> {
        self.append(HistoryRecord::success(message, pusher_name, options))
            .await
    }

    /// Records a failed attempt with its reason.
    pub async fn record_failure(
        &self,
        message: &Message,
        pusher_name: &str,
        options: &PushOptions,
        reason: &str,
    ) -> Result<(), HeraldError> {
        self.append(HistoryRecord::failure(message, pusher_name, options, reason))
            .await
    }

    /// Appends a prepared record to the file for its kind and month.
    ///
    /// A month file that no longer parses is moved aside to
    /// `<file>.corrupt-<unix-ts>` and a fresh list is started.
    pub async fn append(&self, record: HistoryRecord) -> Result<(), HeraldError> {
        let kind = if record.is_failure() {
            RecordKind::Failed
        } else {
            RecordKind::Success
        };
        let path = self.dir.join(kind.file_name(&month_of(record.timestamp)));

        let _guard = self.lock.write().await;

        let mut records: Vec<HistoryRecord> = match read_optional(&path).await? {
            None => Vec::new(),
            Some(bytes) => match parse_array(&bytes) {
                Ok(records) => records,
                Err(e) => {
                    let aside = PathBuf::from(format!(
                        "{}.corrupt-{}",
                        path.display(),
                        Utc::now().timestamp()
                    ));
                    warn!(
                        file = %path.display(),
                        moved_to = %aside.display(),
                        error = %e,
                        "history file is corrupt, preserving it and starting a new one"
                    );
                    tokio::fs::rename(&path, &aside).await.map_err(|e| {
                        HeraldError::persistence(format!("move aside {}", path.display()), e)
                    })?;
                    Vec::new()
                }
            },
        };

        debug!(
            kind = %kind,
            message_id = %record.message_id,
            file = %path.display(),
            "appending history record"
        );
        records.push(record);
        write_array(&path, &records).await
    }

    /// Successful deliveries recorded in `month` (`YYYYMM`).
    pub async fn success_records(&self, month: &str) -> Result<Vec<HistoryRecord>, HeraldError> {
        self.records(RecordKind::Success, month).await
    }

    /// Failed attempts recorded in `month` (`YYYYMM`).
    pub async fn failed_records(&self, month: &str) -> Result<Vec<HistoryRecord>, HeraldError> {
        self.records(RecordKind::Failed, month).await
    }

    /// Records of `kind` for `month`. A missing file is an empty month.
    pub async fn records(
        &self,
        kind: RecordKind,
        month: &str,
    ) -> Result<Vec<HistoryRecord>, HeraldError> {
        let path = self.dir.join(kind.file_name(month));
        let _guard = self.lock.read().await;
        match read_optional(&path).await? {
            None => Ok(Vec::new()),
            Some(bytes) => parse_array(&bytes)
                .map_err(|e| HeraldError::persistence(format!("parse {}", path.display()), e)),
        }
    }

    /// Number of records of `kind` in `month`.
    pub async fn count(&self, kind: RecordKind, month: &str) -> Result<usize, HeraldError> {
        Ok(self.records(kind, month).await?.len())
    }

    /// Months with at least one history file, sorted ascending.
    pub async fn available_months(&self) -> Result<Vec<String>, HeraldError> {
        let _guard = self.lock.read().await;
        let mut months: Vec<String> = self
            .history_files()
            .await?
            .into_iter()
            .map(|(_, month)| month)
            .collect();
        months.sort();
        months.dedup();
        Ok(months)
    }

    /// Deletes files older than `keep_months` before now. Returns files removed.
    pub async fn cleanup_old_records(&self, keep_months: u32) -> Result<usize, HeraldError> {
        self.cleanup_old_records_at(keep_months, Utc::now()).await
    }

    /// Deletes files whose month sorts before `now - keep_months`.
    pub async fn cleanup_old_records_at(
        &self,
        keep_months: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, HeraldError> {
        let local_now = now.with_timezone(&Local);
        let cutoff = local_now
            .checked_sub_months(Months::new(keep_months))
            .unwrap_or(local_now)
            .format("%Y%m")
            .to_string();

        let _guard = self.lock.write().await;
        let mut removed = 0;
        for (path, month) in self.history_files().await? {
            if month < cutoff {
                remove_if_exists(&path).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "pruned old history files");
        }
        Ok(removed)
    }

    /// `(path, month)` for every history file in the directory.
    async fn history_files(&self) -> Result<Vec<(PathBuf, String)>, HeraldError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HeraldError::persistence(
                    format!("list {}", self.dir.display()),
                    e,
                ));
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HeraldError::persistence(format!("list {}", self.dir.display()), e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(month) = parse_month(name) {
                files.push((entry.path(), month.to_string()));
            }
        }
        Ok(files)
    }
}
