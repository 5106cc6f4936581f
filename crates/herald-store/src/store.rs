// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The working-directory store.
//!
//! Delayed and scheduled messages live in JSON-array files partitioned by
//! 4-hour [`Slot`]. Every read-modify-write of those files happens under one
//! store-wide lock, which serializes the background loops against each other
//! and against foreground calls.
//!
//! Delivery happens before the source file is rewritten, so a crash between
//! the two resends rather than loses a message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use herald_core::json_file::{parse_array, read_optional, remove_if_exists, write_array};
use herald_core::{DelayMessage, HeraldError, Message, PushOptions, Pusher, ScheduledMessage};
use herald_history::HistoryLog;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::delivery::deliver;
use crate::merge::merge_delayed;
use crate::slot::{QueueKind, Slot};

/// Result of a delayed-message flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No delayed entries existed; nothing was sent.
    Empty,
    /// `merged` entries went out as the digest `message_id`.
    Sent { merged: usize, message_id: String },
}

/// Result of one scheduled-message sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduledSweep {
    /// Due messages delivered.
    pub sent: usize,
    /// Due messages whose delivery failed.
    pub failed: usize,
    /// Entries left waiting in the files that were swept.
    pub remaining: usize,
}

impl ScheduledSweep {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// File-backed queues for delayed and scheduled messages.
pub struct WorkingStore {
    dir: PathBuf,
    pusher: Arc<dyn Pusher>,
    history: Arc<HistoryLog>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for WorkingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingStore")
            .field("dir", &self.dir)
            .field("pusher", &self.pusher.name())
            .finish()
    }
}

/// Truncates an instant to the start of its minute.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

impl WorkingStore {
    pub fn new(dir: impl Into<PathBuf>, pusher: Arc<dyn Pusher>, history: Arc<HistoryLog>) -> Self {
        Self {
            dir: dir.into(),
            pusher,
            history,
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name of the pusher used for queued deliveries.
    pub fn pusher_name(&self) -> &str {
        self.pusher.name()
    }

    /// Appends a delayed message to the current slot's file.
    pub async fn add_delay_message(
        &self,
        message: Message,
        options: PushOptions,
    ) -> Result<(), HeraldError> {
        self.add_delay_message_at(message, options, Utc::now()).await
    }

    /// Appends a delayed message as if enqueued at `now`.
    pub async fn add_delay_message_at(
        &self,
        message: Message,
        options: PushOptions,
        now: DateTime<Utc>,
    ) -> Result<(), HeraldError> {
        let path = self.path_for(Slot::local(now), QueueKind::Delay);
        let _guard = self.lock.lock().await;

        let mut entries: Vec<DelayMessage> = self.read_for_append(&path).await?;
        debug!(
            message_id = %message.id,
            file = %path.display(),
            queued = entries.len() + 1,
            "queueing delayed message"
        );
        entries.push(DelayMessage {
            message,
            options,
            created_at: now,
        });
        write_array(&path, &entries).await
    }

    /// Queues a message for `scheduled_at`, truncated to the minute.
    ///
    /// The entry goes into the slot file of the scheduled instant, which may
    /// be a future slot. Returns the truncated instant.
    pub async fn add_scheduled_message(
        &self,
        message: Message,
        options: PushOptions,
        scheduled_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, HeraldError> {
        let scheduled_at = truncate_to_minute(scheduled_at);
        let path = self.path_for(Slot::local(scheduled_at), QueueKind::Scheduled);
        let _guard = self.lock.lock().await;

        let mut entries: Vec<ScheduledMessage> = self.read_for_append(&path).await?;
        debug!(
            message_id = %message.id,
            scheduled_at = %scheduled_at,
            file = %path.display(),
            "queueing scheduled message"
        );
        entries.push(ScheduledMessage {
            message,
            options,
            scheduled_at,
        });
        write_array(&path, &entries).await?;
        Ok(scheduled_at)
    }

    /// Fires every scheduled message that is due now.
    pub async fn process_scheduled_messages(&self) -> Result<ScheduledSweep, HeraldError> {
        self.process_scheduled_messages_at(Utc::now()).await
    }

    /// Fires every scheduled message due at `now` (minute-truncated).
    ///
    /// Sweeps the current slot's file and any earlier scheduled files still
    /// on disk. Due entries are sent one by one; the file is then rewritten
    /// with the entries that are not yet due, in their original order. Earlier
    /// slot files left empty are deleted. If anything was due, pending delayed
    /// messages are flushed as well.
    pub async fn process_scheduled_messages_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ScheduledSweep, HeraldError> {
        let now = truncate_to_minute(now);
        let current = Slot::local(now);
        let _guard = self.lock.lock().await;

        let mut files = self.slot_files(QueueKind::Scheduled).await?;
        files.retain(|(slot, _)| *slot <= current);
        if !files.iter().any(|(slot, _)| *slot == current) {
            files.push((current, self.path_for(current, QueueKind::Scheduled)));
        }

        let mut sweep = ScheduledSweep::default();
        for (slot, path) in files {
            let Some(entries) = self.read_or_skip::<ScheduledMessage>(&path).await? else {
                continue;
            };

            let (due, waiting): (Vec<_>, Vec<_>) = entries
                .into_iter()
                .partition(|entry| truncate_to_minute(entry.scheduled_at) <= now);

            if due.is_empty() {
                if waiting.is_empty()
                    && slot < current
                    && let Err(e) = remove_if_exists(&path).await
                {
                    warn!(file = %path.display(), error = %e, "failed to remove empty scheduled file");
                }
                sweep.remaining += waiting.len();
                continue;
            }

            info!(
                due = due.len(),
                waiting = waiting.len(),
                file = %path.display(),
                "sending due scheduled messages"
            );
            for entry in due {
                let message = entry.message.pending();
                match deliver(
                    self.pusher.as_ref(),
                    &self.history,
                    message,
                    &entry.options,
                    "scheduled delivery failed",
                )
                .await
                {
                    Ok(_) => sweep.sent += 1,
                    Err(_) => sweep.failed += 1,
                }
            }

            sweep.remaining += waiting.len();
            let rewritten = if waiting.is_empty() && slot < current {
                remove_if_exists(&path).await
            } else {
                write_array(&path, &waiting).await
            };
            if let Err(e) = rewritten {
                warn!(file = %path.display(), error = %e, "failed to rewrite scheduled file, continuing sweep");
            }
        }

        if sweep.attempted() > 0
            && let Err(e) = self.flush_locked(Utc::now()).await
        {
            warn!(error = %e, "delayed flush after scheduled delivery failed");
        }

        Ok(sweep)
    }

    /// Sends every queued delayed message, across all slots, as one digest.
    ///
    /// With nothing queued this is a no-op. Otherwise the merged options are
    /// validated by the pusher and the source files are emptied whether or
    /// not the digest was delivered; a rejected or failed digest is recorded
    /// in history and returned as the error.
    pub async fn send_all_delay_messages(&self) -> Result<FlushOutcome, HeraldError> {
        let _guard = self.lock.lock().await;
        self.flush_locked(Utc::now()).await
    }

    async fn flush_locked(&self, now: DateTime<Utc>) -> Result<FlushOutcome, HeraldError> {
        let files = self.slot_files(QueueKind::Delay).await?;

        let mut entries: Vec<DelayMessage> = Vec::new();
        let mut drained: Vec<PathBuf> = Vec::new();
        let mut empty: Vec<PathBuf> = Vec::new();
        for (_, path) in files {
            match self.read_or_skip::<DelayMessage>(&path).await? {
                None => {}
                Some(found) if found.is_empty() => empty.push(path),
                Some(found) => {
                    entries.extend(found);
                    drained.push(path);
                }
            }
        }

        for path in &empty {
            remove_if_exists(path).await?;
        }

        if entries.is_empty() {
            debug!("no delayed messages to flush");
            return Ok(FlushOutcome::Empty);
        }

        let merged = entries.len();
        let (digest, options) = merge_delayed(&entries, now);
        info!(
            merged,
            files = drained.len(),
            receivers = options.receivers.len(),
            "flushing delayed messages"
        );
        let result = match self.pusher.validate(&options) {
            Ok(()) => {
                deliver(
                    self.pusher.as_ref(),
                    &self.history,
                    digest.pending(),
                    &options,
                    "delayed batch delivery failed",
                )
                .await
            }
            Err(e) => {
                self.record_rejected_digest(digest, &options, &e).await;
                Err(e)
            }
        };

        for path in &drained {
            write_array::<DelayMessage>(path, &[]).await?;
        }

        let sent = result?;
        Ok(FlushOutcome::Sent {
            merged,
            message_id: sent.id,
        })
    }

    async fn record_rejected_digest(&self, digest: Message, options: &PushOptions, err: &HeraldError) {
        let failed = digest.failed();
        warn!(message_id = %failed.id, error = %err, "delayed batch options rejected, dropping batch");
        let reason = format!("delayed batch rejected: {err}");
        if let Err(e) = self
            .history
            .record_failure(&failed, self.pusher.name(), options, &reason)
            .await
        {
            warn!(message_id = %failed.id, error = %e, "failed to record rejected batch");
        }
    }

    /// Number of delayed entries waiting across all slot files.
    pub async fn pending_delay_count(&self) -> Result<usize, HeraldError> {
        let _guard = self.lock.lock().await;
        let mut count = 0;
        for (_, path) in self.slot_files(QueueKind::Delay).await? {
            if let Some(entries) = self.read_or_skip::<DelayMessage>(&path).await? {
                count += entries.len();
            }
        }
        Ok(count)
    }

    /// Every scheduled entry still on disk, in slot then file order.
    pub async fn pending_scheduled(&self) -> Result<Vec<ScheduledMessage>, HeraldError> {
        let _guard = self.lock.lock().await;
        let mut pending = Vec::new();
        for (_, path) in self.slot_files(QueueKind::Scheduled).await? {
            if let Some(entries) = self.read_or_skip::<ScheduledMessage>(&path).await? {
                pending.extend(entries);
            }
        }
        Ok(pending)
    }

    fn path_for(&self, slot: Slot, kind: QueueKind) -> PathBuf {
        self.dir.join(slot.file_name(kind))
    }

    /// Queue files of `kind`, sorted by slot.
    async fn slot_files(&self, kind: QueueKind) -> Result<Vec<(Slot, PathBuf)>, HeraldError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HeraldError::persistence(
                    format!("list {}", self.dir.display()),
                    e,
                ));
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| HeraldError::persistence(format!("list {}", self.dir.display()), e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some((found, slot)) = Slot::parse_file_name(name)
                && found == kind
            {
                files.push((slot, entry.path()));
            }
        }
        files.sort_by_key(|(slot, _)| *slot);
        Ok(files)
    }

    /// Reads a queue file for a sweep. Unreadable or malformed files are
    /// logged and skipped (`None`) and left on disk untouched.
    async fn read_or_skip<T>(&self, path: &Path) -> Result<Option<Vec<T>>, HeraldError>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = match read_optional(path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(Some(Vec::new())),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable queue file");
                return Ok(None);
            }
        };
        match parse_array(&bytes) {
            Ok(entries) => Ok(Some(entries)),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping malformed queue file");
                Ok(None)
            }
        }
    }

    /// Reads a queue file before appending to it.
    ///
    /// A malformed file is moved aside to `<file>.corrupt-<unix-ts>` so the
    /// append can proceed without overwriting what was there.
    async fn read_for_append<T>(&self, path: &Path) -> Result<Vec<T>, HeraldError>
    where
        T: serde::de::DeserializeOwned,
    {
        let Some(bytes) = read_optional(path).await? else {
            return Ok(Vec::new());
        };
        match parse_array(&bytes) {
            Ok(entries) => Ok(entries),
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
                    "queue file is malformed, preserving it and starting a new one"
                );
                tokio::fs::rename(path, &aside).await.map_err(|e| {
                    HeraldError::persistence(format!("move aside {}", path.display()), e)
                })?;
                Ok(Vec::new())
            }
        }
    }
}
