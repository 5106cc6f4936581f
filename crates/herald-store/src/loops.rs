// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background flush and scheduled-sweep loops.
//!
//! Each loop waits on its interval or the cancellation token. Work runs inside
//! the tick branch, so an in-flight flush or sweep always completes; the token
//! is only observed between ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{FlushOutcome, WorkingStore};

/// Handles for the two store loops.
#[derive(Debug)]
pub struct StoreLoops {
    delay: JoinHandle<()>,
    scheduled: JoinHandle<()>,
}

impl StoreLoops {
    /// Waits for both loops to exit. Call after cancelling their token.
    pub async fn join(self) {
        for (name, handle) in [("delay-flush", self.delay), ("scheduled-sweep", self.scheduled)] {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "store loop terminated abnormally");
            }
        }
    }
}

/// Spawns the delayed-flush loop (every `flush_interval`) and the scheduled
/// sweep loop (every `scheduled_tick`). Both stop when `cancel` fires.
pub fn start(
    store: Arc<WorkingStore>,
    flush_interval: Duration,
    scheduled_tick: Duration,
    cancel: CancellationToken,
) -> StoreLoops {
    let delay_store = store.clone();
    let delay_cancel = cancel.clone();
    let delay = tokio::spawn(async move {
        let mut interval = tokio::time::interval(flush_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = delay_cancel.cancelled() => {
                    info!("delayed flush loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match delay_store.send_all_delay_messages().await {
                        Ok(FlushOutcome::Sent { merged, message_id }) => {
                            info!(merged, message_id = %message_id, "periodic delayed flush sent");
                        }
                        Ok(FlushOutcome::Empty) => {
                            debug!("periodic delayed flush found nothing queued");
                        }
                        Err(e) => {
                            warn!(error = %e, "periodic delayed flush failed (non-fatal)");
                        }
                    }
                }
            }
        }
    });

    let scheduled = tokio::spawn(async move {
        let mut interval = tokio::time::interval(scheduled_tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("scheduled sweep loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match store.process_scheduled_messages().await {
                        Ok(sweep) if sweep.attempted() > 0 => {
                            info!(
                                sent = sweep.sent,
                                failed = sweep.failed,
                                remaining = sweep.remaining,
                                "scheduled sweep delivered due messages"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "scheduled sweep failed (non-fatal)");
                        }
                    }
                }
            }
        }
    });

    StoreLoops { delay, scheduled }
}
