// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One delivery attempt plus its history record.

use chrono::Utc;
use herald_core::{HeraldError, Message, PushOptions, Pusher};
use herald_history::HistoryLog;
use tracing::{debug, warn};

/// Pushes `message` and writes exactly one history record for the outcome.
///
/// Returns the message in its terminal state on success. A history write
/// failure after a successful push is logged and does not turn the delivery
/// into an error, so callers never resend an already delivered message.
/// Failure records carry `"<context>: <error>"` as the reason.
pub async fn deliver(
    pusher: &dyn Pusher,
    history: &HistoryLog,
    message: Message,
    options: &PushOptions,
    context: &str,
) -> Result<Message, HeraldError> {
    let pusher_name = pusher.name();
    match pusher.push(&message).await {
        Ok(()) => {
            let delivered = message.delivered(Utc::now());
            debug!(
                message_id = %delivered.id,
                pusher = pusher_name,
                context,
                "message delivered"
            );
            if let Err(e) = history.record_success(&delivered, pusher_name, options).await {
                warn!(message_id = %delivered.id, error = %e, "failed to record delivery history");
            }
            Ok(delivered)
        }
        Err(err) => {
            let failed = message.failed();
            warn!(
                message_id = %failed.id,
                pusher = pusher_name,
                context,
                error = %err,
                "message delivery failed"
            );
            let reason = format!("{context}: {err}");
            if let Err(e) = history
                .record_failure(&failed, pusher_name, options, &reason)
                .await
            {
                warn!(message_id = %failed.id, error = %e, "failed to record failure history");
            }
            Err(err)
        }
    }
}
