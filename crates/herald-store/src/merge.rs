// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding queued delayed messages into a single digest.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use herald_core::{DelayMessage, Message, MessageLevel, PushOptions};

/// Metadata key holding the number of merged entries.
pub const MERGED_COUNT_KEY: &str = "merged_count";
/// Metadata key holding the RFC 3339 merge instant.
pub const MERGE_TIME_KEY: &str = "merge_time";

/// Merges delayed entries into one message and one set of options.
///
/// Entries are ordered by creation time (stable for ties). The digest lists
/// each entry as `[title] content`, one per line, under the title
/// `"<N> delayed messages"`. Sender ids and receivers are deduplicated and
/// sorted; priority and retry take the maximum.
pub fn merge_delayed(entries: &[DelayMessage], now: DateTime<Utc>) -> (Message, PushOptions) {
    let mut ordered: Vec<&DelayMessage> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.created_at);

    let senders: BTreeSet<&str> = ordered
        .iter()
        .map(|entry| entry.message.sender_id.as_str())
        .collect();
    let content = ordered
        .iter()
        .map(|entry| format!("[{}] {}", entry.message.title, entry.message.content))
        .collect::<Vec<_>>()
        .join("\n");

    let message = Message::new_at(
        senders.into_iter().collect::<Vec<_>>().join(","),
        format!("{} delayed messages", ordered.len()),
        content,
        MessageLevel::Normal,
        now,
    )
    .with_metadata(MERGED_COUNT_KEY, ordered.len())
    .with_metadata(MERGE_TIME_KEY, now.to_rfc3339());

    let receivers: BTreeSet<&str> = ordered
        .iter()
        .flat_map(|entry| entry.options.receivers.iter().map(String::as_str))
        .collect();
    let options = PushOptions {
        receivers: receivers.into_iter().map(str::to_string).collect(),
        priority: ordered
            .iter()
            .map(|entry| entry.options.priority)
            .max()
            .unwrap_or_default(),
        retry: ordered
            .iter()
            .map(|entry| entry.options.retry)
            .max()
            .unwrap_or_default(),
    };

    (message, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(sender: &str, title: &str, receivers: &[&str], priority: u8, retry: u8, minute: i64) -> DelayMessage {
        let base = Utc::now() - Duration::hours(1);
        let created_at = base + Duration::minutes(minute);
        DelayMessage {
            message: Message::new_at(sender, title, format!("{title} body"), MessageLevel::Emergency, created_at),
            options: PushOptions::to(receivers.iter().copied())
                .with_priority(priority)
                .with_retry(retry),
            created_at,
        }
    }

    #[test]
    fn merge_deduplicates_senders_and_takes_max_priority() {
        let entries = vec![
            entry("A", "one", &["u1"], 2, 0, 0),
            entry("B", "two", &["u2"], 7, 3, 1),
            entry("A", "three", &["u1"], 4, 1, 2),
        ];
        let (message, options) = merge_delayed(&entries, Utc::now());

        assert_eq!(message.sender_id, "A,B");
        assert_eq!(message.title, "3 delayed messages");
        assert_eq!(message.level, MessageLevel::Normal);
        assert_eq!(options.priority, 7);
        assert_eq!(options.retry, 3);
        assert_eq!(options.receivers, vec!["u1", "u2"]);
        assert_eq!(message.metadata[MERGED_COUNT_KEY], 3);
        assert!(message.metadata.contains_key(MERGE_TIME_KEY));
    }

    #[test]
    fn merged_content_follows_creation_order() {
        let entries = vec![
            entry("svc", "late", &["u"], 1, 0, 30),
            entry("svc", "early", &["u"], 1, 0, 5),
            entry("svc", "middle", &["u"], 1, 0, 10),
        ];
        let (message, _) = merge_delayed(&entries, Utc::now());
        assert_eq!(
            message.content,
            "[early] early body\n[middle] middle body\n[late] late body"
        );
    }

    #[test]
    fn merged_message_gets_fresh_identity() {
        let now = Utc::now();
        let entries = vec![entry("svc", "only", &["u"], 1, 0, 0)];
        let (message, _) = merge_delayed(&entries, now);
        assert!(message.id.starts_with("svc_"));
        assert_eq!(message.created_at, now);
        assert_eq!(message.title, "1 delayed messages");
    }
}
