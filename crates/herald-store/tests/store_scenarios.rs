// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Working-store behavior against real files in a temp directory.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use herald_core::{
    DelayMessage, HeraldError, Message, MessageLevel, PushOptions, ScheduledMessage, SendStatus,
};
use herald_history::{HistoryLog, month_of};
use herald_store::{FlushOutcome, Slot, WorkingStore, start, truncate_to_minute};
use herald_test_utils::{MockPusher, TestDirs};
use tokio_util::sync::CancellationToken;

struct Fixture {
    dirs: TestDirs,
    pusher: MockPusher,
    history: Arc<HistoryLog>,
    store: Arc<WorkingStore>,
}

fn fixture_with(pusher: MockPusher) -> Fixture {
    let dirs = TestDirs::new().unwrap();
    let history = dirs.history_log();
    let store = Arc::new(WorkingStore::new(
        dirs.working(),
        Arc::new(pusher.clone()),
        history.clone(),
    ));
    Fixture {
        dirs,
        pusher,
        history,
        store,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockPusher::new())
}

/// A fixed local wall-clock instant.
fn local(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2025, 7, day, hour, minute, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

fn msg(sender: &str, title: &str) -> Message {
    Message::normal(sender, title, format!("{title} content")).pending()
}

fn this_month() -> String {
    month_of(Utc::now())
}

#[tokio::test]
async fn delayed_messages_survive_a_write_read_cycle() {
    let f = fixture();
    let now = local(3, 9, 15);
    let originals: Vec<Message> = (0..3)
        .map(|i| {
            Message::new("svc", format!("t{i}"), format!("c{i}"), MessageLevel::Emergency)
                .with_metadata("n", i)
                .pending()
        })
        .collect();

    for m in &originals {
        f.store
            .add_delay_message_at(m.clone(), PushOptions::to(["u"]).with_priority(4), now)
            .await
            .unwrap();
    }

    assert_eq!(f.store.pending_delay_count().await.unwrap(), 3);
    let raw = f.dirs.read_working(&Slot::local(now).delay_file_name()).unwrap();
    let stored: Vec<DelayMessage> = serde_json::from_str(&raw).unwrap();
    let messages: Vec<Message> = stored.iter().map(|d| d.message.clone()).collect();
    assert_eq!(messages, originals);
    assert!(stored.iter().all(|d| d.created_at == now && d.options.priority == 4));
}

#[tokio::test]
async fn flushing_nothing_sends_nothing() {
    let f = fixture();

    let outcome = f.store.send_all_delay_messages().await.unwrap();

    assert_eq!(outcome, FlushOutcome::Empty);
    assert_eq!(f.pusher.attempts(), 0);
    assert!(f.history.available_months().await.unwrap().is_empty());
}

#[tokio::test]
async fn flush_merges_across_slots_and_empties_every_file() {
    let f = fixture();
    let slots = [local(3, 1, 0), local(3, 5, 0), local(3, 9, 0)];
    let inputs: [(&[&str], u8); 3] = [(&["u1"], 1), (&["u2"], 2), (&["u1", "u3"], 3)];

    for (at, (receivers, priority)) in slots.iter().zip(inputs) {
        f.store
            .add_delay_message_at(
                msg("svc", "tick"),
                PushOptions::to(receivers.iter().copied()).with_priority(priority),
                *at,
            )
            .await
            .unwrap();
    }

    let outcome = f.store.send_all_delay_messages().await.unwrap();
    let FlushOutcome::Sent { merged, message_id } = outcome else {
        panic!("expected a sent digest, got {outcome:?}");
    };
    assert_eq!(merged, 3);

    let sent = f.pusher.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, message_id);
    assert_eq!(sent[0].title, "3 delayed messages");

    let records = f.history.success_records(&this_month()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].receivers, vec!["u1", "u2", "u3"]);
    assert_eq!(records[0].priority, 3);
    assert_eq!(records[0].message_id, message_id);

    for at in slots {
        let raw = f.dirs.read_working(&Slot::local(at).delay_file_name()).unwrap();
        let left: Vec<DelayMessage> = serde_json::from_str(&raw).unwrap();
        assert!(left.is_empty());
    }
    assert_eq!(f.store.pending_delay_count().await.unwrap(), 0);
}

#[tokio::test]
async fn second_flush_deletes_the_emptied_files() {
    let f = fixture();
    f.store
        .add_delay_message(msg("svc", "once"), PushOptions::to(["u"]))
        .await
        .unwrap();

    f.store.send_all_delay_messages().await.unwrap();
    assert_eq!(f.dirs.working_files().len(), 1);

    let outcome = f.store.send_all_delay_messages().await.unwrap();
    assert_eq!(outcome, FlushOutcome::Empty);
    assert!(f.dirs.working_files().is_empty());
    assert_eq!(f.pusher.attempts(), 1);
}

#[tokio::test]
async fn failed_digest_is_recorded_and_queue_still_cleared() {
    let f = fixture_with(MockPusher::failing("gateway down"));
    f.store
        .add_delay_message(msg("svc", "a"), PushOptions::to(["u"]))
        .await
        .unwrap();
    f.store
        .add_delay_message(msg("svc", "b"), PushOptions::to(["u"]))
        .await
        .unwrap();

    let err = f.store.send_all_delay_messages().await.unwrap_err();

    assert!(matches!(err, HeraldError::Delivery { .. }));
    assert_eq!(f.store.pending_delay_count().await.unwrap(), 0);
    let failed = f.history.failed_records(&this_month()).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(
        failed[0]
            .error_reason
            .as_deref()
            .unwrap()
            .contains("gateway down")
    );
}

#[tokio::test]
async fn malformed_delay_file_is_skipped_and_left_alone() {
    let f = fixture();
    f.store
        .add_delay_message(msg("svc", "good"), PushOptions::to(["u"]))
        .await
        .unwrap();
    let bad = "delay_20240101_00.json";
    std::fs::write(f.dirs.working().join(bad), "{ definitely not an array").unwrap();

    let outcome = f.store.send_all_delay_messages().await.unwrap();

    assert!(matches!(outcome, FlushOutcome::Sent { merged: 1, .. }));
    assert_eq!(
        f.dirs.read_working(bad).unwrap(),
        "{ definitely not an array"
    );
}

#[tokio::test]
async fn scheduled_message_fires_only_once_due() {
    let f = fixture();
    let t0 = local(3, 10, 31);
    let stored_at = f
        .store
        .add_scheduled_message(msg("svc", "ping"), PushOptions::to(["u"]), t0 + chrono::Duration::seconds(42))
        .await
        .unwrap();
    assert_eq!(stored_at, t0);

    let early = f.store.process_scheduled_messages_at(local(3, 10, 30)).await.unwrap();
    assert_eq!(early.attempted(), 0);
    assert_eq!(f.store.pending_scheduled().await.unwrap().len(), 1);

    let due = f.store.process_scheduled_messages_at(t0).await.unwrap();
    assert_eq!(due.sent, 1);
    assert!(f.store.pending_scheduled().await.unwrap().is_empty());

    let sent = f.pusher.sent_messages().await;
    assert_eq!(sent[0].title, "ping");
    assert_eq!(sent[0].status, SendStatus::Pending);
    assert_eq!(f.history.success_records(&this_month()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sweep_rewrites_file_with_waiting_entries_in_order() {
    let f = fixture();
    for (title, minute) in [("a", 31), ("b", 45), ("c", 32), ("d", 50)] {
        f.store
            .add_scheduled_message(msg("svc", title), PushOptions::to(["u"]), local(3, 10, minute))
            .await
            .unwrap();
    }

    let sweep = f.store.process_scheduled_messages_at(local(3, 10, 40)).await.unwrap();

    assert_eq!(sweep.sent, 2);
    assert_eq!(sweep.remaining, 2);
    let waiting: Vec<String> = f
        .store
        .pending_scheduled()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.message.title)
        .collect();
    assert_eq!(waiting, vec!["b", "d"]);
    let sent: Vec<String> = f.pusher.sent_messages().await.into_iter().map(|m| m.title).collect();
    assert_eq!(sent, vec!["a", "c"]);
}

#[tokio::test]
async fn message_from_a_passed_slot_still_fires() {
    let f = fixture();
    let missed = local(3, 2, 10);
    f.store
        .add_scheduled_message(msg("svc", "overnight"), PushOptions::to(["u"]), missed)
        .await
        .unwrap();

    let sweep = f.store.process_scheduled_messages_at(local(3, 10, 0)).await.unwrap();

    assert_eq!(sweep.sent, 1);
    assert!(
        !f.dirs
            .working_files()
            .contains(&Slot::local(missed).scheduled_file_name())
    );
}

#[tokio::test]
async fn future_slot_is_not_touched() {
    let f = fixture();
    let later = local(4, 18, 0);
    f.store
        .add_scheduled_message(msg("svc", "tomorrow"), PushOptions::to(["u"]), later)
        .await
        .unwrap();

    let sweep = f.store.process_scheduled_messages_at(local(3, 10, 0)).await.unwrap();

    assert_eq!(sweep.attempted(), 0);
    assert_eq!(f.store.pending_scheduled().await.unwrap().len(), 1);
}

#[tokio::test]
async fn scheduled_delivery_flushes_pending_delayed_messages() {
    let f = fixture();
    f.store
        .add_delay_message(msg("svc", "queued"), PushOptions::to(["u"]))
        .await
        .unwrap();
    f.store
        .add_scheduled_message(msg("svc", "now"), PushOptions::to(["u"]), Utc::now())
        .await
        .unwrap();

    let sweep = f.store.process_scheduled_messages_at(Utc::now()).await.unwrap();

    assert_eq!(sweep.sent, 1);
    let titles: Vec<String> = f.pusher.sent_messages().await.into_iter().map(|m| m.title).collect();
    assert_eq!(titles, vec!["now", "1 delayed messages"]);
    assert_eq!(f.store.pending_delay_count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_scheduled_send_is_recorded_and_removed() {
    let f = fixture_with(MockPusher::failing("rejected"));
    let at = local(3, 10, 0);
    f.store
        .add_scheduled_message(msg("svc", "doomed"), PushOptions::to(["u"]), at)
        .await
        .unwrap();

    let sweep = f.store.process_scheduled_messages_at(at).await.unwrap();

    assert_eq!(sweep.failed, 1);
    assert!(f.store.pending_scheduled().await.unwrap().is_empty());
    assert_eq!(f.history.failed_records(&this_month()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_enqueues_are_all_kept() {
    let f = fixture();
    let handles = (0..20).map(|i| {
        let store = f.store.clone();
        tokio::spawn(async move {
            store
                .add_delay_message(msg("svc", &format!("m{i}")), PushOptions::to(["u"]))
                .await
        })
    });
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(f.store.pending_delay_count().await.unwrap(), 20);
}

#[test]
fn truncation_drops_seconds_and_below() {
    let at = Utc.with_ymd_and_hms(2025, 7, 3, 10, 31, 59).unwrap() + chrono::Duration::milliseconds(999);
    assert_eq!(
        truncate_to_minute(at),
        Utc.with_ymd_and_hms(2025, 7, 3, 10, 31, 0).unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_loops_flush_and_stop_on_cancel() {
    let f = fixture();
    f.store
        .add_delay_message(msg("svc", "bg"), PushOptions::to(["u"]))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let loops = start(
        f.store.clone(),
        Duration::from_millis(50),
        Duration::from_millis(50),
        cancel.clone(),
    );

    let mut flushed = false;
    for _ in 0..40 {
        if f.pusher.sent_count().await > 0 {
            flushed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(flushed, "delayed flush loop never ran");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), loops.join())
        .await
        .expect("loops should exit after cancellation");
    assert_eq!(f.pusher.sent_count().await, 1);
}

#[tokio::test]
async fn digest_without_receivers_is_rejected_and_recorded() {
    let f = fixture();
    f.store
        .add_delay_message(msg("svc", "orphan"), PushOptions::to(Vec::<String>::new()))
        .await
        .unwrap();
    f.store
        .add_delay_message(msg("svc", "loud"), PushOptions::to(Vec::<String>::new()).with_priority(42))
        .await
        .unwrap();

    let err = f.store.send_all_delay_messages().await.unwrap_err();

    assert!(matches!(err, HeraldError::Validation(_)));
    assert_eq!(f.pusher.attempts(), 0);
    assert_eq!(f.store.pending_delay_count().await.unwrap(), 0);
    let failed = f.history.failed_records(&this_month()).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].receivers.is_empty());
    assert!(failed[0].error_reason.as_deref().unwrap().starts_with("delayed batch rejected"));
    assert!(f.history.success_records(&this_month()).await.unwrap().is_empty());
}

#[tokio::test]
async fn sweep_continues_past_a_file_it_cannot_rewrite() {
    let f = fixture();
    let now = local(3, 10, 31);
    let earlier_slot = Slot::local(local(3, 5, 0));
    let earlier = f.dirs.working().join(earlier_slot.scheduled_file_name());
    let entries = vec![
        ScheduledMessage {
            message: msg("svc", "overdue"),
            options: PushOptions::to(["u"]),
            scheduled_at: local(3, 5, 0),
        },
        ScheduledMessage {
            message: msg("svc", "later"),
            options: PushOptions::to(["u"]),
            scheduled_at: local(3, 11, 0),
        },
    ];
    std::fs::create_dir_all(f.dirs.working()).unwrap();
    std::fs::write(&earlier, serde_json::to_vec(&entries).unwrap()).unwrap();
    // A directory at the temp path makes the rewrite of the earlier file fail.
    std::fs::create_dir(earlier.with_extension("json.tmp")).unwrap();

    f.store
        .add_scheduled_message(msg("svc", "current"), PushOptions::to(["u"]), local(3, 10, 0))
        .await
        .unwrap();
    f.store
        .add_delay_message(msg("svc", "queued"), PushOptions::to(["u"]))
        .await
        .unwrap();

    let sweep = f.store.process_scheduled_messages_at(now).await.unwrap();

    assert_eq!(sweep.sent, 2);
    let titles: Vec<String> = f
        .pusher
        .sent_messages()
        .await
        .into_iter()
        .map(|m| m.title)
        .collect();
    assert_eq!(titles, vec!["overdue", "current", "1 delayed messages"]);
}

#[tokio::test]
async fn loops_cancelled_before_a_tick_never_flush() {
    let f = fixture();
    f.store
        .add_delay_message(msg("svc", "held"), PushOptions::to(["u"]))
        .await
        .unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let loops = start(
        f.store.clone(),
        Duration::from_millis(1),
        Duration::from_millis(1),
        cancel,
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    tokio::time::timeout(Duration::from_secs(5), loops.join())
        .await
        .expect("loops should exit after cancellation");

    assert_eq!(f.pusher.attempts(), 0);
    assert_eq!(f.store.pending_delay_count().await.unwrap(), 1);
}
