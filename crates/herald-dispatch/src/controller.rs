// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch controller.
//!
//! Holds exactly one active pusher and the working store bound to it, and
//! owns the store's background loops from `initialize` until `stop`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use herald_core::{HealthStatus, HeraldError, Message, PushOptions, Pusher};
use herald_history::HistoryLog;
use herald_pushers::PusherRegistry;
use herald_store::{FlushOutcome, StoreLoops, WorkingStore, deliver};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::settings::PushSettings;

struct Active {
    pusher: Arc<dyn Pusher>,
    store: Arc<WorkingStore>,
    cancel: CancellationToken,
    loops: StoreLoops,
}

#[derive(Default)]
struct State {
    registered: Vec<String>,
    active: Option<Active>,
}

/// Entry point for sending notifications now, later in a digest, or at a
/// given minute.
pub struct PushController {
    settings: PushSettings,
    history: Arc<HistoryLog>,
    state: RwLock<State>,
}

impl PushController {
    pub fn new(settings: PushSettings, history: HistoryLog) -> Self {
        Self::with_shared_history(settings, Arc::new(history))
    }

    /// Like [`PushController::new`] for a history log shared with other readers.
    pub fn with_shared_history(settings: PushSettings, history: Arc<HistoryLog>) -> Self {
        Self {
            settings,
            history,
            state: RwLock::new(State::default()),
        }
    }

    pub fn history(&self) -> &Arc<HistoryLog> {
        &self.history
    }

    /// Activates the pusher registered as `name` and starts the store loops.
    pub async fn initialize(
        &self,
        registry: &PusherRegistry,
        name: &str,
    ) -> Result<(), HeraldError> {
        let pusher = registry.get(name)?;
        self.install(pusher, registry.list()).await
    }

    /// Activates a caller-supplied pusher and starts the store loops.
    pub async fn initialize_with_pusher(&self, pusher: Arc<dyn Pusher>) -> Result<(), HeraldError> {
        let names = vec![pusher.name().to_string()];
        self.install(pusher, names).await
    }

    async fn install(
        &self,
        pusher: Arc<dyn Pusher>,
        registered: Vec<String>,
    ) -> Result<(), HeraldError> {
        let mut state = self.state.write().await;
        if let Some(active) = &state.active {
            return Err(HeraldError::Config(format!(
                "dispatcher already initialized with pusher `{}`",
                active.pusher.name()
            )));
        }

        let store = Arc::new(WorkingStore::new(
            &self.settings.working_dir,
            pusher.clone(),
            self.history.clone(),
        ));
        let cancel = CancellationToken::new();
        let loops = herald_store::start(
            store.clone(),
            self.settings.flush_interval,
            self.settings.scheduled_tick,
            cancel.clone(),
        );

        info!(
            pusher = pusher.name(),
            working_dir = %self.settings.working_dir.display(),
            flush_interval_secs = self.settings.flush_interval.as_secs(),
            scheduled_tick_secs = self.settings.scheduled_tick.as_secs(),
            "dispatcher initialized"
        );
        state.registered = registered;
        state.active = Some(Active {
            pusher,
            store,
            cancel,
            loops,
        });
        Ok(())
    }

    async fn active(&self) -> Result<(Arc<dyn Pusher>, Arc<WorkingStore>), HeraldError> {
        let state = self.state.read().await;
        let active = state.active.as_ref().ok_or(HeraldError::NotInitialized)?;
        Ok((active.pusher.clone(), active.store.clone()))
    }

    /// Delivers `message` immediately and returns it in its final state.
    ///
    /// Options are validated by the active pusher first; a rejection is
    /// recorded as a failure without attempting delivery. After a successful
    /// send, queued delayed messages are flushed as well.
    pub async fn push_now(
        &self,
        message: Message,
        options: PushOptions,
    ) -> Result<Message, HeraldError> {
        let (pusher, store) = self.active().await?;
        let message = message.ensure_id();

        if let Err(e) = pusher.validate(&options) {
            self.record_rejection(&message, pusher.name(), &options, &e).await;
            return Err(e);
        }

        let delivered = deliver(
            pusher.as_ref(),
            &self.history,
            message.pending(),
            &options,
            "immediate delivery failed",
        )
        .await?;

        match store.send_all_delay_messages().await {
            Ok(FlushOutcome::Sent { merged, .. }) => {
                debug!(merged, "flushed delayed messages after immediate push");
            }
            Ok(FlushOutcome::Empty) => {}
            Err(e) => warn!(error = %e, "delayed flush after immediate push failed"),
        }

        Ok(delivered)
    }

    /// Queues `message` for the next delayed digest. Nothing is sent now.
    ///
    /// Options are validated before anything is persisted.
    pub async fn enqueue(&self, message: Message, options: PushOptions) -> Result<(), HeraldError> {
        let (pusher, store) = self.active().await?;
        let message = message.ensure_id();

        if let Err(e) = pusher.validate(&options) {
            self.record_rejection(&message, pusher.name(), &options, &e).await;
            return Err(e);
        }

        store.add_delay_message(message.pending(), options).await
    }

    /// Sends all queued delayed messages as one digest now.
    pub async fn flush_queue(&self) -> Result<FlushOutcome, HeraldError> {
        let (_, store) = self.active().await?;
        store.send_all_delay_messages().await
    }

    /// Queues `message` for delivery at `when` (minute precision).
    ///
    /// Options are validated before anything is persisted. Returns the
    /// minute the message was scheduled for.
    pub async fn push_at(
        &self,
        message: Message,
        options: PushOptions,
        when: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, HeraldError> {
        let (pusher, store) = self.active().await?;
        let message = message.ensure_id();

        if let Err(e) = pusher.validate(&options) {
            self.record_rejection(&message, pusher.name(), &options, &e).await;
            return Err(e);
        }

        store
            .add_scheduled_message(message.pending(), options, when)
            .await
    }

    async fn record_rejection(
        &self,
        message: &Message,
        pusher_name: &str,
        options: &PushOptions,
        err: &HeraldError,
    ) {
        warn!(message_id = %message.id, error = %err, "push options rejected");
        let failed = message.clone().failed();
        if let Err(e) = self
            .history
            .record_failure(&failed, pusher_name, options, &err.to_string())
            .await
        {
            warn!(message_id = %message.id, error = %e, "failed to record rejected push");
        }
    }

    /// Stops the background loops and waits for them to exit.
    ///
    /// Every later operation returns [`HeraldError::NotInitialized`]. Calling
    /// `stop` on a controller that is not running is a no-op.
    pub async fn stop(&self) {
        let active = self.state.write().await.active.take();
        let Some(active) = active else {
            return;
        };

        info!(pusher = active.pusher.name(), "stopping dispatcher");
        active.cancel.cancel();
        active.loops.join().await;
        info!("dispatcher stopped");
    }

    /// Names known at initialization, sorted.
    pub async fn registered_pushers(&self) -> Vec<String> {
        self.state.read().await.registered.clone()
    }

    pub async fn active_pusher_name(&self) -> Option<String> {
        self.state
            .read()
            .await
            .active
            .as_ref()
            .map(|a| a.pusher.name().to_string())
    }

    /// Health of the active pusher.
    pub async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        let (pusher, _) = self.active().await?;
        pusher.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::SendStatus;
    use herald_history::month_of;
    use herald_test_utils::{MockPusher, TestDirs};

    fn controller(dirs: &TestDirs) -> PushController {
        PushController::with_shared_history(PushSettings::new(dirs.working()), dirs.history_log())
    }

    async fn running(dirs: &TestDirs, pusher: &MockPusher) -> PushController {
        let c = controller(dirs);
        c.initialize_with_pusher(Arc::new(pusher.clone())).await.unwrap();
        c
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let dirs = TestDirs::new().unwrap();
        let c = controller(&dirs);
        let msg = Message::normal("a", "t", "c");
        let opts = PushOptions::to(["u"]);

        assert!(matches!(
            c.push_now(msg.clone(), opts.clone()).await,
            Err(HeraldError::NotInitialized)
        ));
        assert!(matches!(
            c.enqueue(msg.clone(), opts.clone()).await,
            Err(HeraldError::NotInitialized)
        ));
        assert!(matches!(c.flush_queue().await, Err(HeraldError::NotInitialized)));
        assert!(matches!(
            c.push_at(msg, opts, Utc::now()).await,
            Err(HeraldError::NotInitialized)
        ));
        assert!(matches!(c.health_check().await, Err(HeraldError::NotInitialized)));
        assert!(c.active_pusher_name().await.is_none());
    }

    #[tokio::test]
    async fn push_now_returns_delivered_message() {
        let dirs = TestDirs::new().unwrap();
        let pusher = MockPusher::new();
        let c = running(&dirs, &pusher).await;

        let sent = c
            .push_now(Message::normal("a", "hello", "world"), PushOptions::to(["u"]))
            .await
            .unwrap();

        assert_eq!(sent.status, SendStatus::Success);
        assert!(sent.sent_at.is_some());
        assert_eq!(pusher.sent_count().await, 1);
        c.stop().await;
    }

    #[tokio::test]
    async fn push_now_writes_one_history_record_per_call() {
        let dirs = TestDirs::new().unwrap();
        let pusher = MockPusher::new();
        let c = running(&dirs, &pusher).await;
        let month = month_of(Utc::now());

        c.push_now(Message::normal("a", "ok", "c"), PushOptions::to(["u"]))
            .await
            .unwrap();
        let rejected = c
            .push_now(Message::normal("a", "bad", "c"), PushOptions::to(["u"]).with_retry(6))
            .await;
        pusher.set_failure(Some("down")).await;
        let failed = c
            .push_now(Message::normal("a", "down", "c"), PushOptions::to(["u"]))
            .await;

        assert!(matches!(rejected, Err(HeraldError::Validation(_))));
        assert!(matches!(failed, Err(HeraldError::Delivery { .. })));
        assert_eq!(c.history().success_records(&month).await.unwrap().len(), 1);
        assert_eq!(c.history().failed_records(&month).await.unwrap().len(), 2);
        // The rejected push never reached the pusher.
        assert_eq!(pusher.attempts(), 2);
        c.stop().await;
    }

    #[tokio::test]
    async fn push_now_flushes_queued_messages() {
        let dirs = TestDirs::new().unwrap();
        let pusher = MockPusher::new();
        let c = running(&dirs, &pusher).await;

        c.enqueue(Message::normal("a", "queued", "c"), PushOptions::to(["u"]))
            .await
            .unwrap();
        assert_eq!(pusher.sent_count().await, 0);

        c.push_now(Message::normal("a", "urgent", "c"), PushOptions::to(["u"]))
            .await
            .unwrap();

        let titles: Vec<String> = pusher.sent_messages().await.into_iter().map(|m| m.title).collect();
        assert_eq!(titles, vec!["urgent", "1 delayed messages"]);
        c.stop().await;
    }

    #[tokio::test]
    async fn push_at_rejects_bad_options_before_persisting() {
        let dirs = TestDirs::new().unwrap();
        let pusher = MockPusher::new();
        let c = running(&dirs, &pusher).await;

        let err = c
            .push_at(
                Message::normal("a", "t", "c"),
                PushOptions::to(Vec::<String>::new()),
                Utc::now() + chrono::Duration::hours(1),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HeraldError::Validation(_)));
        assert!(dirs.working_files().is_empty());
        c.stop().await;
    }

    #[tokio::test]
    async fn enqueue_rejects_bad_options_before_persisting() {
        let dirs = TestDirs::new().unwrap();
        let pusher = MockPusher::new();
        let c = running(&dirs, &pusher).await;
        let month = month_of(Utc::now());

        let err = c
            .enqueue(
                Message::normal("a", "t", "c"),
                PushOptions::to(Vec::<String>::new()).with_priority(42).with_retry(9),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HeraldError::Validation(_)));
        assert!(dirs.working_files().is_empty());
        assert_eq!(c.history().failed_records(&month).await.unwrap().len(), 1);

        assert_eq!(c.flush_queue().await.unwrap(), FlushOutcome::Empty);
        assert_eq!(pusher.attempts(), 0);
        c.stop().await;
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let dirs = TestDirs::new().unwrap();
        let c = running(&dirs, &MockPusher::new()).await;

        let err = c
            .initialize_with_pusher(Arc::new(MockPusher::named("other")))
            .await
            .unwrap_err();

        assert!(matches!(err, HeraldError::Config(m) if m.contains("already initialized")));
        assert_eq!(c.active_pusher_name().await.as_deref(), Some("mock"));
        c.stop().await;
    }

    #[tokio::test]
    async fn stop_makes_later_operations_fail() {
        let dirs = TestDirs::new().unwrap();
        let c = running(&dirs, &MockPusher::new()).await;

        c.stop().await;
        c.stop().await;

        assert!(matches!(
            c.enqueue(Message::normal("a", "t", "c"), PushOptions::to(["u"])).await,
            Err(HeraldError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn initialize_by_registry_name() {
        let dirs = TestDirs::new().unwrap();
        let mut registry = PusherRegistry::new();
        registry.register(Arc::new(MockPusher::named("sms"))).unwrap();
        registry.register(Arc::new(MockPusher::named("email"))).unwrap();
        let c = controller(&dirs);

        let missing = c.initialize(&registry, "pager").await.unwrap_err();
        assert!(matches!(missing, HeraldError::PusherNotFound { .. }));

        c.initialize(&registry, "sms").await.unwrap();
        assert_eq!(c.active_pusher_name().await.as_deref(), Some("sms"));
        assert_eq!(c.registered_pushers().await, vec!["email", "sms"]);
        assert!(c.health_check().await.unwrap().is_healthy());
        c.stop().await;
    }
}
