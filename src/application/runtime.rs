use crate::application::controller::{
    PollApplied, PreparedCommand, SessionController, SessionIntent, Transition,
};
use crate::application::state_sync::{PollResult, PollTrigger};
use crate::application::tag_cache::MAX_RECENT_TAGS;
use crate::domain::countdown::TickOutcome;
use crate::domain::models::PresetId;
use crate::domain::view::{RenderSurface, UiProjector};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::KeyValueStore;
use crate::infrastructure::session_api::SessionApi;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, MissedTickBehavior, interval, sleep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeIntent {
    Session(SessionIntent),
    SelectPreset(PresetId),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    intents: UnboundedSender<RuntimeIntent>,
}

impl RuntimeHandle {
    /// Returns false once the runtime has stopped.
    pub fn submit(&self, intent: RuntimeIntent) -> bool {
        self.intents.send(intent).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.intents.send(RuntimeIntent::Shutdown);
    }
}

type CommandOutcome = (PreparedCommand, Result<(), InfraError>);
type TagsOutcome = Result<Vec<String>, InfraError>;

/// Event loop owning the single session controller. Polls and commands run
/// as separate tasks and report back over channels; everything that mutates
/// session state happens on this loop.
pub struct SessionRuntime<A, S, R>
where
    A: SessionApi + 'static,
    S: KeyValueStore,
    R: RenderSurface,
{
    controller: SessionController<A, S>,
    projector: UiProjector<R>,
    tick_period: Duration,
    poll_period: Duration,
    intents: UnboundedReceiver<RuntimeIntent>,
}

impl<A, S, R> SessionRuntime<A, S, R>
where
    A: SessionApi + 'static,
    S: KeyValueStore,
    R: RenderSurface,
{
    pub fn new(controller: SessionController<A, S>, surface: R, config: &ClientConfig) -> (Self, RuntimeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Self {
            controller,
            projector: UiProjector::new(surface),
            tick_period: Duration::from_millis(config.tick_interval_ms),
            poll_period: Duration::from_millis(config.poll_interval_ms),
            intents: rx,
        };
        (runtime, RuntimeHandle { intents: tx })
    }

    /// Runs until a shutdown intent arrives or every handle is dropped.
    pub async fn run(mut self) -> (SessionController<A, S>, R) {
        let (poll_tx, mut poll_rx) = mpsc::unbounded_channel::<PollResult>();
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<CommandOutcome>();
        let (tags_tx, mut tags_rx) = mpsc::unbounded_channel::<TagsOutcome>();
        let sync = Arc::clone(self.controller.sync());

        self.controller.log().log_info("runtime", "starting");
        let api = Arc::clone(self.controller.api());
        let tags_task = tokio::spawn(async move {
            let result = api.recent_tags(Some(MAX_RECENT_TAGS as u32)).await;
            let _ = tags_tx.send(result);
        });
        sync.spawn_poll(PollTrigger::Initial, poll_tx.clone());
        let periodic = sync.schedule_periodic(self.poll_period, poll_tx.clone());

        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticking = false;
        self.render();

        loop {
            let counting = self.controller.is_counting();
            if counting && !ticking {
                ticker.reset();
            }
            ticking = counting;

            let toast_wait = self.controller.toast_deadline().map(|deadline| {
                (deadline - self.controller.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            });

            tokio::select! {
                _ = ticker.tick(), if ticking => {
                    if self.controller.tick() == TickOutcome::Expired {
                        sync.on_expired(poll_tx.clone());
                    }
                }
                Some(result) = poll_rx.recv() => {
                    let applied = self.controller.apply_poll(result);
                    if let PollApplied::Applied(transition) = applied {
                        if transition != Transition::None {
                            // re-phase the tick interval on the new session
                            ticking = false;
                        }
                    }
                }
                Some(result) = tags_rx.recv() => self.controller.apply_server_tags(result),
                Some((command, result)) = command_rx.recv() => {
                    if self.controller.finish(&command, result).is_ok() {
                        sync.spawn_poll(PollTrigger::Command, poll_tx.clone());
                    }
                }
                intent = self.intents.recv() => match intent {
                    Some(RuntimeIntent::Session(intent)) => {
                        if let Ok(command) = self.controller.begin(intent) {
                            let api = Arc::clone(self.controller.api());
                            let results = command_tx.clone();
                            tokio::spawn(async move {
                                let result = command.execute(api.as_ref()).await;
                                let _ = results.send((command, result));
                            });
                        }
                    }
                    Some(RuntimeIntent::SelectPreset(id)) => self.controller.select_preset(id),
                    Some(RuntimeIntent::Shutdown) | None => break,
                },
                _ = sleep(toast_wait.unwrap_or_default()), if toast_wait.is_some() => {
                    self.controller.advance_toasts();
                }
            }
            self.render();
        }

        periodic.abort();
        tags_task.abort();
        self.controller.log().log_info("runtime", "stopped");
        let Self {
            controller, projector, ..
        } = self;
        (controller, projector.into_surface())
    }

    fn render(&mut self) {
        self.controller.advance_toasts();
        let input = self.controller.projection_input();
        self.projector.render(&input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        FakeSessionApi, RecordedCommand, active_snapshot, idle_snapshot,
    };
    use crate::domain::NowProvider;
    use crate::domain::models::SessionMode;
    use crate::domain::view::ViewModel;
    use crate::infrastructure::activity_log::ActivityLog;
    use crate::infrastructure::config::{DEFAULT_BASE_URL, parse_base_url};
    use crate::infrastructure::key_value_store::InMemoryKeyValueStore;
    use chrono::{DateTime, Utc};

    #[derive(Default)]
    struct RecordingSurface {
        views: Vec<ViewModel>,
    }

    impl RenderSurface for RecordingSurface {
        fn render(&mut self, view: &ViewModel) {
            self.views.push(view.clone());
        }
    }

    /// Wall clock that follows tokio's paused test clock.
    fn tokio_clock() -> NowProvider {
        let origin = tokio::time::Instant::now();
        let base = DateTime::parse_from_rfc3339("2026-02-16T09:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        Arc::new(move || {
            let elapsed = tokio::time::Instant::now() - origin;
            base + chrono::Duration::from_std(elapsed).expect("elapsed fits")
        })
    }

    fn config(poll_interval_ms: u64) -> ClientConfig {
        ClientConfig {
            poll_interval_ms,
            ..ClientConfig::with_base_url(parse_base_url(DEFAULT_BASE_URL).expect("default url"))
        }
    }

    fn runtime(
        api: &Arc<FakeSessionApi>,
        poll_interval_ms: u64,
    ) -> (
        SessionRuntime<FakeSessionApi, InMemoryKeyValueStore, RecordingSurface>,
        RuntimeHandle,
    ) {
        let config = config(poll_interval_ms);
        let controller = SessionController::from_config(
            Arc::clone(api),
            Arc::new(InMemoryKeyValueStore::default()),
            Arc::new(ActivityLog::in_memory()),
            &config,
        )
        .with_now_provider(tokio_clock());
        SessionRuntime::new(controller, RecordingSurface::default(), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_without_fresh_polls_resyncs_once() {
        let api = Arc::new(FakeSessionApi::default());
        api.push_state(active_snapshot(SessionMode::Focus, 1500, 1500));
        api.set_fallback_state(idle_snapshot(1, 1500));
        let (runtime, handle) = runtime(&api, 3_600_000);
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(1_500_500)).await;
        handle.shutdown();
        let (controller, surface) = task.await.expect("runtime task");

        assert_eq!(api.fetch_calls(), 2);
        assert_eq!(controller.mode(), SessionMode::Idle);
        assert_eq!(controller.snapshot().completed_focus_count, 1);
        assert!(surface.views.iter().any(|view| view.remaining_text == "24:59"));
        assert!(surface
            .views
            .iter()
            .any(|view| view.toast.as_deref() == Some("Focus session complete")));
        let last = surface.views.last().expect("rendered view");
        assert_eq!(last.status_label, "Ready");
        assert!(last.break_enabled);
        assert!(!last.start_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_resync_keeps_running_while_idle() {
        let api = Arc::new(FakeSessionApi::default());
        let (runtime, handle) = runtime(&api, 60_000);
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(180_500)).await;
        handle.shutdown();
        task.await.expect("runtime task");

        assert_eq!(api.fetch_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn start_intent_is_confirmed_by_resync() {
        let api = Arc::new(FakeSessionApi::default());
        api.push_state(idle_snapshot(0, 0));
        api.set_fallback_state(active_snapshot(SessionMode::Focus, 1500, 1500));
        let (runtime, handle) = runtime(&api, 60_000);
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.submit(RuntimeIntent::Session(SessionIntent::StartFocus {
            duration_minutes: None,
            tag: Some("Writing".to_string()),
        })));
        tokio::time::sleep(Duration::from_millis(10_050)).await;
        handle.shutdown();
        let (controller, surface) = task.await.expect("runtime task");

        assert_eq!(
            api.commands(),
            vec![RecordedCommand::StartFocus {
                duration_minutes: 25,
                tag: Some("Writing".to_string()),
            }]
        );
        assert_eq!(controller.mode(), SessionMode::Focus);
        assert_eq!(controller.countdown().remaining_seconds, 1490);
        assert!(surface.views.iter().any(|view| !view.start_enabled && !view.break_enabled && !view.stop_enabled));
        let last = surface.views.last().expect("rendered view");
        assert_eq!(last.status_label, "Focus");
        assert!(last.stop_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn toast_is_dismissed_after_its_visible_window() {
        let api = Arc::new(FakeSessionApi::default());
        api.push_state_error(InfraError::Network("offline".to_string()));
        let (runtime, handle) = runtime(&api, 3_600_000);
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        handle.shutdown();
        let (controller, surface) = task.await.expect("runtime task");

        assert!(surface.views.iter().any(|view| view.toast.is_some()));
        assert_eq!(surface.views.last().and_then(|view| view.toast.clone()), None);
        assert_eq!(controller.toasts().timers_armed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_tag_request_does_not_hold_up_sync() {
        let api = Arc::new(FakeSessionApi::default());
        api.hang_recent_tags();
        api.set_fallback_state(active_snapshot(SessionMode::Break, 300, 300));
        let (runtime, handle) = runtime(&api, 60_000);
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(600_500)).await;
        handle.shutdown();
        let (controller, surface) = task.await.expect("runtime task");

        assert_eq!(api.fetch_calls(), 11);
        assert!(surface.views.iter().any(|view| view.status_label == "Break"));
        assert!(surface.views.iter().any(|view| view.remaining_text == "4:59"));
        assert!(controller.tag_suggestions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn server_tags_reach_the_view() {
        let api = Arc::new(FakeSessionApi::default());
        api.set_recent_tags(&["Email", "Reading"]);
        let (runtime, handle) = runtime(&api, 60_000);
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.shutdown();
        let (_controller, surface) = task.await.expect("runtime task");

        let last = surface.views.last().expect("rendered view");
        assert_eq!(last.tag_suggestions, vec!["Email".to_string(), "Reading".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_loop() {
        let api = Arc::new(FakeSessionApi::default());
        let (runtime, handle) = runtime(&api, 60_000);
        drop(handle);
        let (controller, _surface) = runtime.run().await;
        assert_eq!(controller.mode(), SessionMode::Idle);
    }
}
