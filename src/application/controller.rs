use crate::application::presets::PresetSelector;
use crate::application::state_sync::{PollResult, PollTrigger, StateSyncClient};
use crate::application::tag_cache::TagCache;
use crate::domain::NowProvider;
use crate::domain::countdown::{CountdownEngine, TickOutcome};
use crate::domain::models::{
    LocalCountdownState, PresetId, SessionMode, SessionSnapshot, normalize_tag, validate_duration,
};
use crate::domain::toast::ToastNotifier;
use crate::domain::view::ProjectionInput;
use crate::infrastructure::activity_log::ActivityLog;
use crate::infrastructure::config::{
    ClientConfig, DEFAULT_TOAST_COOLDOWN_MS, DEFAULT_TOAST_VISIBLE_MS,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::KeyValueStore;
use crate::infrastructure::session_api::SessionApi;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const POLL_FAILED_MESSAGE: &str = "Could not reach the timer service; showing last known state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    StartFocus,
    StartBreak,
    Stop,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartFocus => "start_focus",
            Self::StartBreak => "start_break",
            Self::Stop => "stop",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Self::StartFocus => "Failed to start focus session",
            Self::StartBreak => "Failed to start break",
            Self::Stop => "Failed to stop session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIntent {
    /// `None` duration means "use the selected preset".
    StartFocus {
        duration_minutes: Option<u32>,
        tag: Option<String>,
    },
    StartBreak {
        duration_minutes: Option<u32>,
        tag: Option<String>,
    },
    Stop,
}

/// A validated command ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub kind: CommandKind,
    pub duration_minutes: u32,
    pub tag: Option<String>,
}

impl PreparedCommand {
    pub async fn execute<A: SessionApi + ?Sized>(&self, api: &A) -> Result<(), InfraError> {
        match self.kind {
            CommandKind::StartFocus => api.start_focus(self.duration_minutes, self.tag.as_deref()).await,
            CommandKind::StartBreak => api.start_break(self.duration_minutes, self.tag.as_deref()).await,
            CommandKind::Stop => api.stop().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Started(SessionMode),
    /// Focus ended on the server and the completed count went up.
    FocusCompleted,
    /// A session ended without a recorded completion (break over, or stopped
    /// elsewhere).
    Ended(SessionMode),
    Switched {
        from: SessionMode,
        to: SessionMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollApplied {
    Applied(Transition),
    Stale,
    Failed,
}

/// Session state machine: mirrors the server's mode, drives the local
/// countdown, and turns command and poll outcomes into notifications.
///
/// The controller never changes mode on its own guess. Starting a session
/// only takes effect once a poll reports it; stopping takes effect when the
/// stop request succeeds.
pub struct SessionController<A, S>
where
    A: SessionApi + 'static,
    S: KeyValueStore,
{
    api: Arc<A>,
    sync: Arc<StateSyncClient<A>>,
    countdown: CountdownEngine,
    toasts: ToastNotifier,
    tags: TagCache<S>,
    presets: PresetSelector<S>,
    log: Arc<ActivityLog>,
    now_provider: NowProvider,
    mode: SessionMode,
    snapshot: SessionSnapshot,
    suggested_next: SessionMode,
    in_flight: Option<CommandKind>,
    server_tags: Vec<String>,
    suggestions: Vec<String>,
}

impl<A, S> SessionController<A, S>
where
    A: SessionApi + 'static,
    S: KeyValueStore,
{
    pub fn new(api: Arc<A>, store: Arc<S>, log: Arc<ActivityLog>) -> Self {
        let now_provider: NowProvider = Arc::new(Utc::now);
        let mut controller = Self {
            sync: Arc::new(StateSyncClient::new(Arc::clone(&api))),
            api,
            countdown: CountdownEngine::new(),
            toasts: ToastNotifier::new(DEFAULT_TOAST_VISIBLE_MS, DEFAULT_TOAST_COOLDOWN_MS),
            tags: TagCache::new(Arc::clone(&store)),
            presets: PresetSelector::new(store),
            log,
            now_provider,
            mode: SessionMode::Idle,
            snapshot: SessionSnapshot::default(),
            suggested_next: SessionMode::Focus,
            in_flight: None,
            server_tags: Vec::new(),
            suggestions: Vec::new(),
        };
        controller.rebuild_suggestions();
        controller
    }

    pub fn from_config(api: Arc<A>, store: Arc<S>, log: Arc<ActivityLog>, config: &ClientConfig) -> Self {
        Self::new(api, store, log).with_toast_timing(config.toast_visible_ms, config.toast_cooldown_ms)
    }

    pub fn with_toast_timing(mut self, visible_ms: u64, cooldown_ms: u64) -> Self {
        self.toasts =
            ToastNotifier::new(visible_ms, cooldown_ms).with_now_provider(Arc::clone(&self.now_provider));
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.countdown = CountdownEngine::new().with_now_provider(Arc::clone(&now_provider));
        self.toasts = std::mem::replace(&mut self.toasts, ToastNotifier::new(0, 0))
            .with_now_provider(Arc::clone(&now_provider));
        self.now_provider = now_provider;
        self
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn countdown(&self) -> LocalCountdownState {
        self.countdown.current()
    }

    pub fn is_counting(&self) -> bool {
        self.countdown.is_counting()
    }

    pub fn suggested_next(&self) -> SessionMode {
        self.suggested_next
    }

    pub fn command_in_flight(&self) -> Option<CommandKind> {
        self.in_flight
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn sync(&self) -> &Arc<StateSyncClient<A>> {
        &self.sync
    }

    pub fn toasts(&self) -> &ToastNotifier {
        &self.toasts
    }

    pub fn log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    /// Validates an intent and marks its command as in flight. Validation
    /// failures are reported through the toast and leave all state as is.
    pub fn begin(&mut self, intent: SessionIntent) -> Result<PreparedCommand, InfraError> {
        let prepared = self.prepare(intent);
        match prepared {
            Ok(command) => {
                self.in_flight = Some(command.kind);
                self.log.log_info(
                    command.kind.as_str(),
                    &format!(
                        "issuing duration_minutes={} tag={}",
                        command.duration_minutes,
                        command.tag.as_deref().unwrap_or("-")
                    ),
                );
                Ok(command)
            }
            Err((kind, error)) => {
                self.log.log_error(kind.as_str(), &error.to_string());
                self.toasts.show(&error.user_message(kind.fallback_message()));
                Err(error)
            }
        }
    }

    fn prepare(&self, intent: SessionIntent) -> Result<PreparedCommand, (CommandKind, InfraError)> {
        let preset = self.presets.current();
        let (kind, duration_minutes, tag) = match intent {
            SessionIntent::StartFocus { duration_minutes, tag } => (
                CommandKind::StartFocus,
                duration_minutes.unwrap_or(preset.focus_minutes),
                tag,
            ),
            SessionIntent::StartBreak { duration_minutes, tag } => (
                CommandKind::StartBreak,
                duration_minutes.unwrap_or(preset.break_minutes),
                tag,
            ),
            SessionIntent::Stop => (CommandKind::Stop, 0, None),
        };

        if let Some(pending) = self.in_flight {
            return Err((
                kind,
                InfraError::InvalidInput(format!("{} is still in progress", pending.as_str())),
            ));
        }
        if kind == CommandKind::Stop {
            return Ok(PreparedCommand {
                kind,
                duration_minutes,
                tag: None,
            });
        }

        validate_duration(duration_minutes).map_err(|message| (kind, InfraError::InvalidInput(message)))?;
        let tag = normalize_tag(tag.as_deref()).map_err(|message| (kind, InfraError::InvalidInput(message)))?;
        Ok(PreparedCommand {
            kind,
            duration_minutes,
            tag,
        })
    }

    /// Records the outcome of a command started with [`Self::begin`]. On
    /// success the caller should resync; polls issued before this point are
    /// discarded when they arrive.
    pub fn finish(&mut self, command: &PreparedCommand, result: Result<(), InfraError>) -> Result<(), InfraError> {
        self.in_flight = None;
        match result {
            Ok(()) => {
                self.sync.invalidate_in_flight();
                match command.kind {
                    CommandKind::StartFocus | CommandKind::StartBreak => {
                        if let Some(tag) = command.tag.as_deref() {
                            if let Err(error) = self.tags.remember(tag) {
                                self.log.log_error("tags", &format!("failed to remember tag: {error}"));
                            }
                            self.rebuild_suggestions();
                        }
                    }
                    CommandKind::Stop => {
                        let previous = self.mode;
                        self.mode = SessionMode::Idle;
                        self.countdown.reset(0, 0, SessionMode::Idle);
                        self.suggested_next = SessionMode::Focus;
                        if previous != SessionMode::Idle {
                            self.log.log_info("transition", &format!("{previous} -> idle (stopped)"));
                        }
                    }
                }
                self.log.log_info(command.kind.as_str(), "accepted");
                Ok(())
            }
            Err(error) => {
                self.log.log_error(command.kind.as_str(), &error.to_string());
                self.toasts.show(&error.user_message(command.kind.fallback_message()));
                Err(error)
            }
        }
    }

    pub fn apply_poll(&mut self, result: PollResult) -> PollApplied {
        let PollResult {
            sequence,
            trigger,
            outcome,
        } = result;

        match outcome {
            Ok(snapshot) => {
                if !self.sync.accept(sequence) {
                    self.log.log_info(
                        "poll",
                        &format!("discarded stale response seq={sequence} trigger={}", trigger.as_str()),
                    );
                    return PollApplied::Stale;
                }
                let transition = self.reconcile(snapshot);
                PollApplied::Applied(transition)
            }
            Err(error) => {
                self.log.log_error(
                    "poll",
                    &format!("seq={sequence} trigger={} failed: {error}", trigger.as_str()),
                );
                if self.sync.is_stale(sequence) {
                    return PollApplied::Stale;
                }
                self.toasts.show(POLL_FAILED_MESSAGE);
                PollApplied::Failed
            }
        }
    }

    fn reconcile(&mut self, snapshot: SessionSnapshot) -> Transition {
        let previous = self.mode;
        let transition = match (previous, snapshot.mode) {
            (from, to) if from == to => Transition::None,
            (SessionMode::Idle, to) => Transition::Started(to),
            (SessionMode::Focus, SessionMode::Idle)
                if snapshot.completed_focus_count > self.snapshot.completed_focus_count =>
            {
                Transition::FocusCompleted
            }
            (from, SessionMode::Idle) => Transition::Ended(from),
            (from, to) => Transition::Switched { from, to },
        };

        self.mode = snapshot.mode;
        self.countdown.reset(
            snapshot.remaining_seconds,
            snapshot.planned_duration_seconds,
            snapshot.mode,
        );

        match transition {
            Transition::None => {}
            Transition::FocusCompleted => {
                self.suggested_next = SessionMode::Break;
                if snapshot.suggest_long_break {
                    self.toasts.show("Focus session complete. Time for a long break!");
                } else {
                    self.toasts.show("Focus session complete");
                }
            }
            Transition::Ended(SessionMode::Break) => {
                self.suggested_next = SessionMode::Focus;
                self.toasts.show("Break finished");
            }
            Transition::Ended(_) => {
                self.suggested_next = SessionMode::Focus;
                self.toasts.show("Session ended");
            }
            Transition::Started(_) | Transition::Switched { .. } => {}
        }
        if transition != Transition::None {
            self.log.log_info("transition", &format!("{previous} -> {}", snapshot.mode));
        }

        self.snapshot = snapshot;
        transition
    }

    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            self.log.log_info("countdown", &format!("{} countdown reached zero", self.mode));
        }
        outcome
    }

    pub async fn refresh(&mut self, trigger: PollTrigger) -> PollApplied {
        let result = self.sync.poll_now(trigger).await;
        self.apply_poll(result)
    }

    pub async fn start_focus(
        &mut self,
        duration_minutes: Option<u32>,
        tag: Option<&str>,
    ) -> Result<PollApplied, InfraError> {
        self.run_command(SessionIntent::StartFocus {
            duration_minutes,
            tag: tag.map(ToOwned::to_owned),
        })
        .await
    }

    pub async fn start_break(
        &mut self,
        duration_minutes: Option<u32>,
        tag: Option<&str>,
    ) -> Result<PollApplied, InfraError> {
        self.run_command(SessionIntent::StartBreak {
            duration_minutes,
            tag: tag.map(ToOwned::to_owned),
        })
        .await
    }

    pub async fn stop(&mut self) -> Result<PollApplied, InfraError> {
        self.run_command(SessionIntent::Stop).await
    }

    async fn run_command(&mut self, intent: SessionIntent) -> Result<PollApplied, InfraError> {
        let command = self.begin(intent)?;
        let api = Arc::clone(&self.api);
        let result = command.execute(api.as_ref()).await;
        self.finish(&command, result)?;
        Ok(self.refresh(PollTrigger::Command).await)
    }

    pub fn select_preset(&mut self, id: PresetId) {
        match self.presets.select(id) {
            Ok(()) => {
                let preset = id.preset();
                self.log.log_info("preset", &format!("selected {}", id.as_str()));
                self.toasts.show(&format!(
                    "Preset {}: {}/{} minutes",
                    id.as_str(),
                    preset.focus_minutes,
                    preset.break_minutes
                ));
            }
            Err(error) => {
                self.log.log_error("preset", &error.to_string());
                self.toasts.show("Failed to save preset");
            }
        }
    }

    pub fn selected_preset(&self) -> PresetId {
        self.presets.current_id()
    }

    /// Takes the outcome of a recent-tags fetch. Failures keep the previous
    /// server list.
    pub fn apply_server_tags(&mut self, result: Result<Vec<String>, InfraError>) {
        match result {
            Ok(tags) => {
                self.server_tags = tags;
                self.rebuild_suggestions();
            }
            Err(error) => self.log.log_error("tags", &format!("failed to load recent tags: {error}")),
        }
    }

    pub fn tag_suggestions(&self) -> &[String] {
        &self.suggestions
    }

    fn rebuild_suggestions(&mut self) {
        self.suggestions = match self.tags.suggestions(&self.server_tags) {
            Ok(tags) => tags,
            Err(error) => {
                self.log.log_error("tags", &format!("failed to read local tags: {error}"));
                self.server_tags.clone()
            }
        };
    }

    pub fn advance_toasts(&mut self) {
        self.toasts.advance();
    }

    pub fn toast_deadline(&self) -> Option<DateTime<Utc>> {
        self.toasts.next_deadline()
    }

    pub fn projection_input(&self) -> ProjectionInput {
        ProjectionInput {
            mode: self.mode,
            countdown: self.countdown.current(),
            completed_focus_count: self.snapshot.completed_focus_count,
            total_focus_seconds: self.snapshot.total_focus_seconds,
            tag: self
                .mode
                .is_active()
                .then(|| self.snapshot.tag.clone())
                .flatten(),
            suggested_next: self.suggested_next,
            command_in_flight: self.in_flight.is_some(),
            toast: self.toasts.visible().map(ToOwned::to_owned),
            tag_suggestions: self.suggestions.clone(),
        }
    }
}
