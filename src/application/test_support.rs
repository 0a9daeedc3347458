use crate::domain::models::{DailyStat, SessionMode, SessionSnapshot, StatsPeriod, TagStat};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::session_api::SessionApi;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    StartFocus { duration_minutes: u32, tag: Option<String> },
    StartBreak { duration_minutes: u32, tag: Option<String> },
    Stop,
}

/// Scripted session service. Queued responses are consumed first; once a
/// queue is empty the fallback state (or `Ok(())`) is returned.
#[derive(Debug, Default)]
pub struct FakeSessionApi {
    states: Mutex<VecDeque<Result<SessionSnapshot, InfraError>>>,
    fallback_state: Mutex<SessionSnapshot>,
    command_results: Mutex<VecDeque<Result<(), InfraError>>>,
    recent_tags: Mutex<Vec<String>>,
    commands: Mutex<Vec<RecordedCommand>>,
    fetch_calls: AtomicUsize,
    hang_recent_tags: AtomicBool,
}

impl FakeSessionApi {
    pub fn push_state(&self, snapshot: SessionSnapshot) {
        self.states.lock().expect("states lock").push_back(Ok(snapshot));
    }

    pub fn push_state_error(&self, error: InfraError) {
        self.states.lock().expect("states lock").push_back(Err(error));
    }

    pub fn set_fallback_state(&self, snapshot: SessionSnapshot) {
        *self.fallback_state.lock().expect("fallback lock") = snapshot;
    }

    pub fn push_command_result(&self, result: Result<(), InfraError>) {
        self.command_results
            .lock()
            .expect("command results lock")
            .push_back(result);
    }

    pub fn set_recent_tags(&self, tags: &[&str]) {
        *self.recent_tags.lock().expect("tags lock") =
            tags.iter().map(|tag| tag.to_string()).collect();
    }

    /// Makes every later `recent_tags` call wait forever.
    pub fn hang_recent_tags(&self) {
        self.hang_recent_tags.store(true, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().expect("commands lock").clone()
    }

    fn next_command_result(&self, command: RecordedCommand) -> Result<(), InfraError> {
        self.commands.lock().expect("commands lock").push(command);
        self.command_results
            .lock()
            .expect("command results lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl SessionApi for FakeSessionApi {
    async fn fetch_state(&self) -> Result<SessionSnapshot, InfraError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.states.lock().expect("states lock").pop_front();
        queued.unwrap_or_else(|| Ok(self.fallback_state.lock().expect("fallback lock").clone()))
    }

    async fn start_focus(&self, duration_minutes: u32, tag: Option<&str>) -> Result<(), InfraError> {
        self.next_command_result(RecordedCommand::StartFocus {
            duration_minutes,
            tag: tag.map(ToOwned::to_owned),
        })
    }

    async fn start_break(&self, duration_minutes: u32, tag: Option<&str>) -> Result<(), InfraError> {
        self.next_command_result(RecordedCommand::StartBreak {
            duration_minutes,
            tag: tag.map(ToOwned::to_owned),
        })
    }

    async fn stop(&self) -> Result<(), InfraError> {
        self.next_command_result(RecordedCommand::Stop)
    }

    async fn recent_tags(&self, limit: Option<u32>) -> Result<Vec<String>, InfraError> {
        if self.hang_recent_tags.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let tags = self.recent_tags.lock().expect("tags lock").clone();
        let limit = limit.map(|limit| limit as usize).unwrap_or(tags.len());
        Ok(tags.into_iter().take(limit).collect())
    }

    async fn stats_by_tag(&self) -> Result<Vec<TagStat>, InfraError> {
        Ok(Vec::new())
    }

    async fn daily_stats(&self, _period: StatsPeriod) -> Result<Vec<DailyStat>, InfraError> {
        Ok(Vec::new())
    }
}

pub fn active_snapshot(mode: SessionMode, remaining_seconds: u32, planned_duration_seconds: u32) -> SessionSnapshot {
    SessionSnapshot {
        mode,
        remaining_seconds,
        planned_duration_seconds,
        ..SessionSnapshot::default()
    }
}

pub fn idle_snapshot(completed_focus_count: u32, total_focus_seconds: u64) -> SessionSnapshot {
    SessionSnapshot {
        completed_focus_count,
        total_focus_seconds,
        ..SessionSnapshot::default()
    }
}
