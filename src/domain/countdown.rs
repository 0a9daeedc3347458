use crate::domain::NowProvider;
use crate::domain::models::{LocalCountdownState, SessionMode};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to count: idle, or already at zero.
    Idle,
    Running { remaining_seconds: u32 },
    /// This tick moved the countdown to zero. Emitted once per reset.
    Expired,
}

/// Local prediction of the remaining time between authoritative polls.
///
/// Each tick removes one second, clamped by the wall-clock deadline captured
/// at `reset` so suspended or late ticks do not accumulate drift.
pub struct CountdownEngine {
    state: LocalCountdownState,
    deadline: Option<DateTime<Utc>>,
    now_provider: NowProvider,
}

impl Default for CountdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownEngine {
    pub fn new() -> Self {
        Self {
            state: LocalCountdownState::default(),
            deadline: None,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn reset(&mut self, remaining_seconds: u32, planned_duration_seconds: u32, mode: SessionMode) {
        self.state = LocalCountdownState {
            mode,
            remaining_seconds,
            planned_duration_seconds,
            ticks: 0,
        };
        self.deadline = mode
            .is_active()
            .then(|| (self.now_provider)() + Duration::seconds(i64::from(remaining_seconds)));
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_counting() {
            return TickOutcome::Idle;
        }

        let mut next = self.state.remaining_seconds - 1;
        if let Some(deadline) = self.deadline {
            next = next.min(seconds_until(deadline, (self.now_provider)()));
        }
        self.state.remaining_seconds = next;
        self.state.ticks = self.state.ticks.saturating_add(1);

        if next == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining_seconds: next,
            }
        }
    }

    pub fn current(&self) -> LocalCountdownState {
        self.state
    }

    pub fn is_counting(&self) -> bool {
        self.state.mode.is_active() && self.state.remaining_seconds > 0
    }
}

fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    u32::try_from((millis + 999) / 1000).unwrap_or(u32::MAX)
}
