use crate::domain::NowProvider;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ToastPhase {
    Hidden,
    Visible {
        message: String,
        dismiss_at: DateTime<Utc>,
    },
    /// Dismissed but still within the exit window; the message still counts
    /// as a duplicate until `clear_at`.
    Cooling {
        message: String,
        clear_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Shown,
    Duplicate,
}

/// Transient, auto-dismissing message surface with de-duplication.
pub struct ToastNotifier {
    phase: ToastPhase,
    visible_for: Duration,
    cooldown: Duration,
    timers_armed: u64,
    now_provider: NowProvider,
}

impl ToastNotifier {
    pub fn new(visible_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            phase: ToastPhase::Hidden,
            visible_for: millis(visible_ms),
            cooldown: millis(cooldown_ms),
            timers_armed: 0,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn show(&mut self, message: &str) -> ShowOutcome {
        let now = (self.now_provider)();
        self.advance_to(now);

        let duplicate = match &self.phase {
            ToastPhase::Visible { message: current, .. } | ToastPhase::Cooling { message: current, .. } => {
                current == message
            }
            ToastPhase::Hidden => false,
        };
        if duplicate {
            return ShowOutcome::Duplicate;
        }

        self.phase = ToastPhase::Visible {
            message: message.to_string(),
            dismiss_at: now + self.visible_for,
        };
        self.timers_armed = self.timers_armed.saturating_add(1);
        ShowOutcome::Shown
    }

    /// Applies any dismissal or cooldown expiry that is due.
    pub fn advance(&mut self) {
        let now = (self.now_provider)();
        self.advance_to(now);
    }

    pub fn visible(&self) -> Option<&str> {
        match &self.phase {
            ToastPhase::Visible { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// When the next phase change is due, if any.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            ToastPhase::Hidden => None,
            ToastPhase::Visible { dismiss_at, .. } => Some(*dismiss_at),
            ToastPhase::Cooling { clear_at, .. } => Some(*clear_at),
        }
    }

    /// Number of dismiss timers armed since construction.
    pub fn timers_armed(&self) -> u64 {
        self.timers_armed
    }

    fn advance_to(&mut self, now: DateTime<Utc>) {
        if let ToastPhase::Visible { message, dismiss_at } = &self.phase {
            if now >= *dismiss_at {
                let cooling = ToastPhase::Cooling {
                    message: message.clone(),
                    clear_at: *dismiss_at + self.cooldown,
                };
                self.phase = cooling;
            }
        }
        if let ToastPhase::Cooling { clear_at, .. } = &self.phase {
            if now >= *clear_at {
                self.phase = ToastPhase::Hidden;
            }
        }
    }
}

fn millis(value: u64) -> Duration {
    Duration::milliseconds(i64::try_from(value).unwrap_or(i64::MAX / 2))
}
