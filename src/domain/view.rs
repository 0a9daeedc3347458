use crate::domain::models::{LocalCountdownState, SessionMode};

pub const RING_CIRCUMFERENCE: f64 = 754.0;

const FOCUS_COLOR: &str = "#667eea";
const BREAK_COLOR: &str = "#48bb78";
const IDLE_COLOR: &str = "#cbd5e0";

/// Everything the projector needs, captured from the controller at one point
/// in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectionInput {
    pub mode: SessionMode,
    pub countdown: LocalCountdownState,
    pub completed_focus_count: u32,
    pub total_focus_seconds: u64,
    pub tag: Option<String>,
    /// Which start control is offered while idle.
    pub suggested_next: SessionMode,
    pub command_in_flight: bool,
    pub toast: Option<String>,
    /// Local tags first, then server tags, de-duplicated.
    pub tag_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub status_label: &'static str,
    pub accent_color: &'static str,
    pub start_enabled: bool,
    pub break_enabled: bool,
    pub stop_enabled: bool,
    pub remaining_text: String,
    pub progress_ratio: f64,
    pub ring_offset: f64,
    pub completed_count_text: String,
    pub total_focus_text: String,
    pub tag: Option<String>,
    pub toast: Option<String>,
    pub tag_suggestions: Vec<String>,
}

pub trait RenderSurface: Send {
    fn render(&mut self, view: &ViewModel);
}

pub fn project(input: &ProjectionInput) -> ViewModel {
    let (status_label, accent_color) = match input.mode {
        SessionMode::Focus => ("Focus", FOCUS_COLOR),
        SessionMode::Break => ("Break", BREAK_COLOR),
        SessionMode::Idle => ("Ready", IDLE_COLOR),
    };

    let idle = input.mode == SessionMode::Idle;
    let controls_free = !input.command_in_flight;
    let offer_break = input.suggested_next == SessionMode::Break;
    let progress_ratio = progress_ratio(
        input.countdown.planned_duration_seconds,
        input.countdown.remaining_seconds,
    );

    ViewModel {
        status_label,
        accent_color,
        start_enabled: controls_free && idle && !offer_break,
        break_enabled: controls_free && idle && offer_break,
        stop_enabled: controls_free && !idle,
        remaining_text: format_remaining(input.countdown.remaining_seconds),
        progress_ratio,
        ring_offset: RING_CIRCUMFERENCE * (1.0 - progress_ratio),
        completed_count_text: input.completed_focus_count.to_string(),
        total_focus_text: format_focus_total(input.total_focus_seconds),
        tag: input.tag.clone(),
        toast: input.toast.clone(),
        tag_suggestions: input.tag_suggestions.clone(),
    }
}

pub fn progress_ratio(planned_seconds: u32, remaining_seconds: u32) -> f64 {
    if planned_seconds == 0 {
        return 0.0;
    }
    let planned = f64::from(planned_seconds);
    ((planned - f64::from(remaining_seconds)) / planned).clamp(0.0, 1.0)
}

pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_focus_total(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Writes projected views to a surface, skipping writes when nothing changed.
pub struct UiProjector<S: RenderSurface> {
    surface: S,
    last: Option<ViewModel>,
}

impl<S: RenderSurface> UiProjector<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, last: None }
    }

    /// Returns whether the surface was written.
    pub fn render(&mut self, input: &ProjectionInput) -> bool {
        let view = project(input);
        if self.last.as_ref() == Some(&view) {
            return false;
        }
        self.surface.render(&view);
        self.last = Some(view);
        true
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Default)]
    struct CountingSurface {
        writes: Vec<ViewModel>,
    }

    impl RenderSurface for CountingSurface {
        fn render(&mut self, view: &ViewModel) {
            self.writes.push(view.clone());
        }
    }

    fn running_focus(remaining: u32) -> ProjectionInput {
        ProjectionInput {
            mode: SessionMode::Focus,
            countdown: LocalCountdownState {
                mode: SessionMode::Focus,
                remaining_seconds: remaining,
                planned_duration_seconds: 1500,
                ticks: 0,
            },
            suggested_next: SessionMode::Focus,
            ..ProjectionInput::default()
        }
    }

    #[test]
    fn remaining_text_pads_seconds() {
        assert_eq!(format_remaining(1500), "25:00");
        assert_eq!(format_remaining(65), "1:05");
        assert_eq!(format_remaining(0), "0:00");
    }

    #[test]
    fn focus_total_switches_to_hours() {
        assert_eq!(format_focus_total(0), "0m");
        assert_eq!(format_focus_total(25 * 60), "25m");
        assert_eq!(format_focus_total(3600 + 5 * 60), "1h 5m");
    }

    #[test]
    fn idle_offers_exactly_one_start_control() {
        let mut input = ProjectionInput::default();
        let view = project(&input);
        assert!(view.start_enabled);
        assert!(!view.break_enabled);
        assert!(!view.stop_enabled);
        assert_eq!(view.accent_color, IDLE_COLOR);

        input.suggested_next = SessionMode::Break;
        let view = project(&input);
        assert!(!view.start_enabled);
        assert!(view.break_enabled);
    }

    #[test]
    fn active_session_enables_only_stop() {
        let view = project(&running_focus(600));
        assert!(!view.start_enabled);
        assert!(!view.break_enabled);
        assert!(view.stop_enabled);
        assert_eq!(view.status_label, "Focus");
        assert_eq!(view.remaining_text, "10:00");
        assert!((view.progress_ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn in_flight_command_disables_controls() {
        let mut input = running_focus(600);
        input.command_in_flight = true;
        let view = project(&input);
        assert!(!view.stop_enabled);
    }

    #[test]
    fn progress_is_zero_at_start_and_one_at_end() {
        assert_eq!(progress_ratio(1500, 1500), 0.0);
        assert_eq!(progress_ratio(1500, 0), 1.0);
        assert_eq!(progress_ratio(0, 0), 0.0);
        assert_eq!(progress_ratio(300, 900), 0.0);
    }

    #[test]
    fn projector_skips_identical_views() {
        let mut projector = UiProjector::new(CountingSurface::default());
        assert!(projector.render(&running_focus(600)));
        assert!(!projector.render(&running_focus(600)));
        assert!(projector.render(&running_focus(599)));
        assert_eq!(projector.surface().writes.len(), 2);
    }

    proptest! {
        #[test]
        fn progress_ratio_stays_in_unit_interval(planned in 0u32..20_000, remaining in 0u32..20_000) {
            let ratio = progress_ratio(planned, remaining);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
