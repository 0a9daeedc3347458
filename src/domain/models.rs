use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 240;
pub const MAX_TAG_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Idle,
    Focus,
    Break,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Focus => "focus",
            Self::Break => "break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "idle" => Some(Self::Idle),
            "focus" => Some(Self::Focus),
            "break" => Some(Self::Break),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative session state as reported by the server.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub remaining_seconds: u32,
    pub planned_duration_seconds: u32,
    pub completed_focus_count: u32,
    pub total_focus_seconds: u64,
    pub tag: Option<String>,
    pub cycle_count: u32,
    pub suggest_long_break: bool,
}

/// Client-side interpolation of the last authoritative snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalCountdownState {
    pub mode: SessionMode,
    pub remaining_seconds: u32,
    pub planned_duration_seconds: u32,
    pub ticks: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresetId {
    #[default]
    Default,
    Long,
    Short,
}

impl PresetId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            _ => None,
        }
    }

    pub fn preset(self) -> Preset {
        match self {
            Self::Default => Preset {
                focus_minutes: 25,
                break_minutes: 5,
            },
            Self::Long => Preset {
                focus_minutes: 50,
                break_minutes: 10,
            },
            Self::Short => Preset {
                focus_minutes: 15,
                break_minutes: 3,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preset {
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

impl Default for Preset {
    fn default() -> Self {
        PresetId::Default.preset()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagStat {
    pub tag: String,
    pub completed_focus_count: u32,
    pub total_focus_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyStat {
    pub date: String,
    pub focus_count: u32,
    pub total_seconds: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Weekly,
    Monthly,
}

impl StatsPeriod {
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

pub fn validate_duration(duration_minutes: u32) -> Result<(), String> {
    if duration_minutes < MIN_DURATION_MINUTES {
        return Err(format!(
            "Duration must be at least {MIN_DURATION_MINUTES} minute(s)"
        ));
    }
    if duration_minutes > MAX_DURATION_MINUTES {
        return Err(format!(
            "Duration must be at most {MAX_DURATION_MINUTES} minutes"
        ));
    }
    Ok(())
}

/// Trims a user-supplied tag. Blank tags become `None`; overlong tags are an
/// error.
pub fn normalize_tag(tag: Option<&str>) -> Result<Option<String>, String> {
    let Some(tag) = tag.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if tag.chars().count() > MAX_TAG_CHARS {
        return Err(format!("Tag must be at most {MAX_TAG_CHARS} characters"));
    }
    Ok(Some(tag.to_string()))
}
