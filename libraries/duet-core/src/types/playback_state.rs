/// Playback state types shared between surfaces
use crate::error::CoreError;
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Repeat mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,
    /// Loop entire queue
    All,
    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

impl FromStr for RepeatMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "all" => Ok(Self::All),
            "one" => Ok(Self::One),
            other => Err(CoreError::parse("repeat mode", other)),
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Live playback state of one surface
///
/// Each surface owns its snapshot. Remote surfaces only ever see it through
/// sync events and treat those as suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Whether audio is currently playing
    pub is_playing: bool,

    /// Position within the current track
    pub current_time: Duration,

    /// Volume in `[0.0, 1.0]`
    pub volume: f64,

    /// Current track (if any)
    pub current_track: Option<TrackId>,

    /// Duration of the current track
    pub duration: Duration,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: Duration::ZERO,
            volume: 1.0,
            current_track: None,
            duration: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_parses_its_own_display() {
        for mode in [RepeatMode::Off, RepeatMode::All, RepeatMode::One] {
            assert_eq!(mode.to_string().parse::<RepeatMode>().unwrap(), mode);
        }
        assert!("sometimes".parse::<RepeatMode>().is_err());
    }

    #[test]
    fn repeat_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RepeatMode::All).unwrap(), "\"all\"");
    }

    #[test]
    fn default_snapshot_is_idle_full_volume() {
        let snapshot = PlaybackSnapshot::default();
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.volume, 1.0);
        assert!(snapshot.current_track.is_none());
    }
}
