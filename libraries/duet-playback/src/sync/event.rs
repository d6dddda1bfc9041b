//! Sync Events
//!
//! Messages exchanged between surfaces. One variant per kind, each carrying
//! only the payload that kind needs.

use duet_core::{SurfaceId, TrackId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playback change announced by one surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncEvent {
    /// Playback started or resumed
    Play,

    /// Playback paused
    Pause,

    /// User skipped forward
    Next,

    /// User skipped back
    Previous,

    /// Position moved by more than normal playback would explain
    Seek {
        /// New position within the current track
        time: Duration,
    },

    /// Volume changed
    Volume {
        /// New volume in `[0.0, 1.0]`
        volume: f64,
    },

    /// A different track (or a different duration for it) became current
    Track {
        /// ID of the new current track
        track_id: TrackId,
        /// Duration of the new current track
        duration: Duration,
    },
}

impl SyncEvent {
    /// Short name of the event kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Seek { .. } => "seek",
            Self::Volume { .. } => "volume",
            Self::Track { .. } => "track",
        }
    }
}

/// A sync event tagged with the surface that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    /// Surface the change originated on
    pub origin: SurfaceId,

    /// The change itself
    pub event: SyncEvent,
}

impl SyncMessage {
    /// Create a message
    pub fn new(origin: SurfaceId, event: SyncEvent) -> Self {
        Self { origin, event }
    }

    /// Encode for string-based channels
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a string-based channel
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_tagged_by_kind() {
        let message = SyncMessage::new(SurfaceId::pip(), SyncEvent::Volume { volume: 0.5 });
        let json = message.to_json().unwrap();
        assert!(json.contains("\"kind\":\"volume\""), "{json}");
        assert!(json.contains("\"origin\":\"pip\""), "{json}");
        assert_eq!(SyncMessage::from_json(&json).unwrap(), message);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{"origin":"main","event":{"kind":"rewind"}}"#;
        assert!(SyncMessage::from_json(json).is_err());
    }

    #[test]
    fn kind_names_match_wire_tags() {
        let events = [
            SyncEvent::Play,
            SyncEvent::Pause,
            SyncEvent::Next,
            SyncEvent::Previous,
            SyncEvent::Seek { time: Duration::from_secs(3) },
            SyncEvent::Volume { volume: 0.1 },
            SyncEvent::Track {
                track_id: TrackId::new("a"),
                duration: Duration::from_secs(60),
            },
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            assert!(json.contains(&format!("\"kind\":\"{}\"", event.kind())), "{json}");
        }
    }
}
