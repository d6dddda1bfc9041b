/// Track domain type
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audio track as handed over by the library collaborator
///
/// Immutable from the engine's point of view. Engines hold tracks behind
/// `Arc` so "the same track" can be checked by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Track duration
    pub duration: Duration,

    /// Where the audio lives: a playable URL, or an internal storage
    /// reference that still has to be resolved to a blob URL
    pub source: String,
}

impl Track {
    /// Create a new track with an internal storage reference as source
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let id = id.into();
        let source = format!("indexeddb://tracks/{}", id);
        Self {
            id,
            title: title.into(),
            artist: artist.into(),
            duration,
            source,
        }
    }

    /// Replace the source reference
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}
