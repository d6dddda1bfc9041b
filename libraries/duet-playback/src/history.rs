//! Play history tracking
//!
//! Remembers when each track was last started and how often, for the smart
//! shuffle weighting. Entries expire after a retention window; expiry is
//! applied on every write rather than by a background sweep.

use duet_core::TrackId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Play statistics for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayHistoryEntry {
    /// Track this entry describes
    pub track_id: TrackId,

    /// When the track was last started (epoch milliseconds)
    pub last_played_at_ms: i64,

    /// Number of starts within the retention window (always >= 1)
    pub play_count: u32,
}

/// Read-only access to play statistics
///
/// The shuffle selector only needs lookups, so it works over anything that
/// can answer "what do we know about this track".
pub trait HistoryLookup {
    /// Entry for `track_id`, if the track was played within retention
    fn entry(&self, track_id: &TrackId) -> Option<&PlayHistoryEntry>;
}

impl HistoryLookup for [PlayHistoryEntry] {
    fn entry(&self, track_id: &TrackId) -> Option<&PlayHistoryEntry> {
        self.iter().find(|e| &e.track_id == track_id)
    }
}

impl HistoryLookup for Vec<PlayHistoryEntry> {
    fn entry(&self, track_id: &TrackId) -> Option<&PlayHistoryEntry> {
        self.as_slice().entry(track_id)
    }
}

/// Play history keyed by track
#[derive(Debug, Clone)]
pub struct PlayHistory {
    entries: HashMap<TrackId, PlayHistoryEntry>,

    /// Retention window in milliseconds
    retention_ms: i64,
}

/// Default retention: 7 days
pub const DEFAULT_RETENTION_MS: i64 = 7 * 24 * 60 * 60 * 1_000;

impl PlayHistory {
    /// Create an empty history with the given retention window
    pub fn new(retention_ms: i64) -> Self {
        Self {
            entries: HashMap::new(),
            retention_ms,
        }
    }

    /// Restore a persisted history
    ///
    /// Entries already past retention at `now_ms` are dropped. Duplicate ids
    /// keep the most recent entry.
    pub fn from_entries(
        entries: impl IntoIterator<Item = PlayHistoryEntry>,
        retention_ms: i64,
        now_ms: i64,
    ) -> Self {
        let mut history = Self::new(retention_ms);
        for entry in entries {
            let keep = history
                .entries
                .get(&entry.track_id)
                .map_or(true, |existing| existing.last_played_at_ms < entry.last_played_at_ms);
            if keep && entry.play_count > 0 {
                history.entries.insert(entry.track_id.clone(), entry);
            }
        }
        history.prune(now_ms);
        history
    }

    /// Record that `track_id` started playing at `now_ms`
    ///
    /// Increments the play count, stamps the time, then prunes every entry
    /// older than the retention window.
    pub fn record_play(&mut self, track_id: &TrackId, now_ms: i64) {
        let entry = self
            .entries
            .entry(track_id.clone())
            .or_insert_with(|| PlayHistoryEntry {
                track_id: track_id.clone(),
                last_played_at_ms: now_ms,
                play_count: 0,
            });
        entry.play_count = entry.play_count.saturating_add(1);
        entry.last_played_at_ms = entry.last_played_at_ms.max(now_ms);

        self.prune(now_ms);
    }

    /// Drop entries older than the retention window
    fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms.saturating_sub(self.retention_ms);
        self.entries.retain(|_, e| e.last_played_at_ms >= cutoff);
    }

    /// Entry for a track
    pub fn get(&self, track_id: &TrackId) -> Option<&PlayHistoryEntry> {
        self.entries.get(track_id)
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &PlayHistoryEntry> {
        self.entries.values()
    }

    /// Persistable snapshot, most recently played first
    pub fn to_entries(&self) -> Vec<PlayHistoryEntry> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.last_played_at_ms
                .cmp(&a.last_played_at_ms)
                .then_with(|| a.track_id.cmp(&b.track_id))
        });
        entries
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Retention window in milliseconds
    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_MS)
    }
}

impl HistoryLookup for PlayHistory {
    fn entry(&self, track_id: &TrackId) -> Option<&PlayHistoryEntry> {
        self.get(track_id)
    }
}
