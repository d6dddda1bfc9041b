//! Playback engine - per-surface orchestration
//!
//! Owns the queue, the current position, shuffle and repeat flags, the play
//! history and the next-track cache. This is the one object a surface's UI
//! talks to for "what plays next" and "a track started".

use crate::config::EngineConfig;
use crate::history::{PlayHistory, PlayHistoryEntry};
use crate::next_track::{InvalidationReason, NextTrack, NextTrackCache, NextTrackContext};
use crate::shuffle::ShuffleSelector;
use duet_core::{RepeatMode, SharedClock, Track, TrackId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

/// What moved playback to another track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    /// User pressed next
    Skip,

    /// Crossfade timer started the next track
    Crossfade,

    /// Current track played to the end
    TrackEnded,
}

/// Per-surface playback state
#[derive(Debug)]
pub struct PlaybackEngine {
    queue: Vec<Arc<Track>>,
    current_index: Option<usize>,
    queue_generation: u64,
    shuffle: bool,
    repeat: RepeatMode,
    history: PlayHistory,
    cache: NextTrackCache,
    clock: SharedClock,
    rng: StdRng,
}

impl PlaybackEngine {
    /// Create an engine with an entropy-seeded shuffle source
    pub fn new(config: &EngineConfig, clock: SharedClock) -> Self {
        Self::with_rng(config, clock, StdRng::from_entropy())
    }

    /// Create an engine with a reproducible shuffle sequence
    pub fn with_seed(config: &EngineConfig, clock: SharedClock, seed: u64) -> Self {
        Self::with_rng(config, clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &EngineConfig, clock: SharedClock, rng: StdRng) -> Self {
        let selector = ShuffleSelector::new(config.shuffle.clone());
        Self {
            queue: Vec::new(),
            current_index: None,
            queue_generation: 0,
            shuffle: false,
            repeat: RepeatMode::Off,
            history: PlayHistory::new(config.history.retention_ms()),
            cache: NextTrackCache::new(&config.cache, selector, Arc::clone(&clock)),
            clock,
            rng,
        }
    }

    // ===== Queue Management =====

    /// Replace the queue and start at `start`
    ///
    /// Returns the new current track. An out-of-range `start` leaves nothing
    /// current; the next track is then the head of the queue.
    pub fn set_queue(&mut self, tracks: Vec<Arc<Track>>, start: Option<usize>) -> Option<Arc<Track>> {
        self.queue = tracks;
        self.queue_generation += 1;
        self.current_index = start.filter(|&i| i < self.queue.len());
        self.cache.invalidate_for(InvalidationReason::QueueReplaced);

        let current = self.current().cloned();
        if let Some(track) = &current {
            self.record_play(&track.id);
        }
        debug!(len = self.queue.len(), current = current.as_ref().map(|t| t.id.as_str()), "Queue replaced");
        current
    }

    /// Add tracks to the end of the queue
    pub fn append_to_queue(&mut self, tracks: Vec<Arc<Track>>) {
        if tracks.is_empty() {
            return;
        }
        self.queue.extend(tracks);
        self.queue_generation += 1;
        self.cache.invalidate_for(InvalidationReason::QueueEdited);
    }

    /// Remove the track at `index`
    ///
    /// The current track can't be removed; `None` is returned for it and for
    /// out-of-range indices.
    pub fn remove_from_queue(&mut self, index: usize) -> Option<Arc<Track>> {
        if index >= self.queue.len() || Some(index) == self.current_index {
            return None;
        }

        let removed = self.queue.remove(index);
        if let Some(current) = self.current_index {
            if index < current {
                self.current_index = Some(current - 1);
            }
        }
        self.queue_generation += 1;
        self.cache.invalidate_for(InvalidationReason::QueueEdited);
        Some(removed)
    }

    /// Tracks in play order
    pub fn queue(&self) -> &[Arc<Track>] {
        &self.queue
    }

    /// Bumped on every queue change
    pub fn queue_generation(&self) -> u64 {
        self.queue_generation
    }

    /// Currently playing track
    pub fn current(&self) -> Option<&Arc<Track>> {
        self.current_index.and_then(|i| self.queue.get(i))
    }

    /// Position of the current track in the queue
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    // ===== Modes =====

    /// Switch smart shuffle on or off
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle != enabled {
            self.shuffle = enabled;
            self.cache.invalidate_for(InvalidationReason::ShuffleToggled);
        }
    }

    /// Whether smart shuffle is on
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Change what happens at the end of the queue
    pub fn set_repeat(&mut self, mode: RepeatMode) {
        if self.repeat != mode {
            self.repeat = mode;
            self.cache.invalidate_for(InvalidationReason::RepeatChanged);
        }
    }

    /// Current repeat mode
    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    // ===== Navigation =====

    /// Track that plays after the current one
    ///
    /// Reads through the cache: the skip button and the crossfade timer get
    /// the same answer until something invalidates it.
    pub fn next_track(&mut self) -> Option<Arc<Track>> {
        self.resolve_next().map(|next| next.track)
    }

    fn resolve_next(&mut self) -> Option<NextTrack> {
        let ctx = NextTrackContext {
            queue: &self.queue,
            current_index: self.current_index,
            queue_generation: self.queue_generation,
            shuffle: self.shuffle,
            repeat: self.repeat,
        };
        self.cache.resolve_next(&ctx, &self.history, &mut self.rng)
    }

    /// Move to the next track
    ///
    /// With [`RepeatMode::One`], a track that ends on its own is replayed;
    /// skips and crossfades still move on. Returns the new current track, or
    /// `None` at the end of the queue (the current track is kept).
    pub fn advance(&mut self, cause: AdvanceCause) -> Option<Arc<Track>> {
        if cause == AdvanceCause::TrackEnded && self.repeat == RepeatMode::One {
            if let Some(current) = self.current().cloned() {
                debug!(track = current.id.as_str(), "Repeating current track");
                self.record_play(&current.id);
                return Some(current);
            }
        }

        let Some(NextTrack { track, index }) = self.resolve_next() else {
            debug!(?cause, "End of queue");
            return None;
        };

        self.move_to(Some(index));
        debug!(?cause, track = track.id.as_str(), index, "Advanced");
        Some(track)
    }

    /// Move to the track before the current one
    ///
    /// Wraps to the end of the queue with [`RepeatMode::All`].
    pub fn previous(&mut self) -> Option<Arc<Track>> {
        let index = match self.current_index? {
            0 if self.repeat == RepeatMode::All => self.queue.len().checked_sub(1)?,
            0 => return None,
            i => i - 1,
        };
        self.move_to(Some(index));
        self.current().cloned()
    }

    /// Jump straight to the track at `index`
    pub fn jump_to(&mut self, index: usize) -> Option<Arc<Track>> {
        if index >= self.queue.len() {
            return None;
        }
        self.move_to(Some(index));
        self.current().cloned()
    }

    fn move_to(&mut self, index: Option<usize>) {
        self.current_index = index;
        self.cache.invalidate_for(InvalidationReason::TrackChanged);
        if let Some(id) = self.current().map(|t| t.id.clone()) {
            self.record_play(&id);
        }
    }

    // ===== History =====

    /// Record that `track_id` started playing now
    pub fn record_play(&mut self, track_id: &TrackId) {
        let now_ms = self.clock.now_ms();
        self.history.record_play(track_id, now_ms);
    }

    /// Play history feeding smart shuffle
    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    /// Replace the history with a persisted one
    pub fn restore_history(&mut self, entries: Vec<PlayHistoryEntry>) {
        let now_ms = self.clock.now_ms();
        self.history = PlayHistory::from_entries(entries, self.history.retention_ms(), now_ms);
        self.cache.invalidate_for(InvalidationReason::QueueEdited);
    }

    // ===== Cache =====

    /// Invalidate the next-track cache for `reason`
    ///
    /// Returns whether the cache was cleared (unforced reasons are
    /// throttled).
    pub fn invalidate(&mut self, reason: InvalidationReason) -> bool {
        self.cache.invalidate_for(reason)
    }

    /// Next-track cache, for inspection
    pub fn cache(&self) -> &NextTrackCache {
        &self.cache
    }

    /// Release cached state when the surface goes away
    pub fn teardown(&mut self) {
        self.cache.invalidate_for(InvalidationReason::Teardown);
        self.cache.reset();
        info!("Playback engine torn down");
    }
}
