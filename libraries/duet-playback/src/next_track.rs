//! Next-track cache
//!
//! Holds the single pre-computed answer to "what plays next". The crossfade
//! timer and the skip button both read through here, so they resolve to the
//! same track even under shuffle, where two independent computations would
//! make two different random draws.
//!
//! The cached answer is tagged with the [`CacheKey`] it was computed for. A
//! read with a different key recomputes, so a throttled invalidation can
//! delay a redraw but never serve an answer for a different queue or track.

use crate::config::CacheConfig;
use crate::history::HistoryLookup;
use crate::shuffle::{pick_uniform, ShuffleSelector};
use duet_core::{RepeatMode, SharedClock, Track, TrackId};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Why the cache is being invalidated
///
/// Decides whether the invalidation bypasses the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The whole queue was replaced
    QueueReplaced,
    /// A different track became current
    TrackChanged,
    /// Player shutdown
    Teardown,
    /// Shuffle switched on or off
    ShuffleToggled,
    /// Repeat mode changed
    RepeatChanged,
    /// Tracks appended, removed or reordered
    QueueEdited,
}

impl InvalidationReason {
    /// Whether this reason bypasses the throttle
    pub fn forces(self) -> bool {
        match self {
            Self::QueueReplaced | Self::TrackChanged | Self::Teardown => true,
            Self::ShuffleToggled | Self::RepeatChanged | Self::QueueEdited => false,
        }
    }
}

/// Playback state a cached answer was computed for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Id of the current track
    pub current: Option<TrackId>,
    /// Position of the current track; tells repeated copies apart
    pub current_index: Option<usize>,
    /// Shuffle flag
    pub shuffle: bool,
    /// Repeat mode
    pub repeat: RepeatMode,
    /// Queue generation
    pub queue_generation: u64,
}

/// A resolved next track and its position in the queue
#[derive(Debug, Clone)]
pub struct NextTrack {
    /// The track itself, shared with the queue
    pub track: Arc<Track>,
    /// Where it sits in the queue the answer was computed for
    pub index: usize,
}

/// Inputs to a next-track computation
#[derive(Debug, Clone, Copy)]
pub struct NextTrackContext<'a> {
    /// Queue in play order
    pub queue: &'a [Arc<Track>],

    /// Position of the current track in `queue`
    pub current_index: Option<usize>,

    /// Bumped whenever the queue changes
    pub queue_generation: u64,

    /// Pick by smart shuffle instead of queue order
    pub shuffle: bool,

    /// What happens at the end of the queue
    pub repeat: RepeatMode,
}

impl<'a> NextTrackContext<'a> {
    /// Build a context from the current track rather than its index
    ///
    /// The index is resolved by track id; a current track that is not in
    /// the queue is treated as "nothing playing".
    pub fn for_track(
        queue: &'a [Arc<Track>],
        current: Option<&Arc<Track>>,
        queue_generation: u64,
        shuffle: bool,
        repeat: RepeatMode,
    ) -> Self {
        let current_index = current.and_then(|c| queue.iter().position(|t| t.id == c.id));
        Self {
            queue,
            current_index,
            queue_generation,
            shuffle,
            repeat,
        }
    }

    /// Current track, if any
    pub fn current(&self) -> Option<&'a Arc<Track>> {
        self.current_index.and_then(|i| self.queue.get(i))
    }

    /// Key identifying this state
    pub fn key(&self) -> CacheKey {
        CacheKey {
            current: self.current().map(|t| t.id.clone()),
            current_index: self.current_index,
            shuffle: self.shuffle,
            repeat: self.repeat,
            queue_generation: self.queue_generation,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedNext {
    next: Option<NextTrack>,
    key: CacheKey,
}

/// Single-entry cache of the next track
#[derive(Debug)]
pub struct NextTrackCache {
    entry: Option<CachedNext>,
    valid: bool,
    last_invalidation_ms: Option<i64>,
    throttle_ms: i64,
    selector: ShuffleSelector,
    clock: SharedClock,
}

impl NextTrackCache {
    /// Create an empty (invalid) cache
    pub fn new(config: &CacheConfig, selector: ShuffleSelector, clock: SharedClock) -> Self {
        Self {
            entry: None,
            valid: false,
            last_invalidation_ms: None,
            throttle_ms: config.invalidation_throttle_ms as i64,
            selector,
            clock,
        }
    }

    /// Next track for `ctx`, computing and caching it if needed
    ///
    /// Two reads without an effective invalidation in between return the
    /// same `Arc`.
    pub fn get_next<H, R>(
        &mut self,
        ctx: &NextTrackContext<'_>,
        history: &H,
        rng: &mut R,
    ) -> Option<Arc<Track>>
    where
        H: HistoryLookup + ?Sized,
        R: Rng + ?Sized,
    {
        self.resolve_next(ctx, history, rng).map(|next| next.track)
    }

    /// Like [`get_next`](Self::get_next), also reporting the queue position
    ///
    /// Advancing must use this position: a track queued twice resolves to
    /// the copy after the current one, not the first copy.
    pub fn resolve_next<H, R>(
        &mut self,
        ctx: &NextTrackContext<'_>,
        history: &H,
        rng: &mut R,
    ) -> Option<NextTrack>
    where
        H: HistoryLookup + ?Sized,
        R: Rng + ?Sized,
    {
        let key = ctx.key();

        if self.valid {
            if let Some(cached) = self.entry.as_ref().filter(|c| c.key == key) {
                return cached.next.clone();
            }
            debug!("Next-track cache key changed, recomputing");
        }

        let next = self.compute(ctx, history, rng);
        debug!(
            next = next.as_ref().map(|n| n.track.id.as_str()),
            index = next.as_ref().map(|n| n.index),
            shuffle = ctx.shuffle,
            repeat = %ctx.repeat,
            "Computed next track"
        );

        self.entry = Some(CachedNext {
            next: next.clone(),
            key,
        });
        self.valid = true;
        next
    }

    fn compute<H, R>(&self, ctx: &NextTrackContext<'_>, history: &H, rng: &mut R) -> Option<NextTrack>
    where
        H: HistoryLookup + ?Sized,
        R: Rng + ?Sized,
    {
        if ctx.shuffle {
            let current_id = ctx.current().map(|t| &t.id);
            let now_ms = self.clock.now_ms();
            let track = self
                .selector
                .select_next(ctx.queue, current_id, history, now_ms, rng)
                .or_else(|| pick_uniform(ctx.queue, current_id, rng))?;
            let index = ctx
                .queue
                .iter()
                .position(|t| Arc::ptr_eq(t, &track))
                .or_else(|| ctx.queue.iter().position(|t| t.id == track.id))?;
            return Some(NextTrack { track, index });
        }

        let index = match ctx.current_index {
            None => 0,
            Some(i) if i + 1 < ctx.queue.len() => i + 1,
            Some(_) if ctx.repeat == RepeatMode::All => 0,
            Some(_) => return None,
        };
        let track = ctx.queue.get(index).cloned()?;
        Some(NextTrack { track, index })
    }

    /// Invalidate the cached answer
    ///
    /// Unforced calls within the throttle interval of the previous effective
    /// invalidation are ignored. Returns whether the cache was cleared.
    pub fn invalidate(&mut self, force: bool) -> bool {
        let now_ms = self.clock.now_ms();

        if !force {
            if let Some(last) = self.last_invalidation_ms {
                if now_ms.saturating_sub(last) < self.throttle_ms {
                    debug!("Next-track invalidation throttled");
                    return false;
                }
            }
        }

        self.last_invalidation_ms = Some(now_ms);
        self.entry = None;
        self.valid = false;
        true
    }

    /// Invalidate with the throttle policy of `reason`
    pub fn invalidate_for(&mut self, reason: InvalidationReason) -> bool {
        debug!(?reason, "Invalidating next-track cache");
        self.invalidate(reason.forces())
    }

    /// Drop everything, including throttle state
    pub fn reset(&mut self) {
        self.entry = None;
        self.valid = false;
        self.last_invalidation_ms = None;
    }

    /// Whether a computed answer is held
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Cached answer without computing
    ///
    /// `None` when the cache is invalid; `Some(None)` when the cached answer
    /// is "nothing plays next".
    pub fn peek(&self) -> Option<Option<&Arc<Track>>> {
        if !self.valid {
            return None;
        }
        self.entry.as_ref().map(|c| c.next.as_ref().map(|n| &n.track))
    }
}
