//! Smart shuffle selection
//!
//! Picks the next track under shuffle with a weighted draw instead of a
//! uniform one. Weights penalise tracks that were played recently (strongly,
//! decaying over a few hours) and tracks with high play counts (mildly).
//!
//! Algorithm:
//! 1. Drop the excluded (current) track
//! 2. Small collections: drop anything played inside the anti-repeat window,
//!    falling back to the least recently played candidate
//! 3. Weight each candidate from its play history
//! 4. Roulette-wheel draw over the cumulative weights
//!
//! The selector holds no state besides its configuration. Time and
//! randomness are passed in, so a seeded RNG gives reproducible picks.

use crate::config::ShuffleConfig;
use crate::history::{HistoryLookup, PlayHistoryEntry};
use duet_core::{Track, TrackId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

const HOUR_MS: f64 = 60.0 * 60.0 * 1_000.0;

/// Plays older than this carry no recency penalty at all
const RECENCY_HORIZON_HOURS: f64 = 24.0;

/// Recency penalty halves for every hour short of this
const DECAY_FREE_AFTER_HOURS: f64 = 4.0;

/// Weight lost per recorded play
const PLAY_COUNT_PENALTY: f64 = 0.1;

/// Frequency alone never scales a weight below this
const MIN_FREQUENCY_FACTOR: f64 = 0.3;

/// Weighted next-track selector
#[derive(Debug, Clone, Default)]
pub struct ShuffleSelector {
    config: ShuffleConfig,
}

impl ShuffleSelector {
    /// Create a selector with the given tuning
    pub fn new(config: ShuffleConfig) -> Self {
        Self { config }
    }

    /// Selector tuning
    pub fn config(&self) -> &ShuffleConfig {
        &self.config
    }

    /// Choose the next track from `candidates`
    ///
    /// `candidates` is the whole source collection; `exclude` (normally the
    /// current track) is removed before anything else. Returns `None` only
    /// when nothing is left to choose from.
    pub fn select_next<H, R>(
        &self,
        candidates: &[Arc<Track>],
        exclude: Option<&TrackId>,
        history: &H,
        now_ms: i64,
        rng: &mut R,
    ) -> Option<Arc<Track>>
    where
        H: HistoryLookup + ?Sized,
        R: Rng + ?Sized,
    {
        let mut pool: Vec<&Arc<Track>> = candidates
            .iter()
            .filter(|t| Some(&t.id) != exclude)
            .collect();

        if pool.is_empty() {
            return None;
        }

        if candidates.len() <= self.config.small_pool_threshold {
            pool = self.apply_anti_repeat(pool, history, now_ms);
        }

        let weights: Vec<f64> = pool
            .iter()
            .map(|t| self.selection_weight(history.entry(&t.id), now_ms))
            .collect();
        let total: f64 = weights.iter().sum();

        if !(total.is_finite() && total > 0.0) {
            return pool.first().map(|t| Arc::clone(t));
        }

        let r = rng.gen_range(0.0..total);
        let index = pick_weighted(&weights, r).unwrap_or(0);
        pool.get(index).map(|t| Arc::clone(t))
    }

    /// Remove candidates played inside the anti-repeat window
    ///
    /// If every candidate was played inside the window, keep only the one
    /// played longest ago so playback can always move forward.
    fn apply_anti_repeat<'a, H>(
        &self,
        pool: Vec<&'a Arc<Track>>,
        history: &H,
        now_ms: i64,
    ) -> Vec<&'a Arc<Track>>
    where
        H: HistoryLookup + ?Sized,
    {
        let window = self.config.anti_repeat_window_ms();
        let played_recently = |t: &Arc<Track>| {
            history
                .entry(&t.id)
                .is_some_and(|e| now_ms.saturating_sub(e.last_played_at_ms) < window)
        };

        let fresh: Vec<&Arc<Track>> = pool.iter().copied().filter(|t| !played_recently(t)).collect();
        if !fresh.is_empty() {
            return fresh;
        }

        let oldest = pool.iter().copied().min_by_key(|t| {
            history
                .entry(&t.id)
                .map_or(i64::MIN, |e| e.last_played_at_ms)
        });
        oldest.into_iter().collect()
    }

    /// Selection weight of a track given its history entry
    ///
    /// Never-played tracks get the base weight. A play `h` hours ago
    /// (h < 24) scales the weight by `0.5^max(0, 4 - h)`, and the play
    /// count scales it by `max(0.3, 1 - 0.1 * count)`.
    pub fn selection_weight(&self, entry: Option<&PlayHistoryEntry>, now_ms: i64) -> f64 {
        let mut weight = self.config.base_weight;

        if let Some(entry) = entry {
            let hours_ago = now_ms.saturating_sub(entry.last_played_at_ms) as f64 / HOUR_MS;
            if hours_ago < RECENCY_HORIZON_HOURS {
                weight *= 0.5_f64.powf((DECAY_FREE_AFTER_HOURS - hours_ago).max(0.0));
            }
            weight *= (1.0 - f64::from(entry.play_count) * PLAY_COUNT_PENALTY)
                .max(MIN_FREQUENCY_FACTOR);
        }

        weight
    }
}

/// Roulette-wheel pick
///
/// Subtracts each weight from `r` in order and returns the first index at
/// which `r` drops to zero or below. `None` if `r` exceeds the total.
pub fn pick_weighted(weights: &[f64], r: f64) -> Option<usize> {
    let mut remaining = r;
    for (i, weight) in weights.iter().enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(i);
        }
    }
    None
}

/// Uniform pick over `candidates` minus `exclude`
pub fn pick_uniform<R>(
    candidates: &[Arc<Track>],
    exclude: Option<&TrackId>,
    rng: &mut R,
) -> Option<Arc<Track>>
where
    R: Rng + ?Sized,
{
    let pool: Vec<&Arc<Track>> = candidates
        .iter()
        .filter(|t| Some(&t.id) != exclude)
        .collect();
    pool.choose(rng).map(|t| Arc::clone(t))
}
