//! Property-based tests for shuffle, history, cache and sync
//!
//! Uses proptest to verify invariants across many random inputs.

use duet_core::{ManualClock, PlaybackSnapshot, RepeatMode, SurfaceId, Track, TrackId};
use duet_playback::{
    CacheConfig, HistoryConfig, NextTrackCache, NextTrackContext, PlayHistory, PlayHistoryEntry,
    ShuffleConfig, ShuffleSelector, SurfaceSync, SyncConfig, SyncEvent, SyncMessage,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000_000;
const HOUR: i64 = 60 * 60 * 1_000;
const DAY: i64 = 24 * HOUR;

// ===== Helpers =====

fn make_queue(len: usize) -> Vec<Arc<Track>> {
    (0..len)
        .map(|i| {
            Arc::new(Track::new(
                format!("t{}", i),
                format!("Song {}", i),
                "Artist",
                Duration::from_secs(200),
            ))
        })
        .collect()
}

fn arbitrary_event() -> impl Strategy<Value = SyncEvent> {
    prop_oneof![
        Just(SyncEvent::Play),
        Just(SyncEvent::Pause),
        Just(SyncEvent::Next),
        Just(SyncEvent::Previous),
        (0u64..600_000).prop_map(|ms| SyncEvent::Seek { time: Duration::from_millis(ms) }),
        (0.0f64..=1.0).prop_map(|volume| SyncEvent::Volume { volume }),
        ("[a-z]{1,8}", 1u64..600).prop_map(|(id, secs)| SyncEvent::Track {
            track_id: TrackId::new(id),
            duration: Duration::from_secs(secs),
        }),
    ]
}

fn arbitrary_snapshot() -> impl Strategy<Value = PlaybackSnapshot> {
    (
        any::<bool>(),
        0u64..600_000,
        0.0f64..=1.0,
        proptest::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(is_playing, ms, volume, track)| PlaybackSnapshot {
            is_playing,
            current_time: Duration::from_millis(ms),
            volume,
            current_track: track.map(TrackId::new),
            duration: Duration::from_secs(300),
        })
}

// ===== Property Tests =====

proptest! {
    /// Two reads with no invalidation in between return the same Arc
    #[test]
    fn cache_returns_identical_arc(
        len in 1usize..40,
        current in proptest::option::of(0usize..40),
        shuffle in any::<bool>(),
        repeat_all in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let queue = make_queue(len);
        let (_handle, clock) = ManualClock::shared(NOW);
        let selector = ShuffleSelector::new(ShuffleConfig::default());
        let mut cache = NextTrackCache::new(&CacheConfig::default(), selector, clock);
        let history = PlayHistory::new(HistoryConfig::default().retention_ms());
        let mut rng = StdRng::seed_from_u64(seed);

        let ctx = NextTrackContext {
            queue: &queue,
            current_index: current.filter(|&i| i < len),
            queue_generation: 1,
            shuffle,
            repeat: if repeat_all { RepeatMode::All } else { RepeatMode::Off },
        };

        let first = cache.get_next(&ctx, &history, &mut rng);
        let second = cache.get_next(&ctx, &history, &mut rng);

        match (first, second) {
            (Some(a), Some(b)) => prop_assert!(Arc::ptr_eq(&a, &b)),
            (None, None) => {}
            (a, b) => prop_assert!(false, "cache answer changed: {:?} vs {:?}", a, b),
        }
    }

    /// A surface never applies a message it published itself
    #[test]
    fn own_messages_never_apply(
        event in arbitrary_event(),
        local in arbitrary_snapshot(),
        crossfading in any::<bool>(),
    ) {
        let (_handle, clock) = ManualClock::shared(NOW);
        let mut sync = SurfaceSync::detached(SurfaceId::main(), &SyncConfig::default(), clock);
        if crossfading {
            sync.begin_crossfade();
        }

        let message = SyncMessage::new(SurfaceId::main(), event);
        prop_assert!(sync.evaluate(&message, &local).is_none());
    }

    /// Remote seeks apply exactly when they move more than a second
    #[test]
    fn seek_applies_only_beyond_tolerance(
        local_ms in 0u64..600_000,
        remote_ms in 0u64..600_000,
    ) {
        let (_handle, clock) = ManualClock::shared(NOW);
        let sync = SurfaceSync::detached(SurfaceId::pip(), &SyncConfig::default(), clock);
        let local = PlaybackSnapshot {
            current_time: Duration::from_millis(local_ms),
            ..PlaybackSnapshot::default()
        };

        let message = SyncMessage::new(
            SurfaceId::main(),
            SyncEvent::Seek { time: Duration::from_millis(remote_ms) },
        );
        let applies = sync.evaluate(&message, &local).is_some();
        prop_assert_eq!(applies, local_ms.abs_diff(remote_ms) > 1_000);
    }

    /// A more recently played track never outweighs a less recent one
    #[test]
    fn recency_never_raises_weight(
        older_ago in 0i64..(3 * DAY),
        gap in 0i64..(2 * DAY),
        count in 1u32..20,
    ) {
        let selector = ShuffleSelector::new(ShuffleConfig::default());
        let entry = |ago: i64| PlayHistoryEntry {
            track_id: TrackId::new("x"),
            last_played_at_ms: NOW - ago,
            play_count: count,
        };

        let older = selector.selection_weight(Some(&entry(older_ago + gap)), NOW);
        let newer = selector.selection_weight(Some(&entry(older_ago)), NOW);

        prop_assert!(newer <= older, "newer {} > older {}", newer, older);
        prop_assert!(newer > 0.0);
    }

    /// Every entry older than the retention window is gone after a write
    #[test]
    fn record_play_prunes_expired_entries(
        ages in prop::collection::vec(0i64..(14 * DAY), 0..30),
        played in "[a-z]{1,4}",
    ) {
        let retention_ms = HistoryConfig::default().retention_ms();
        let entries: Vec<PlayHistoryEntry> = ages
            .iter()
            .enumerate()
            .map(|(i, age)| PlayHistoryEntry {
                track_id: TrackId::new(format!("old{}", i)),
                last_played_at_ms: NOW - DAY - age,
                play_count: 1,
            })
            .collect();

        let mut history = PlayHistory::from_entries(entries, retention_ms, NOW - DAY);
        history.record_play(&TrackId::new(played.clone()), NOW);

        prop_assert!(history.iter().all(|e| e.last_played_at_ms >= NOW - retention_ms));
        prop_assert!(history.get(&TrackId::new(played)).is_some());
    }
}
