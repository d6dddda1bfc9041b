//! Duet Player - Playback Coordination
//!
//! Keeps two playback surfaces (the main page and the picture-in-picture
//! miniplayer) in agreement, and decides what plays next.
//!
//! This crate provides:
//! - Play history with age-based pruning
//! - Smart shuffle (recency and frequency weighted)
//! - A single-entry next-track cache shared by skip and crossfade
//! - A background audio shim for browsers that suspend detached audio
//! - Cross-surface sync with echo and small-delta suppression
//! - A per-surface `PlaybackEngine` tying it together
//!
//! # Architecture
//!
//! `duet-playback` is platform-agnostic by default. Everything that touches
//! the browser sits behind two seams:
//! - [`MediaElement`] for the shim's `<audio>` element
//! - [`SyncTransport`] for the channel between surfaces
//!
//! The `web` feature provides `web-sys` implementations of both. Natively
//! (tests, the simulator) surfaces talk over an in-process [`LocalBus`].
//!
//! # Example: Next Track
//!
//! ```rust
//! use duet_core::{ManualClock, Track};
//! use duet_playback::{AdvanceCause, EngineConfig, PlaybackEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let (_handle, clock) = ManualClock::shared(0);
//! let mut engine = PlaybackEngine::with_seed(&EngineConfig::default(), clock, 1);
//!
//! let queue = ["a", "b", "c"]
//!     .into_iter()
//!     .map(|id| Arc::new(Track::new(id, id, "Artist", Duration::from_secs(180))))
//!     .collect();
//! engine.set_queue(queue, Some(0));
//!
//! // Skip button and crossfade timer agree on the answer
//! let next = engine.next_track().unwrap();
//! let played = engine.advance(AdvanceCause::Crossfade).unwrap();
//! assert!(Arc::ptr_eq(&next, &played));
//! ```
//!
//! # Example: Sync
//!
//! ```rust
//! use duet_core::{ManualClock, PlaybackSnapshot, SurfaceId};
//! use duet_playback::{LocalBus, SurfaceSync, SyncConfig, SyncEvent, SyncTransport};
//!
//! let (_handle, clock) = ManualClock::shared(0);
//! let bus = LocalBus::new(16);
//! let config = SyncConfig::default();
//!
//! let mut main = SurfaceSync::new(SurfaceId::main(), Box::new(bus.connect()), &config, clock.clone());
//! let mut pip = bus.connect();
//!
//! let paused = PlaybackSnapshot::default();
//! main.publish_state(&paused);
//! main.publish_state(&PlaybackSnapshot { is_playing: true, ..paused });
//!
//! let message = pip.try_recv().unwrap().unwrap();
//! assert_eq!(message.event, SyncEvent::Play);
//! ```

pub mod config;
mod engine;
mod error;
pub mod history;
pub mod next_track;
pub mod shim;
pub mod shuffle;
pub mod sync;

#[cfg(feature = "web")]
pub mod web;

// Public exports
pub use config::{CacheConfig, EngineConfig, HistoryConfig, ShimConfig, ShuffleConfig, SyncConfig};
pub use engine::{AdvanceCause, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use history::{HistoryLookup, PlayHistory, PlayHistoryEntry};
pub use next_track::{CacheKey, InvalidationReason, NextTrack, NextTrackCache, NextTrackContext};
pub use shim::{suspends_detached_audio, AudioShim, MediaElement, PlayOutcome, ReadySignal, SkipReason};
pub use shuffle::ShuffleSelector;
pub use sync::{
    LocalBus, LocalTransport, SurfacePlayer, SurfaceSync, SyncEvent, SyncMessage, SyncPhase,
    SyncTransport,
};
