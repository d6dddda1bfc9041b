//! Per-surface sync endpoint
//!
//! Each surface owns one [`SurfaceSync`]. It turns local state changes into
//! outbound events and decides which inbound events to apply.
//!
//! Loop prevention rests on two rules:
//! - a surface never applies its own messages
//! - an inbound event is applied only when it differs materially from local
//!   state (play/pause disagreement, seek beyond tolerance, volume change,
//!   different track)
//!
//! A remote state change applied locally is folded into the publish
//! baseline, so the local change it causes is never re-broadcast. Only the
//! fields the event touches are folded in; other local changes still go out.
//! `Next` and `Previous` are actions rather than states: the track change they
//! cause on the receiving surface is published normally.
//!
//! Play/pause and volume events that arrive during a crossfade are held (the
//! latest of each) and re-checked by the first [`SurfaceSync::pump`] after it.
//! Seeks, track changes and skips refer to the outgoing track and are dropped.
//!
//! ```text
//!            begin_crossfade              end_crossfade
//!   Idle ─────────────────────▶ Crossfading ───────────▶ Idle
//!    │  ▲
//!    │  │ finish_remote
//!    ▼  │
//!   ApplyingRemote
//! ```

use super::event::{SyncEvent, SyncMessage};
use super::transport::SyncTransport;
use crate::config::SyncConfig;
use duet_core::{PlaybackSnapshot, SharedClock, SurfaceId, TrackId};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Sync state of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Publishing and applying normally
    Idle,

    /// A remote event is being applied; local changes are not re-broadcast
    ApplyingRemote,

    /// A local crossfade is running; all sync is suspended
    Crossfading,
}

/// The surface-side player that remote events are applied to
///
/// Implemented by the UI layer around its own audio element.
pub trait SurfacePlayer {
    /// Current local playback state
    fn snapshot(&self) -> PlaybackSnapshot;

    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Skip forward
    fn next(&mut self);

    /// Skip back
    fn previous(&mut self);

    /// Move to a position within the current track
    fn seek(&mut self, time: Duration);

    /// Change volume
    fn set_volume(&mut self, volume: f64);

    /// Switch to a specific track
    fn load_track(&mut self, track_id: &TrackId, duration: Duration);
}

/// Sync endpoint of one surface
pub struct SurfaceSync {
    surface: SurfaceId,
    transport: Option<Box<dyn SyncTransport>>,
    phase: SyncPhase,
    applying: Option<SyncEvent>,
    deferred: Vec<SyncMessage>,
    last_published: Option<PlaybackSnapshot>,
    last_published_at_ms: i64,
    seek_tolerance: Duration,
    clock: SharedClock,
}

impl std::fmt::Debug for SurfaceSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSync")
            .field("surface", &self.surface)
            .field("attached", &self.transport.is_some())
            .field("phase", &self.phase)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl SurfaceSync {
    /// Create an endpoint connected through `transport`
    pub fn new(
        surface: SurfaceId,
        transport: Box<dyn SyncTransport>,
        config: &SyncConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            transport: Some(transport),
            ..Self::detached(surface, config, clock)
        }
    }

    /// Create an endpoint with no bus behind it
    ///
    /// Every publish and receive is a no-op. Used when the runtime has no
    /// channel to other surfaces.
    pub fn detached(surface: SurfaceId, config: &SyncConfig, clock: SharedClock) -> Self {
        Self {
            surface,
            transport: None,
            phase: SyncPhase::Idle,
            applying: None,
            deferred: Vec::new(),
            last_published: None,
            last_published_at_ms: 0,
            seek_tolerance: config.seek_tolerance(),
            clock,
        }
    }

    /// This surface's id
    pub fn surface(&self) -> &SurfaceId {
        &self.surface
    }

    /// Current sync phase
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Whether a bus is attached
    pub fn is_attached(&self) -> bool {
        self.transport.is_some()
    }

    /// Suspend all sync for the duration of a crossfade
    pub fn begin_crossfade(&mut self) {
        debug!(surface = %self.surface, "Crossfade started, sync suspended");
        self.phase = SyncPhase::Crossfading;
    }

    /// Resume sync after a crossfade
    ///
    /// The next [`publish_state`](Self::publish_state) diffs against the
    /// state from before the crossfade, so the track change goes out then.
    /// Events held during the fade are applied by the next
    /// [`pump`](Self::pump).
    pub fn end_crossfade(&mut self) {
        if self.phase == SyncPhase::Crossfading {
            debug!(
                surface = %self.surface,
                held = self.deferred.len(),
                "Crossfade finished, sync resumed"
            );
            self.phase = SyncPhase::Idle;
        }
    }

    /// Whether a crossfade is suspending sync
    pub fn is_crossfading(&self) -> bool {
        self.phase == SyncPhase::Crossfading
    }

    // ===== Outbound =====

    /// Publish whatever changed since the last published state
    ///
    /// The first call only records a baseline. While applying a remote state
    /// event the snapshot is recorded without publishing; while crossfading
    /// nothing happens. Returns the number of events sent.
    pub fn publish_state(&mut self, snapshot: &PlaybackSnapshot) -> usize {
        let now_ms = self.clock.now_ms();

        match self.phase {
            SyncPhase::Crossfading => return 0,
            SyncPhase::ApplyingRemote if self.applying.is_some() => {
                self.absorb(snapshot, now_ms);
                return 0;
            }
            SyncPhase::ApplyingRemote | SyncPhase::Idle => {}
        }

        let events = match &self.last_published {
            None => Vec::new(),
            Some(last) => {
                let elapsed_ms = now_ms.saturating_sub(self.last_published_at_ms);
                let elapsed = Duration::from_millis(u64::try_from(elapsed_ms).unwrap_or(0));
                self.diff(last, snapshot, elapsed)
            }
        };

        self.record_baseline(snapshot, now_ms);
        events.into_iter().filter(|e| self.send(e.clone())).count()
    }

    /// Announce a skip forward
    pub fn publish_next(&mut self) -> bool {
        self.publish_action(SyncEvent::Next)
    }

    /// Announce a skip back
    pub fn publish_previous(&mut self) -> bool {
        self.publish_action(SyncEvent::Previous)
    }

    fn publish_action(&mut self, event: SyncEvent) -> bool {
        if self.phase != SyncPhase::Idle {
            return false;
        }
        self.send(event)
    }

    fn record_baseline(&mut self, snapshot: &PlaybackSnapshot, now_ms: i64) {
        self.last_published = Some(snapshot.clone());
        self.last_published_at_ms = now_ms;
    }

    /// Fold the fields touched by the remote event into the baseline
    fn absorb(&mut self, snapshot: &PlaybackSnapshot, now_ms: i64) {
        let Some(event) = &self.applying else {
            return;
        };
        match self.last_published.as_mut() {
            None => {
                self.last_published = Some(snapshot.clone());
            }
            Some(last) => {
                match event {
                    SyncEvent::Play | SyncEvent::Pause => last.is_playing = snapshot.is_playing,
                    SyncEvent::Volume { .. } => last.volume = snapshot.volume,
                    SyncEvent::Track { .. } => {
                        last.current_track = snapshot.current_track.clone();
                        last.duration = snapshot.duration;
                    }
                    SyncEvent::Seek { .. } | SyncEvent::Next | SyncEvent::Previous => {}
                }
                last.current_time = snapshot.current_time;
            }
        }
        self.last_published_at_ms = now_ms;
    }

    fn diff(&self, last: &PlaybackSnapshot, now: &PlaybackSnapshot, elapsed: Duration) -> Vec<SyncEvent> {
        let mut events = Vec::new();

        let track_changed = last.current_track != now.current_track;
        if let Some(track_id) = &now.current_track {
            if track_changed || last.duration != now.duration {
                events.push(SyncEvent::Track {
                    track_id: track_id.clone(),
                    duration: now.duration,
                });
            }
        }

        if last.is_playing != now.is_playing {
            events.push(if now.is_playing {
                SyncEvent::Play
            } else {
                SyncEvent::Pause
            });
        }

        if (last.volume - now.volume).abs() > f64::EPSILON {
            events.push(SyncEvent::Volume { volume: now.volume });
        }

        if !track_changed {
            let expected = if last.is_playing {
                last.current_time + elapsed
            } else {
                last.current_time
            };
            if abs_diff(expected, now.current_time) > self.seek_tolerance {
                events.push(SyncEvent::Seek {
                    time: now.current_time,
                });
            }
        }

        events
    }

    fn send(&mut self, event: SyncEvent) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let message = SyncMessage::new(self.surface.clone(), event);
        match transport.publish(&message) {
            Ok(()) => {
                trace!(surface = %self.surface, kind = message.event.kind(), "Published sync event");
                true
            }
            Err(e) => {
                warn!(surface = %self.surface, kind = message.event.kind(), "Sync publish failed: {}", e);
                false
            }
        }
    }

    // ===== Inbound =====

    /// Decide whether `message` should change local state
    ///
    /// Returns the event to apply, or `None` if it is our own message, sync
    /// is suspended, or local state already matches.
    pub fn evaluate(&self, message: &SyncMessage, local: &PlaybackSnapshot) -> Option<SyncEvent> {
        if message.origin == self.surface {
            trace!(surface = %self.surface, "Ignoring own sync message");
            return None;
        }

        if self.phase == SyncPhase::Crossfading {
            trace!(surface = %self.surface, kind = message.event.kind(), "Ignoring sync message during crossfade");
            return None;
        }

        let material = match &message.event {
            SyncEvent::Play => !local.is_playing,
            SyncEvent::Pause => local.is_playing,
            SyncEvent::Next | SyncEvent::Previous => true,
            SyncEvent::Seek { time } => abs_diff(*time, local.current_time) > self.seek_tolerance,
            SyncEvent::Volume { volume } => (volume - local.volume).abs() > f64::EPSILON,
            SyncEvent::Track { track_id, .. } => local.current_track.as_ref() != Some(track_id),
        };

        material.then(|| message.event.clone())
    }

    /// Start applying a remote message
    ///
    /// Returns the event the caller should apply to its player. Until
    /// [`finish_remote`](Self::finish_remote) is called, local changes caused
    /// by a state event are recorded but not published.
    pub fn begin_remote(&mut self, message: &SyncMessage, local: &PlaybackSnapshot) -> Option<SyncEvent> {
        let event = self.evaluate(message, local)?;
        self.phase = SyncPhase::ApplyingRemote;
        self.applying = (!matches!(event, SyncEvent::Next | SyncEvent::Previous)).then(|| event.clone());
        debug!(
            surface = %self.surface,
            origin = %message.origin,
            kind = event.kind(),
            "Applying remote sync event"
        );
        Some(event)
    }

    /// Finish applying a remote message
    ///
    /// For state events the fields the event touched in `snapshot` are
    /// folded into the publish baseline, absorbing the change. After
    /// `Next`/`Previous` it is ignored so the resulting track change goes out
    /// on the next publish.
    pub fn finish_remote(&mut self, snapshot: &PlaybackSnapshot) {
        if self.phase != SyncPhase::ApplyingRemote {
            return;
        }
        self.phase = SyncPhase::Idle;
        let now_ms = self.clock.now_ms();
        self.absorb(snapshot, now_ms);
        self.applying = None;
    }

    /// Apply `message` to `player` if it is material
    ///
    /// Returns whether the player was touched.
    pub fn apply_remote<P>(&mut self, message: &SyncMessage, player: &mut P) -> bool
    where
        P: SurfacePlayer + ?Sized,
    {
        let local = player.snapshot();
        let Some(event) = self.begin_remote(message, &local) else {
            return false;
        };

        match event {
            SyncEvent::Play => player.play(),
            SyncEvent::Pause => player.pause(),
            SyncEvent::Next => player.next(),
            SyncEvent::Previous => player.previous(),
            SyncEvent::Seek { time } => player.seek(time),
            SyncEvent::Volume { volume } => player.set_volume(volume),
            SyncEvent::Track { track_id, duration } => player.load_track(&track_id, duration),
        }

        self.finish_remote(&player.snapshot());
        true
    }

    /// Next pending message from the bus
    ///
    /// `None` when detached, idle, or the bus failed (logged).
    pub fn poll(&mut self) -> Option<SyncMessage> {
        let transport = self.transport.as_mut()?;
        match transport.try_recv() {
            Ok(message) => message,
            Err(e) => {
                warn!(surface = %self.surface, "Sync receive failed: {}", e);
                None
            }
        }
    }

    /// Drain pending messages into `player`
    ///
    /// During a crossfade messages are held or dropped instead; once it is
    /// over the held ones are applied first. Returns the number of messages
    /// that changed local state.
    pub fn pump<P>(&mut self, player: &mut P) -> usize
    where
        P: SurfacePlayer + ?Sized,
    {
        let mut applied = 0;

        if !self.is_crossfading() {
            for message in std::mem::take(&mut self.deferred) {
                if self.apply_remote(&message, player) {
                    applied += 1;
                }
            }
        }

        while let Some(message) = self.poll() {
            if self.is_crossfading() {
                self.defer(message);
            } else if self.apply_remote(&message, player) {
                applied += 1;
            }
        }
        applied
    }

    /// Number of messages held until the crossfade ends
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    fn defer(&mut self, message: SyncMessage) {
        if message.origin == self.surface {
            return;
        }
        let Some(slot) = deferral_slot(&message.event) else {
            trace!(surface = %self.surface, kind = message.event.kind(), "Dropping sync message during crossfade");
            return;
        };
        self.deferred.retain(|held| deferral_slot(&held.event) != Some(slot));
        debug!(surface = %self.surface, kind = message.event.kind(), "Holding sync message until crossfade ends");
        self.deferred.push(message);
    }
}

/// Events that replace each other while held during a crossfade
fn deferral_slot(event: &SyncEvent) -> Option<u8> {
    match event {
        SyncEvent::Play | SyncEvent::Pause => Some(0),
        SyncEvent::Volume { .. } => Some(1),
        SyncEvent::Next | SyncEvent::Previous | SyncEvent::Seek { .. } | SyncEvent::Track { .. } => None,
    }
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
