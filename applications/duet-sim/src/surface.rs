//! Simulated surfaces
//!
//! A [`SimSurface`] is what a browser window would be: a player with local
//! state, optionally an engine deciding what plays next, and a sync
//! endpoint on the shared bus.

use duet_core::{PlaybackSnapshot, SharedClock, SurfaceId, Track, TrackId};
use duet_playback::{
    AdvanceCause, EngineConfig, LocalBus, PlaybackEngine, SurfacePlayer, SurfaceSync,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Player state of one surface
#[derive(Debug, Default)]
pub struct SimPlayer {
    pub state: PlaybackSnapshot,
    pub engine: Option<PlaybackEngine>,
    pub remote_applied: usize,
}

impl SimPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Player that owns the queue
    pub fn with_engine(engine: PlaybackEngine) -> Self {
        Self {
            engine: Some(engine),
            ..Self::new()
        }
    }

    pub fn show(&mut self, track: &Track) {
        self.state.current_track = Some(track.id.clone());
        self.state.duration = track.duration;
        self.state.current_time = Duration::ZERO;
    }

    /// Move on through the engine, showing the new track
    pub fn advance(&mut self, cause: AdvanceCause) -> Option<Arc<Track>> {
        let track = self.engine.as_mut()?.advance(cause)?;
        self.show(&track);
        Some(track)
    }

    /// Play `elapsed` worth of audio
    pub fn tick(&mut self, elapsed: Duration) {
        if self.state.is_playing {
            self.state.current_time = (self.state.current_time + elapsed).min(self.state.duration);
        }
    }
}

impl SurfacePlayer for SimPlayer {
    fn snapshot(&self) -> PlaybackSnapshot {
        self.state.clone()
    }

    fn play(&mut self) {
        self.remote_applied += 1;
        self.state.is_playing = true;
    }

    fn pause(&mut self) {
        self.remote_applied += 1;
        self.state.is_playing = false;
    }

    fn next(&mut self) {
        self.remote_applied += 1;
        self.advance(AdvanceCause::Skip);
    }

    fn previous(&mut self) {
        self.remote_applied += 1;
        if let Some(track) = self.engine.as_mut().and_then(PlaybackEngine::previous) {
            self.show(&track);
        }
    }

    fn seek(&mut self, time: Duration) {
        self.remote_applied += 1;
        self.state.current_time = time;
    }

    fn set_volume(&mut self, volume: f64) {
        self.remote_applied += 1;
        self.state.volume = volume;
    }

    fn load_track(&mut self, track_id: &TrackId, duration: Duration) {
        self.remote_applied += 1;
        self.state.current_track = Some(track_id.clone());
        self.state.duration = duration;
        self.state.current_time = Duration::ZERO;
    }
}

/// A player wired to the bus
#[derive(Debug)]
pub struct SimSurface {
    pub sync: SurfaceSync,
    pub player: SimPlayer,
    pub published: usize,
}

impl SimSurface {
    pub fn connect(
        id: SurfaceId,
        bus: &LocalBus,
        config: &EngineConfig,
        clock: SharedClock,
        player: SimPlayer,
    ) -> Self {
        let mut sync = SurfaceSync::new(id, Box::new(bus.connect()), &config.sync, clock);
        sync.publish_state(&player.snapshot());
        Self {
            sync,
            player,
            published: 0,
        }
    }

    pub fn id(&self) -> &SurfaceId {
        self.sync.surface()
    }

    /// Broadcast local changes
    pub fn publish(&mut self) -> usize {
        let sent = self.sync.publish_state(&self.player.snapshot());
        self.published += sent;
        sent
    }

    /// Apply remote events, then broadcast whatever changed
    pub fn settle(&mut self) -> usize {
        self.sync.pump(&mut self.player);
        self.publish()
    }
}

/// Exchange messages until both surfaces are quiet
///
/// Returns the number of rounds, or `None` if they never settle.
pub fn settle_pair(a: &mut SimSurface, b: &mut SimSurface, max_rounds: usize) -> Option<usize> {
    for round in 1..=max_rounds {
        let sent = a.settle() + b.settle();
        if sent == 0 {
            return Some(round);
        }
    }
    None
}

/// Log both surfaces' state side by side
pub fn report(a: &SimSurface, b: &SimSurface) {
    for surface in [a, b] {
        let state = &surface.player.state;
        info!(
            surface = %surface.id(),
            playing = state.is_playing,
            time_ms = state.current_time.as_millis() as u64,
            volume = state.volume,
            track = state.current_track.as_ref().map(TrackId::as_str),
            published = surface.published,
            applied = surface.player.remote_applied,
            "Surface state"
        );
    }
}
