//! Two surfaces on one bus
//!
//! Drives a main surface and a miniplayer through realistic sequences and
//! checks that they converge without echo loops.

use duet_core::{ManualClock, PlaybackSnapshot, SharedClock, SurfaceId, Track, TrackId};
use duet_playback::{
    AdvanceCause, EngineConfig, LocalBus, PlaybackEngine, SurfacePlayer, SurfaceSync, SyncConfig,
    SyncEvent, SyncTransport,
};
use std::sync::Arc;
use std::time::Duration;

// ===== Helpers =====

/// Player that only tracks state, optionally backed by an engine
struct TestPlayer {
    state: PlaybackSnapshot,
    engine: Option<PlaybackEngine>,
    applied: Vec<&'static str>,
}

impl TestPlayer {
    fn new() -> Self {
        Self {
            state: PlaybackSnapshot {
                volume: 0.8,
                ..PlaybackSnapshot::default()
            },
            engine: None,
            applied: Vec::new(),
        }
    }

    /// Take over `engine`, start its queue and show the first track
    fn load_queue(&mut self, mut engine: PlaybackEngine, tracks: Vec<Arc<Track>>) {
        if let Some(track) = engine.set_queue(tracks, Some(0)) {
            self.show(&track);
        }
        self.engine = Some(engine);
    }

    fn show(&mut self, track: &Track) {
        self.state.current_track = Some(track.id.clone());
        self.state.duration = track.duration;
        self.state.current_time = Duration::ZERO;
    }

    fn advance(&mut self, cause: AdvanceCause) {
        let next = self.engine.as_mut().and_then(|e| e.advance(cause));
        if let Some(track) = next {
            self.show(&track);
        }
    }
}

impl SurfacePlayer for TestPlayer {
    fn snapshot(&self) -> PlaybackSnapshot {
        self.state.clone()
    }

    fn play(&mut self) {
        self.applied.push("play");
        self.state.is_playing = true;
    }

    fn pause(&mut self) {
        self.applied.push("pause");
        self.state.is_playing = false;
    }

    fn next(&mut self) {
        self.applied.push("next");
        self.advance(AdvanceCause::Skip);
    }

    fn previous(&mut self) {
        self.applied.push("previous");
        let prev = self.engine.as_mut().and_then(PlaybackEngine::previous);
        if let Some(track) = prev {
            self.show(&track);
        }
    }

    fn seek(&mut self, time: Duration) {
        self.applied.push("seek");
        self.state.current_time = time;
    }

    fn set_volume(&mut self, volume: f64) {
        self.applied.push("volume");
        self.state.volume = volume;
    }

    fn load_track(&mut self, track_id: &TrackId, duration: Duration) {
        self.applied.push("track");
        self.state.current_track = Some(track_id.clone());
        self.state.duration = duration;
        self.state.current_time = Duration::ZERO;
    }
}

struct Surface {
    sync: SurfaceSync,
    player: TestPlayer,
}

impl Surface {
    fn new(id: SurfaceId, bus: &LocalBus, clock: SharedClock, player: TestPlayer) -> Self {
        let mut sync = SurfaceSync::new(id, Box::new(bus.connect()), &SyncConfig::default(), clock);
        sync.publish_state(&player.snapshot());
        Self { sync, player }
    }

    /// Publish local changes, the way a UI state handler would
    fn publish(&mut self) -> usize {
        let snapshot = self.player.snapshot();
        self.sync.publish_state(&snapshot)
    }

    /// Apply pending remote events, then publish whatever changed
    fn settle(&mut self) -> (usize, usize) {
        let applied = self.sync.pump(&mut self.player);
        let published = self.publish();
        (applied, published)
    }
}

fn tracks(ids: &[&str]) -> Vec<Arc<Track>> {
    ids.iter()
        .map(|id| Arc::new(Track::new(*id, format!("Song {}", id), "Artist", Duration::from_secs(200))))
        .collect()
}

fn pair() -> (Arc<ManualClock>, Surface, Surface) {
    let (handle, clock) = ManualClock::shared(1_700_000_000_000);
    let bus = LocalBus::new(64);
    let main = Surface::new(SurfaceId::main(), &bus, Arc::clone(&clock), TestPlayer::new());
    let pip = Surface::new(SurfaceId::pip(), &bus, clock, TestPlayer::new());
    (handle, main, pip)
}

/// Let both surfaces exchange messages until neither publishes anything
fn run_until_quiet(a: &mut Surface, b: &mut Surface) -> usize {
    let mut rounds = 0;
    loop {
        rounds += 1;
        assert!(rounds < 10, "surfaces keep echoing");
        let (_, a_out) = a.settle();
        let (_, b_out) = b.settle();
        if a_out == 0 && b_out == 0 {
            return rounds;
        }
    }
}

// ===== Tests =====

#[test]
fn play_on_main_reaches_pip_once() {
    let (_clock, mut main, mut pip) = pair();

    main.player.state.is_playing = true;
    assert_eq!(main.publish(), 1);

    let (applied, published) = pip.settle();
    assert_eq!(applied, 1);
    assert_eq!(published, 0, "applied change must not be re-broadcast");
    assert!(pip.player.state.is_playing);

    let (applied, _) = main.settle();
    assert_eq!(applied, 0);
    assert_eq!(main.player.applied, Vec::<&str>::new());
}

#[test]
fn every_state_kind_converges() {
    let (clock, mut main, mut pip) = pair();

    main.player.state.current_track = Some(TrackId::new("a"));
    main.player.state.is_playing = true;
    main.player.state.volume = 0.3;
    assert_eq!(main.publish(), 3);
    run_until_quiet(&mut main, &mut pip);

    // Main plays on normally while the user drags pip's seek bar
    clock.advance(Duration::from_secs(1));
    main.player.state.current_time = Duration::from_secs(1);
    pip.player.state.current_time = Duration::from_secs(90);
    assert_eq!(pip.publish(), 1);
    run_until_quiet(&mut main, &mut pip);

    assert_eq!(pip.player.snapshot(), main.player.snapshot());
    assert_eq!(main.player.state.current_time, Duration::from_secs(90));
    assert_eq!(main.player.state.volume, 0.3);
    assert_eq!(pip.player.state.current_track, Some(TrackId::new("a")));
}

#[test]
fn small_drift_is_not_corrected() {
    let (clock, mut main, mut pip) = pair();

    main.player.state.is_playing = true;
    main.publish();
    run_until_quiet(&mut main, &mut pip);

    // Both play on, pip's clock slightly behind
    clock.advance(Duration::from_secs(5));
    main.player.state.current_time = Duration::from_millis(5_000);
    pip.player.state.current_time = Duration::from_millis(4_400);

    let rounds = run_until_quiet(&mut main, &mut pip);
    assert_eq!(rounds, 1);
    assert!(!pip.player.applied.contains(&"seek"));
}

#[test]
fn simultaneous_pause_settles() {
    let (_clock, mut main, mut pip) = pair();

    main.player.state.is_playing = true;
    main.publish();
    run_until_quiet(&mut main, &mut pip);

    main.player.state.is_playing = false;
    pip.player.state.is_playing = false;
    main.publish();
    pip.publish();
    run_until_quiet(&mut main, &mut pip);

    assert!(!main.player.state.is_playing);
    assert!(!pip.player.state.is_playing);
    assert!(!main.player.applied.contains(&"pause"));
    assert!(!pip.player.applied.contains(&"pause"));
}

#[test]
fn next_from_pip_moves_main_engine() {
    let (handle, clock) = ManualClock::shared(1_700_000_000_000);
    let bus = LocalBus::new(64);
    let engine = PlaybackEngine::with_seed(&EngineConfig::default(), Arc::clone(&clock), 3);
    let mut main = Surface::new(SurfaceId::main(), &bus, Arc::clone(&clock), TestPlayer::new());
    let mut pip = Surface::new(SurfaceId::pip(), &bus, clock, TestPlayer::new());

    main.player.load_queue(engine, tracks(&["a", "b", "c"]));
    assert_eq!(main.publish(), 1);
    run_until_quiet(&mut main, &mut pip);
    assert_eq!(pip.player.state.current_track, Some(TrackId::new("a")));

    handle.advance(Duration::from_secs(2));
    assert!(pip.sync.publish_next());
    run_until_quiet(&mut main, &mut pip);

    assert_eq!(main.player.state.current_track, Some(TrackId::new("b")));
    assert_eq!(pip.player.state.current_track, Some(TrackId::new("b")));
    assert_eq!(main.player.applied, vec!["next"]);
    assert_eq!(pip.player.applied, vec!["track", "track"]);
}

#[test]
fn crossfade_defers_track_announcement() {
    let (handle, clock) = ManualClock::shared(1_700_000_000_000);
    let bus = LocalBus::new(64);
    let mut observer = bus.connect();
    let engine = PlaybackEngine::with_seed(&EngineConfig::default(), Arc::clone(&clock), 3);
    let mut main = Surface::new(SurfaceId::main(), &bus, clock, TestPlayer::new());

    main.player.load_queue(engine, tracks(&["a", "b"]));
    main.player.state.is_playing = true;
    assert_eq!(main.publish(), 2);
    while observer.try_recv().unwrap().is_some() {}

    // Crossfade timer fires
    main.sync.begin_crossfade();
    main.player.advance(AdvanceCause::Crossfade);
    handle.advance(Duration::from_secs(6));
    main.player.state.current_time = Duration::from_secs(6);
    assert_eq!(main.publish(), 0);
    assert!(observer.try_recv().unwrap().is_none());

    main.sync.end_crossfade();
    handle.advance(Duration::from_secs(1));
    main.player.state.current_time = Duration::from_secs(7);
    assert_eq!(main.publish(), 1);

    let message = observer.try_recv().unwrap().unwrap();
    assert_eq!(message.origin, SurfaceId::main());
    assert_eq!(
        message.event,
        SyncEvent::Track {
            track_id: TrackId::new("b"),
            duration: Duration::from_secs(200),
        }
    );
}

#[test]
fn pause_during_crossfade_applies_after_it() {
    let (handle, clock) = ManualClock::shared(1_700_000_000_000);
    let bus = LocalBus::new(64);
    let engine = PlaybackEngine::with_seed(&EngineConfig::default(), Arc::clone(&clock), 3);
    let mut main = Surface::new(SurfaceId::main(), &bus, Arc::clone(&clock), TestPlayer::new());
    let mut pip = Surface::new(SurfaceId::pip(), &bus, clock, TestPlayer::new());

    main.player.load_queue(engine, tracks(&["a", "b"]));
    main.player.state.is_playing = true;
    assert_eq!(main.publish(), 2);
    run_until_quiet(&mut main, &mut pip);

    main.sync.begin_crossfade();
    main.player.advance(AdvanceCause::Crossfade);
    pip.player.state.is_playing = false;
    assert_eq!(pip.publish(), 1);

    // Held while the fade runs
    assert_eq!(main.settle(), (0, 0));
    assert!(main.player.state.is_playing);

    handle.advance(Duration::from_secs(6));
    main.player.state.current_time = Duration::from_secs(6);
    main.sync.end_crossfade();
    run_until_quiet(&mut main, &mut pip);

    assert!(!main.player.state.is_playing);
    assert!(!pip.player.state.is_playing);
    assert_eq!(main.player.applied, vec!["pause"]);
    assert_eq!(pip.player.state.current_track, Some(TrackId::new("b")));
    assert_eq!(pip.player.applied, vec!["track", "play", "track"]);
}
