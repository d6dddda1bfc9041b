//! Scripted scenarios
//!
//! Each scenario builds a fresh bus, two surfaces and a manual clock, runs a
//! short script and fails with an error if the surfaces end up disagreeing.

use crate::surface::{report, settle_pair, SimPlayer, SimSurface};
use anyhow::{bail, ensure, Context};
use duet_core::{ManualClock, RepeatMode, SharedClock, SurfaceId, Track, TrackId};
use duet_playback::{AdvanceCause, EngineConfig, LocalBus, PlaybackEngine};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const START_MS: i64 = 1_700_000_000_000;
const MAX_ROUNDS: usize = 8;

/// Shared setup for one scenario run
pub struct Scenario {
    config: EngineConfig,
    clock: Arc<ManualClock>,
    shared_clock: SharedClock,
    bus: LocalBus,
    tracks: Vec<Arc<Track>>,
    seed: u64,
}

impl Scenario {
    pub fn new(config: EngineConfig, track_count: usize, seed: u64) -> Self {
        let (clock, shared_clock) = ManualClock::shared(START_MS);
        let bus = LocalBus::new(config.sync.channel_capacity);
        Self {
            config,
            clock,
            shared_clock,
            bus,
            tracks: generate_tracks(track_count),
            seed,
        }
    }

    fn engine(&self) -> PlaybackEngine {
        PlaybackEngine::with_seed(&self.config, Arc::clone(&self.shared_clock), self.seed)
    }

    fn surface(&self, id: SurfaceId, player: SimPlayer) -> SimSurface {
        SimSurface::connect(id, &self.bus, &self.config, Arc::clone(&self.shared_clock), player)
    }

    /// Main surface owning the queue, plus a passive miniplayer
    fn pair(&self) -> (SimSurface, SimSurface) {
        let main = self.surface(SurfaceId::main(), SimPlayer::with_engine(self.engine()));
        let pip = self.surface(SurfaceId::pip(), SimPlayer::new());
        (main, pip)
    }

    /// Let wall time pass on both surfaces
    fn play_for(&self, elapsed: Duration, surfaces: [&mut SimSurface; 2]) {
        self.clock.advance(elapsed);
        for surface in surfaces {
            surface.player.tick(elapsed);
        }
    }

    fn start_queue(&self, main: &mut SimSurface) -> anyhow::Result<()> {
        let engine = main
            .player
            .engine
            .as_mut()
            .context("main surface has no engine")?;
        let first = engine
            .set_queue(self.tracks.clone(), Some(0))
            .context("queue is empty")?;
        main.player.show(&first);
        main.player.state.is_playing = true;
        Ok(())
    }
}

fn generate_tracks(count: usize) -> Vec<Arc<Track>> {
    (1..=count)
        .map(|n| {
            let secs = 150 + (n as u64 * 37) % 120;
            Arc::new(Track::new(
                format!("track-{:03}", n),
                format!("Song {}", n),
                format!("Artist {}", n % 4),
                Duration::from_secs(secs),
            ))
        })
        .collect()
}

fn converge(main: &mut SimSurface, pip: &mut SimSurface, step: &str) -> anyhow::Result<()> {
    let Some(rounds) = settle_pair(main, pip, MAX_ROUNDS) else {
        bail!("surfaces still exchanging messages after {} rounds ({})", MAX_ROUNDS, step);
    };
    debug!(step, rounds, "Surfaces settled");

    let a = &main.player.state;
    let b = &pip.player.state;
    ensure!(a.is_playing == b.is_playing, "{}: play state differs", step);
    ensure!(a.current_track == b.current_track, "{}: current track differs", step);
    ensure!((a.volume - b.volume).abs() < f64::EPSILON, "{}: volume differs", step);
    Ok(())
}

/// Every kind of change made on one surface reaches the other exactly once
pub fn echo(s: &Scenario) -> anyhow::Result<()> {
    let (mut main, mut pip) = s.pair();

    s.start_queue(&mut main)?;
    main.publish();
    converge(&mut main, &mut pip, "start")?;

    s.play_for(Duration::from_secs(10), [&mut main, &mut pip]);
    converge(&mut main, &mut pip, "steady playback")?;

    pip.player.state.volume = 0.4;
    pip.publish();
    converge(&mut main, &mut pip, "volume from miniplayer")?;

    main.player.state.current_time = Duration::from_secs(95);
    main.publish();
    converge(&mut main, &mut pip, "seek on main")?;
    ensure!(
        pip.player.state.current_time == Duration::from_secs(95),
        "miniplayer missed the seek"
    );

    pip.player.state.is_playing = false;
    main.player.state.is_playing = false;
    pip.publish();
    main.publish();
    converge(&mut main, &mut pip, "simultaneous pause")?;

    pip.sync.publish_next();
    converge(&mut main, &mut pip, "next from miniplayer")?;

    report(&main, &pip);
    let messages = main.published + pip.published;
    info!(messages, "Echo scenario converged");
    Ok(())
}

/// Smart shuffle over many transitions
pub fn shuffle(s: &Scenario) -> anyhow::Result<()> {
    let (mut main, mut pip) = s.pair();
    if let Some(engine) = main.player.engine.as_mut() {
        engine.set_shuffle(true);
    }
    s.start_queue(&mut main)?;
    main.publish();
    converge(&mut main, &mut pip, "start")?;

    let transitions = s.tracks.len() * 3;
    let mut plays: BTreeMap<TrackId, usize> = BTreeMap::new();
    let mut repeats = 0;

    for _ in 0..transitions {
        let current = main.player.state.current_track.clone();
        let elapsed = main.player.state.duration;
        s.play_for(elapsed, [&mut main, &mut pip]);

        let Some(track) = main.player.advance(AdvanceCause::TrackEnded) else {
            bail!("shuffle ran out of tracks");
        };
        if Some(&track.id) == current.as_ref() && s.tracks.len() > 1 {
            repeats += 1;
        }
        *plays.entry(track.id.clone()).or_default() += 1;

        main.publish();
        converge(&mut main, &mut pip, "shuffle transition")?;
    }

    for (track, count) in &plays {
        info!(track = track.as_str(), count, "Shuffle plays");
    }
    info!(
        transitions,
        distinct = plays.len(),
        back_to_back_repeats = repeats,
        "Shuffle scenario finished"
    );
    ensure!(repeats == 0, "shuffle replayed the current track");
    Ok(())
}

/// Repeat modes at the end of the queue
pub fn repeat(s: &Scenario) -> anyhow::Result<()> {
    let (mut main, mut pip) = s.pair();
    s.start_queue(&mut main)?;
    main.publish();
    converge(&mut main, &mut pip, "start")?;

    for _ in 1..s.tracks.len() {
        main.player.advance(AdvanceCause::TrackEnded);
    }
    main.publish();
    converge(&mut main, &mut pip, "last track")?;

    let end = main.player.advance(AdvanceCause::TrackEnded);
    ensure!(end.is_none(), "repeat off should stop at the end");
    info!("Repeat off: queue ended");

    let engine = main.player.engine.as_mut().context("main surface has no engine")?;
    engine.set_repeat(RepeatMode::All);
    let wrapped = main
        .player
        .advance(AdvanceCause::TrackEnded)
        .context("repeat all should wrap")?;
    ensure!(Arc::ptr_eq(&wrapped, &s.tracks[0]), "repeat all should wrap to the first track");
    main.publish();
    converge(&mut main, &mut pip, "wrapped")?;
    info!(track = wrapped.id.as_str(), "Repeat all: wrapped");

    let engine = main.player.engine.as_mut().context("main surface has no engine")?;
    engine.set_repeat(RepeatMode::One);
    let again = main
        .player
        .advance(AdvanceCause::TrackEnded)
        .context("repeat one should replay")?;
    ensure!(again.id == wrapped.id, "repeat one should replay the current track");
    info!(track = again.id.as_str(), "Repeat one: replayed");

    report(&main, &pip);
    Ok(())
}

/// Remote events are held until the main surface finishes a crossfade
pub fn crossfade(s: &Scenario) -> anyhow::Result<()> {
    let (mut main, mut pip) = s.pair();
    if let Some(engine) = main.player.engine.as_mut() {
        engine.set_shuffle(true);
    }
    s.start_queue(&mut main)?;
    main.publish();
    converge(&mut main, &mut pip, "start")?;

    let fade = Duration::from_secs(6);
    let lead_in = main.player.state.duration.saturating_sub(fade);
    s.play_for(lead_in, [&mut main, &mut pip]);
    converge(&mut main, &mut pip, "before crossfade")?;

    // Timer and skip button must agree on what comes next
    let engine = main.player.engine.as_mut().context("main surface has no engine")?;
    let announced = engine.next_track().context("nothing to crossfade into")?;

    main.sync.begin_crossfade();
    let incoming = main
        .player
        .advance(AdvanceCause::Crossfade)
        .context("crossfade found no next track")?;
    ensure!(Arc::ptr_eq(&announced, &incoming), "crossfade picked a different track");

    // A pause from the miniplayer mid-fade is held, not applied
    pip.player.state.is_playing = false;
    pip.publish();
    main.sync.pump(&mut main.player);
    ensure!(main.player.state.is_playing, "crossfade was interrupted by a remote pause");
    ensure!(main.sync.deferred_len() == 1, "pause from the miniplayer was not held");
    ensure!(main.publish() == 0, "main published during crossfade");

    s.play_for(fade, [&mut main, &mut pip]);
    main.sync.end_crossfade();
    converge(&mut main, &mut pip, "after crossfade")?;
    ensure!(!main.player.state.is_playing, "held pause was lost after the crossfade");
    ensure!(
        pip.player.state.current_track.as_ref() == Some(&incoming.id),
        "miniplayer missed the new track"
    );

    report(&main, &pip);
    info!(track = incoming.id.as_str(), "Crossfade scenario finished");
    Ok(())
}
