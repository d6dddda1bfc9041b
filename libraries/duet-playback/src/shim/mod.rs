//! Background audio shim
//!
//! Some browsers (Safari) suspend audio produced outside the DOM as soon as
//! the tab is backgrounded. The shim keeps one hidden `<audio>` element in
//! the document that mirrors the primary engine's source, position, volume
//! and rate, which keeps the session alive.
//!
//! The shim is created once per session. Where the browser doesn't need it,
//! it is inactive: no element is created and every method is a no-op. All
//! failures are absorbed and logged; nothing here returns an error.

mod detect;
mod element;

pub use detect::suspends_detached_audio;
pub use element::{MediaElement, ReadySignal};

use crate::config::ShimConfig;
use duet_core::PlaybackSnapshot;
use futures_util::future::{self, Either};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a `play()` call did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No playable source assigned
    NoSource,

    /// The shim isn't needed in this environment
    Inactive,

    /// The shim was destroyed
    Destroyed,

    /// The element refused to start (autoplay policy, decode error)
    Rejected,
}

/// Result of [`AudioShim::play`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback started
    Started,

    /// The element never reported ready; playback was attempted anyway
    StartedAfterTimeout,

    /// Nothing was played
    Skipped(SkipReason),
}

/// Hidden audio element mirroring the primary engine
#[derive(Debug)]
pub struct AudioShim<E> {
    element: Option<E>,
    src: Option<String>,
    destroyed: bool,
    ready_timeout: Duration,
    unresolved_scheme: String,
}

impl<E: MediaElement> AudioShim<E> {
    /// Shim backed by `element`
    pub fn active(element: E, config: &ShimConfig) -> Self {
        info!("Background audio shim active");
        Self {
            element: Some(element),
            ..Self::inactive(config)
        }
    }

    /// Shim for an environment that doesn't need one
    pub fn inactive(config: &ShimConfig) -> Self {
        Self {
            element: None,
            src: None,
            destroyed: false,
            ready_timeout: config.ready_timeout(),
            unresolved_scheme: config.unresolved_scheme.clone(),
        }
    }

    /// Shim for the browser identified by `user_agent`
    ///
    /// `create` is only called when the browser suspends detached audio. If
    /// it returns `None` the shim stays inactive.
    pub fn for_user_agent<F>(user_agent: &str, config: &ShimConfig, create: F) -> Self
    where
        F: FnOnce() -> Option<E>,
    {
        if !suspends_detached_audio(user_agent) {
            debug!("Browser keeps detached audio alive, shim inactive");
            return Self::inactive(config);
        }

        match create() {
            Some(element) => Self::active(element, config),
            None => {
                warn!("Could not create background audio element, shim inactive");
                Self::inactive(config)
            }
        }
    }

    /// Whether an element is attached and usable
    pub fn is_active(&self) -> bool {
        self.element.is_some() && !self.destroyed
    }

    /// Whether [`destroy`](Self::destroy) has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Source the shim would play, if any
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn element_mut(&mut self) -> Option<&mut E> {
        if self.destroyed {
            return None;
        }
        self.element.as_mut()
    }

    /// Point the shim at a new source
    ///
    /// Internal storage references (`indexeddb://...`) aren't playable until
    /// resolved to a blob URL and are ignored.
    pub fn set_src(&mut self, url: &str) {
        if self.destroyed {
            return;
        }
        if url.is_empty() || url.starts_with(&self.unresolved_scheme) {
            debug!(url, "Ignoring unresolved source");
            return;
        }

        self.src = Some(url.to_string());
        if let Some(element) = self.element.as_mut() {
            element.set_src(url);
        }
    }

    /// Start playback, waiting a bounded time for buffering
    ///
    /// If the element hasn't reported ready (or error) within the ready
    /// timeout, playback is attempted anyway.
    pub async fn play(&mut self) -> PlayOutcome {
        if self.destroyed {
            return PlayOutcome::Skipped(SkipReason::Destroyed);
        }
        if self.src.is_none() {
            warn!("Background audio play requested without a source");
            return PlayOutcome::Skipped(SkipReason::NoSource);
        }

        let ready_timeout = self.ready_timeout;
        let Some(element) = self.element.as_mut() else {
            return PlayOutcome::Skipped(SkipReason::Inactive);
        };

        let timed_out = if element.is_ready() {
            false
        } else {
            let timeout = Box::pin(delay(ready_timeout));
            match future::select(element.wait_ready(), timeout).await {
                Either::Left((ReadySignal::Ready, _)) => false,
                Either::Left((ReadySignal::Error, _)) => {
                    debug!("Background audio reported a load error, trying anyway");
                    false
                }
                Either::Right(_) => {
                    debug!(timeout_ms = ready_timeout.as_millis() as u64, "Background audio not ready, playing anyway");
                    true
                }
            }
        };

        match element.start().await {
            Ok(()) if timed_out => PlayOutcome::StartedAfterTimeout,
            Ok(()) => PlayOutcome::Started,
            Err(e) => {
                warn!("Background audio refused to play: {}", e);
                PlayOutcome::Skipped(SkipReason::Rejected)
            }
        }
    }

    /// Pause the element
    pub fn pause(&mut self) {
        if let Some(element) = self.element_mut() {
            element.pause();
        }
    }

    /// Move to `time` within the current source
    pub fn seek(&mut self, time: Duration) {
        if let Some(element) = self.element_mut() {
            element.set_current_time(time);
        }
    }

    /// Set volume, clamped to `[0.0, 1.0]`
    pub fn set_volume(&mut self, volume: f64) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if let Some(element) = self.element_mut() {
            element.set_volume(volume);
        }
    }

    /// Mirror the primary player's playback rate
    pub fn set_playback_rate(&mut self, rate: f64) {
        if let Some(element) = self.element_mut() {
            element.set_playback_rate(rate);
        }
    }

    /// Mirror volume and position from the primary engine
    pub fn sync_from(&mut self, snapshot: &PlaybackSnapshot) {
        self.set_volume(snapshot.volume);
        self.seek(snapshot.current_time);
    }

    /// Pause, drop the source and remove the element
    ///
    /// Every later call is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(element) = self.element.as_mut() {
            element.pause();
            element.clear_src();
            element.detach();
            info!("Background audio shim destroyed");
        }
        self.src = None;
        self.destroyed = true;
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn delay(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(all(target_arch = "wasm32", feature = "web"))]
async fn delay(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

// No timer without the web feature; start right away.
#[cfg(all(target_arch = "wasm32", not(feature = "web")))]
async fn delay(_duration: Duration) {}
