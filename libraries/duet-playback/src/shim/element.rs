//! Media element seam
//!
//! The shim drives a [`MediaElement`] rather than a DOM node directly, so the
//! same logic runs natively in tests and against `HtmlAudioElement` in the
//! browser (see `web::DomAudioElement`).

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// How a buffering wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadySignal {
    /// Enough data buffered to start (`canplay`)
    Ready,

    /// The element failed to load its source (`error`)
    Error,
}

/// A playable, DOM-resident audio element
#[async_trait(?Send)]
pub trait MediaElement {
    /// Assign a source URL
    fn set_src(&mut self, url: &str);

    /// Remove the source, releasing any buffered data
    fn clear_src(&mut self);

    /// Current source, if any
    fn src(&self) -> Option<String>;

    /// Whether enough data is buffered to start immediately
    fn is_ready(&self) -> bool;

    /// Resolve once the element is ready or has failed
    async fn wait_ready(&mut self) -> ReadySignal;

    /// Start playback
    async fn start(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn set_current_time(&mut self, time: Duration);

    fn set_volume(&mut self, volume: f64);

    fn set_playback_rate(&mut self, rate: f64);

    /// Remove the element from the document
    fn detach(&mut self);
}
