//! Duet Player Core
//!
//! Platform-agnostic domain types shared by every playback surface.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackId`, `SurfaceId`, `RepeatMode`, `PlaybackSnapshot`
//! - **Time Source**: the `Clock` trait, with `SystemClock` and `ManualClock`
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use duet_core::{Clock, ManualClock, SurfaceId, Track};
//! use std::time::Duration;
//!
//! let track = Track::new("a", "Intro", "Artist", Duration::from_secs(180));
//! assert_eq!(track.id.as_str(), "a");
//!
//! let main = SurfaceId::main();
//! assert_ne!(main, SurfaceId::pip());
//!
//! let clock = ManualClock::new(1_000);
//! clock.advance(Duration::from_millis(500));
//! assert_eq!(clock.now_ms(), 1_500);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{CoreError, Result};
pub use types::{PlaybackSnapshot, RepeatMode, SurfaceId, Track, TrackId};
