//! Playback sync between surfaces
//!
//! Keeps the main page and the picture-in-picture window showing the same
//! playback state without echo loops.

mod event;
mod surface;
mod transport;

pub use event::{SyncEvent, SyncMessage};
pub use surface::{SurfacePlayer, SurfaceSync, SyncPhase};
pub use transport::{LocalBus, LocalTransport, SyncTransport};
