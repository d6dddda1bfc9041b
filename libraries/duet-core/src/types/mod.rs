mod ids;
mod playback_state;
mod track;

pub use ids::{SurfaceId, TrackId};
pub use playback_state::{PlaybackSnapshot, RepeatMode};
pub use track::Track;
