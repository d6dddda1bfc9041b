//! Engine configuration
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock behaviour. Values can be layered from a TOML file and `DUET_`
//! environment variables, e.g. `DUET_SHUFFLE__SMALL_POOL_THRESHOLD=4`.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for one surface's playback engine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub shuffle: ShuffleConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub shim: ShimConfig,
}

/// Play-history retention
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Entries older than this many days are pruned on the next write
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Smart shuffle tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShuffleConfig {
    /// Collections this small get the anti-repeat guard
    #[serde(default = "default_small_pool_threshold")]
    pub small_pool_threshold: usize,

    /// Tracks played within this window are skipped in small collections
    #[serde(default = "default_anti_repeat_window_minutes")]
    pub anti_repeat_window_minutes: u32,

    /// Weight of a track with no play history
    #[serde(default = "default_base_weight")]
    pub base_weight: f64,
}

/// Next-track cache tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Minimum spacing between unforced invalidations
    #[serde(default = "default_invalidation_throttle_ms")]
    pub invalidation_throttle_ms: u64,
}

/// Cross-surface sync tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Remote seeks closer than this to local time are ignored
    #[serde(default = "default_seek_tolerance_ms")]
    pub seek_tolerance_ms: u64,

    /// Buffered messages per in-process receiver
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// BroadcastChannel name shared by all surfaces
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
}

/// Background-audio shim tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShimConfig {
    /// Upper bound on the buffering wait before `play()`
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Source scheme that still needs resolving to a blob URL
    #[serde(default = "default_unresolved_scheme")]
    pub unresolved_scheme: String,
}

fn default_retention_days() -> u32 {
    7
}

fn default_small_pool_threshold() -> usize {
    3
}

fn default_anti_repeat_window_minutes() -> u32 {
    30
}

fn default_base_weight() -> f64 {
    100.0
}

fn default_invalidation_throttle_ms() -> u64 {
    500
}

fn default_seek_tolerance_ms() -> u64 {
    1_000
}

fn default_channel_capacity() -> usize {
    64
}

fn default_channel_name() -> String {
    "duet-playback-sync".to_string()
}

fn default_ready_timeout_ms() -> u64 {
    2_000
}

fn default_unresolved_scheme() -> String {
    "indexeddb://".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            small_pool_threshold: default_small_pool_threshold(),
            anti_repeat_window_minutes: default_anti_repeat_window_minutes(),
            base_weight: default_base_weight(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            invalidation_throttle_ms: default_invalidation_throttle_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            seek_tolerance_ms: default_seek_tolerance_ms(),
            channel_capacity: default_channel_capacity(),
            channel_name: default_channel_name(),
        }
    }
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: default_ready_timeout_ms(),
            unresolved_scheme: default_unresolved_scheme(),
        }
    }
}

impl HistoryConfig {
    /// Retention window in milliseconds
    pub fn retention_ms(&self) -> i64 {
        i64::from(self.retention_days) * 24 * 60 * 60 * 1_000
    }
}

impl ShuffleConfig {
    /// Anti-repeat window in milliseconds
    pub fn anti_repeat_window_ms(&self) -> i64 {
        i64::from(self.anti_repeat_window_minutes) * 60 * 1_000
    }
}

impl CacheConfig {
    /// Throttle interval
    pub fn invalidation_throttle(&self) -> Duration {
        Duration::from_millis(self.invalidation_throttle_ms)
    }
}

impl SyncConfig {
    /// Seek tolerance
    pub fn seek_tolerance(&self) -> Duration {
        Duration::from_millis(self.seek_tolerance_ms)
    }
}

impl ShimConfig {
    /// Buffering wait bound
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `DUET_` prefix and `__` between
    /// section and key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(PlaybackError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("DUET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.history.retention_days == 0 {
            return Err(PlaybackError::Config(
                "history.retention_days must be at least 1".to_string(),
            ));
        }

        if !(self.shuffle.base_weight.is_finite() && self.shuffle.base_weight > 0.0) {
            return Err(PlaybackError::Config(
                "shuffle.base_weight must be a positive number".to_string(),
            ));
        }

        if self.sync.channel_capacity == 0 {
            return Err(PlaybackError::Config(
                "sync.channel_capacity must be at least 1".to_string(),
            ));
        }

        if self.sync.channel_name.trim().is_empty() {
            return Err(PlaybackError::Config(
                "sync.channel_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
