//! Audio server tuning knobs (loaded from TOML).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Playback slots in the source pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Tick cadence while nothing needs per-tick work.
    #[serde(default = "default_idle_tick_ms")]
    pub idle_tick_ms: u64,
    /// Tick cadence while fades or live sources need servicing.
    #[serde(default = "default_active_tick_ms")]
    pub active_tick_ms: u64,
    /// How often streamed voices get a buffer-refill pass.
    #[serde(default = "default_stream_tick_ms")]
    pub stream_tick_ms: u64,
    /// How often pool bookkeeping is cross-checked.
    #[serde(default = "default_sanity_check_ms")]
    pub sanity_check_ms: u64,
    /// Fade length applied when music volume drops to zero.
    #[serde(default = "default_pause_fade_ms")]
    pub pause_fade_ms: u64,
    #[serde(default = "default_volume")]
    pub music_volume: f32,
    #[serde(default = "default_volume")]
    pub sound_volume: f32,
}

fn default_pool_size() -> usize { 32 }
fn default_idle_tick_ms() -> u64 { 250 }
fn default_active_tick_ms() -> u64 { 10 }
fn default_stream_tick_ms() -> u64 { 100 }
fn default_sanity_check_ms() -> u64 { 5000 }
fn default_pause_fade_ms() -> u64 { 250 }
fn default_volume() -> f32 { 1.0 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            pool_size: 32,
            idle_tick_ms: 250,
            active_tick_ms: 10,
            stream_tick_ms: 100,
            sanity_check_ms: 5000,
            pause_fade_ms: 250,
            music_volume: 1.0,
            sound_volume: 1.0,
        }
    }
}

impl AudioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }

    pub fn active_tick(&self) -> Duration {
        Duration::from_millis(self.active_tick_ms)
    }

    pub fn stream_tick(&self) -> Duration {
        Duration::from_millis(self.stream_tick_ms)
    }

    pub fn sanity_check_interval(&self) -> Duration {
        Duration::from_millis(self.sanity_check_ms)
    }

    pub fn pause_fade(&self) -> Duration {
        Duration::from_millis(self.pause_fade_ms)
    }
}
