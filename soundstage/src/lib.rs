//! Soundstage - cross-thread audio command and mixing subsystem
//!
//! A dedicated audio thread owns a pool of playback sources and drains a
//! typed command queue posted from the logic thread. Playback instances are
//! addressed by [`PlayId`]s that encode a slot index and a generation
//! counter, so commands racing against stop/reuse defuse themselves instead
//! of corrupting unrelated playback. Sound assets are shared by reference
//! and destroyed only on the logic thread, via a deferred-delete hand-off.
//!
//! The mixing side is a trait seam ([`AudioBackend`]/[`Voice`]); no DSP or
//! device output lives in this crate. [`NullBackend`] is the in-tree
//! headless implementation used by the tests and the demo binary.

pub mod assets;
pub mod backend;
pub mod config;
mod play_id;
pub mod server;

pub use assets::{SoundAsset, SoundRef};
pub use backend::{AudioBackend, NullBackend, NullVoice, Voice};
pub use config::{AudioConfig, ConfigError};
pub use play_id::PlayId;
pub use server::{AudioServer, SpawnError};
