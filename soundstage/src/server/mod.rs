//! Threaded audio command server
//!
//! Runs all mixing policy on a dedicated thread so game logic never blocks
//! on the audio stack. Callers fire commands and move on; results (freed
//! slots, finished fades, released asset refs) flow back through shared
//! state the logic thread polls at its convenience.
//!
//! # Architecture
//!
//! ```text
//! Logic Thread                      Audio Thread                Backend
//!     │                                  │                         │
//! [play()/stop()/...]                    │                         │
//!     │                                  │                         │
//! [Reserve Slot]─────(channel)────────►[Receive]                   │
//!     │                               [Dispatch]───(trait calls)──►[Voices]
//!     │                               [Process Tick]               │
//!     │                                  │                         │
//! [clear_deleted()]◄──(delete list)────[Defer Refs]                │
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut server = AudioServer::spawn(AudioConfig::default(), NullBackend::new())?;
//!
//! let blip = SoundRef::new(SoundAsset::new("blip", Duration::from_millis(200)));
//! let id = server.play(&blip);
//! server.set_gain(id, 0.5);
//! server.stop(id);
//!
//! // Periodically, from the logic thread:
//! server.clear_deleted();
//! ```

mod commands;
mod fades;
mod handle;
mod metrics;
mod reservations;
mod shared;
mod sources;
mod thread;

// Re-export public API
pub use handle::{AudioServer, SpawnError};
