//! Public handle to the audio thread.
//!
//! Owns the command channel and the thread itself, plus the producer-side
//! slot accounting that lets `play` return a usable id without waiting for
//! the audio thread.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;
use stagehand::{EventLoop, LoopHandle};
use thiserror::Error;
use tracing::{trace, warn};

use crate::assets::SoundRef;
use crate::backend::AudioBackend;
use crate::config::AudioConfig;
use crate::play_id::PlayId;

use super::commands::AudioCommand;
use super::reservations::SlotReservations;
use super::shared::SharedAudio;
use super::thread::AudioThread;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn audio thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Handle to the audio thread.
///
/// Returned from [`AudioServer::spawn`]. All methods are fire-and-forget:
/// they post a command and return immediately, and commands aimed at a
/// play that has since ended are dropped silently on the audio thread.
/// Dropping the server shuts the thread down and joins it.
pub struct AudioServer {
    /// Sender for commands (Option to allow explicit drop before join)
    tx: Option<LoopHandle<AudioCommand>>,

    /// Thread join handle
    thread: Option<thread::JoinHandle<()>>,

    shared: Arc<SharedAudio>,
    reservations: SlotReservations,
}

impl AudioServer {
    /// Spawn the audio thread and return its handle.
    ///
    /// The thread runs until the handle is dropped. Pool sizes outside
    /// `1..=65536` are clamped; slots are addressed by `u16`.
    pub fn spawn(
        config: AudioConfig,
        backend: impl AudioBackend + 'static,
    ) -> Result<AudioServer, SpawnError> {
        let pool_size = config.pool_size.clamp(1, 1 << 16);
        if pool_size != config.pool_size {
            warn!("Audio pool size {} clamped to {}", config.pool_size, pool_size);
        }

        let shared = Arc::new(SharedAudio::new(pool_size));
        let (mut events, tx) = EventLoop::new();
        let tick_timer = events.add_timer(config.idle_tick(), AudioCommand::Process);

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("audio".into())
            .spawn(move || {
                AudioThread::new(config, Box::new(backend), thread_shared).run(events, tick_timer);
            })?;

        Ok(AudioServer {
            tx: Some(tx),
            thread: Some(thread),
            reservations: SlotReservations::new(Arc::clone(&shared)),
            shared,
        })
    }

    /// Start playing a sound and return the id for addressing it later.
    ///
    /// Never blocks on the audio thread: the slot is reserved here, and on
    /// a full pool a victim is stopped to make room. The returned id stays
    /// valid to post against for the play's whole life; afterwards,
    /// commands using it are silent no-ops.
    pub fn play(&mut self, sound: &SoundRef) -> PlayId {
        let now = Instant::now();
        let reservation = self.reservations.reserve(now);
        if let Some(victim) = reservation.evicted {
            trace!("Pool full; evicting {} for {}", victim, reservation.play_id);
            self.post(AudioCommand::Stop { id: victim });
        }
        self.post(AudioCommand::Play {
            id: reservation.play_id,
            sound: sound.clone(),
        });
        reservation.play_id
    }

    /// Halt a play immediately and free its slot.
    pub fn stop(&self, id: PlayId) {
        self.post(AudioCommand::Stop { id });
    }

    /// Release a play the caller is done steering. Takes the same
    /// release path as [`stop`]; the distinct command lets call sites
    /// tell handle release apart from a forced stop.
    ///
    /// [`stop`]: AudioServer::stop
    pub fn end(&self, id: PlayId) {
        self.post(AudioCommand::End { id });
    }

    pub fn set_gain(&self, id: PlayId, gain: f32) {
        self.post(AudioCommand::SetGain { id, gain });
    }

    pub fn set_position(&self, id: PlayId, position: Vec3) {
        self.post(AudioCommand::SetPosition { id, position });
    }

    pub fn set_looping(&self, id: PlayId, looping: bool) {
        self.post(AudioCommand::SetLooping { id, looping });
    }

    pub fn set_positional(&self, id: PlayId, positional: bool) {
        self.post(AudioCommand::SetPositional { id, positional });
    }

    /// Move a play into or out of the music category. Music follows the
    /// music volume, ignores the global pitch shift, and is held silent
    /// while the music volume is zero.
    pub fn set_is_music(&self, id: PlayId, is_music: bool) {
        self.post(AudioCommand::SetIsMusic { id, is_music });
    }

    /// Fade a play out over `duration`, then stop it. Re-posting a fade
    /// for the same play does not restart it.
    pub fn set_fade(&mut self, id: PlayId, duration: Duration) {
        self.reservations.note_fade(id, Instant::now() + duration);
        self.post(AudioCommand::SetFade { id, duration });
    }

    /// Set the music and sound category volumes. Dropping the music volume
    /// to zero fades playing music into a silent hold instead of killing
    /// it; raising it back resumes from where the music left off.
    pub fn set_volumes(&self, music: f32, sound: f32) {
        self.post(AudioCommand::SetVolumes { music, sound });
    }

    /// Global pitch shift for non-music plays.
    pub fn set_pitch(&self, pitch: f32) {
        self.post(AudioCommand::SetPitch { pitch });
    }

    /// Pause or resume all playback. Composes with OS interruptions:
    /// playback runs only when neither holds.
    pub fn set_paused(&self, paused: bool) {
        self.post(AudioCommand::SetPaused { paused });
    }

    /// The platform suspended audio (phone call, focus loss, ...).
    pub fn begin_interruption(&self) {
        self.post(AudioCommand::BeginInterruption);
    }

    pub fn end_interruption(&self) {
        self.post(AudioCommand::EndInterruption);
    }

    pub fn set_listener_position(&self, position: Vec3) {
        self.post(AudioCommand::SetListenerPosition { position });
    }

    pub fn set_listener_orientation(&self, forward: Vec3, up: Vec3) {
        self.post(AudioCommand::SetListenerOrientation { forward, up });
    }

    /// Tell the audio thread the backend has queued asset loads to advance.
    pub fn notify_pending_loads(&self) {
        self.post(AudioCommand::PendingLoads);
    }

    /// Stop all plays of these assets and release the given refs. The refs
    /// come back through [`clear_deleted`](AudioServer::clear_deleted) once
    /// the audio thread is done with them.
    pub fn unload(&self, sounds: Vec<SoundRef>) {
        self.post(AudioCommand::Unload { sounds });
    }

    /// Stop everything and return the audio thread to a fresh state.
    /// Volumes and pause state are kept.
    pub fn reset(&self) {
        self.post(AudioCommand::Reset);
    }

    /// Drop every sound ref the audio thread has released. Returns how
    /// many died. Call periodically from the thread that created the refs.
    pub fn clear_deleted(&self) -> usize {
        self.shared.drain_deleted()
    }

    /// The client pause flag as most recently applied by the audio thread.
    /// A just posted pause shows up here only once the thread has handled
    /// it, and an OS interruption never sets it: this reports what the
    /// caller asked for, not whether playback is currently suspended.
    pub fn paused(&self) -> bool {
        self.shared.paused()
    }

    /// Check if the audio thread is still running
    pub fn is_alive(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    fn post(&self, command: AudioCommand) -> bool {
        let Some(ref tx) = self.tx else {
            warn!("Audio command sender already dropped");
            return false;
        };
        if tx.post(command) {
            true
        } else {
            warn!("Audio thread disconnected");
            false
        }
    }
}

impl Drop for AudioServer {
    fn drop(&mut self) {
        // IMPORTANT: Drop the sender FIRST to signal the thread to exit.
        // The loop's next() will return None and break. If we join()
        // before dropping the sender, we deadlock!
        drop(self.tx.take());

        if let Some(thread) = self.thread.take() {
            // Now wait for the thread to finish
            let _ = thread.join();
        }

        // The thread parked every ref it still held on the delete list on
        // its way out; they die here, on their home thread.
        self.shared.drain_deleted();
    }
}
