//! Commands posted from the logic thread to the audio thread.

use std::time::Duration;

use glam::Vec3;

use crate::assets::SoundRef;
use crate::play_id::PlayId;

/// Everything the audio thread can be asked to do.
///
/// Per-play commands carry the [`PlayId`] they were issued against. The
/// thread drops them without comment when the id no longer matches the
/// slot's generation, so a command racing the natural end of its play is
/// harmless.
#[derive(Debug, Clone)]
pub(super) enum AudioCommand {
    /// Periodic tick driven by the loop timer.
    Process,
    /// Begin playback on the slot the producer reserved for `id`.
    Play { id: PlayId, sound: SoundRef },
    /// Halt playback immediately and free the slot.
    Stop { id: PlayId },
    /// The issuing side released its handle on the play. Same release
    /// path as [`AudioCommand::Stop`].
    End { id: PlayId },
    SetGain { id: PlayId, gain: f32 },
    SetPosition { id: PlayId, position: Vec3 },
    SetLooping { id: PlayId, looping: bool },
    SetPositional { id: PlayId, positional: bool },
    SetIsMusic { id: PlayId, is_music: bool },
    /// Install a fade-to-stop over `duration`.
    SetFade { id: PlayId, duration: Duration },
    SetVolumes { music: f32, sound: f32 },
    SetPitch { pitch: f32 },
    SetPaused { paused: bool },
    BeginInterruption,
    EndInterruption,
    SetListenerPosition { position: Vec3 },
    SetListenerOrientation { forward: Vec3, up: Vec3 },
    /// The backend has queued loads to advance on its own thread.
    PendingLoads,
    /// Stop every playing instance of these assets, then hand the refs
    /// back for dropping.
    Unload { sounds: Vec<SoundRef> },
    /// Release everything and return to a fresh state.
    Reset,
}
