//! Per-slot playback state on the audio thread.

use std::time::Instant;

use glam::Vec3;

use crate::assets::SoundRef;
use crate::backend::Voice;
use crate::play_id::PlayId;

/// One slot of the source pool.
///
/// The slot and its voice are permanent; `sound`, `generation`, and the
/// flag set change as plays come and go. A slot whose `playing` is false
/// matches no [`PlayId`], so commands aimed at a finished play fall
/// through.
pub(super) struct ThreadSource {
    pub index: u16,
    /// Generation of the play currently (or most recently) bound here.
    pub generation: u16,
    pub sound: Option<SoundRef>,
    pub voice: Box<dyn Voice>,
    pub playing: bool,
    /// Client-set gain, before fades and category volume.
    pub gain: f32,
    /// Multiplier owned by the fade scheduler.
    pub fade_gain: f32,
    pub position: Vec3,
    pub looping: bool,
    pub positional: bool,
    pub is_music: bool,
    /// Faded out by a music-volume drop; resident but held silent.
    pub pause_faded: bool,
    /// Whether the voice is currently told to pause.
    pub voice_suspended: bool,
    pub started_at: Instant,
}

impl ThreadSource {
    pub fn new(index: u16, voice: Box<dyn Voice>, now: Instant) -> Self {
        Self {
            index,
            generation: 0,
            sound: None,
            voice,
            playing: false,
            gain: 1.0,
            fade_gain: 1.0,
            position: Vec3::ZERO,
            looping: false,
            positional: false,
            is_music: false,
            pause_faded: false,
            voice_suspended: false,
            started_at: now,
        }
    }

    pub fn play_id(&self) -> PlayId {
        PlayId::new(self.index, self.generation)
    }

    /// Whether `id` addresses the play bound to this slot right now.
    pub fn matches(&self, id: PlayId) -> bool {
        self.playing && self.generation == id.generation()
    }

    pub fn effective_gain(&self, music_volume: f32, sound_volume: f32) -> f32 {
        let category = if self.is_music {
            music_volume
        } else {
            sound_volume
        };
        self.gain * self.fade_gain * category
    }

    pub fn apply_gain(&mut self, music_volume: f32, sound_volume: f32) {
        let gain = self.effective_gain(music_volume, sound_volume);
        self.voice.set_gain(gain);
    }

    /// Music ignores the global pitch shift.
    pub fn apply_pitch(&mut self, pitch: f32) {
        let pitch = if self.is_music { 1.0 } else { pitch };
        self.voice.set_pitch(pitch);
    }

    /// Bring the voice's pause state in line with the wanted one. The
    /// voice is paused whenever the server is suspended or this slot sits
    /// behind a completed pause fade.
    pub fn sync_suspension(&mut self, globally_suspended: bool, now: Instant) {
        let want = globally_suspended || self.pause_faded;
        if want == self.voice_suspended {
            return;
        }
        if want {
            self.voice.pause(now);
        } else {
            self.voice.resume(now);
        }
        self.voice_suspended = want;
    }
}
