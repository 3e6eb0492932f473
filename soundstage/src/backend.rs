//! Playback backend seam.
//!
//! The audio thread owns mixing policy (what plays, at what gain, when a
//! fade ends) and pushes the results through these traits. A backend owns
//! the actual signal path. [`NullBackend`] is the built-in implementation
//! used by tests and the demo: it models voice lifetimes against the clock
//! values it is handed and produces no sound, which keeps every test
//! deterministic.

use std::time::{Duration, Instant};

use glam::Vec3;

use crate::assets::SoundAsset;

/// One playback channel inside a backend.
///
/// All time-dependent methods take the caller's `now` so implementations
/// never need to consult the wall clock themselves.
pub trait Voice: Send {
    /// Begin playing an asset from the start.
    fn start(&mut self, asset: &SoundAsset, looping: bool, now: Instant);

    /// Halt playback and release any backend-side channel state.
    fn stop(&mut self);

    /// Freeze playback position.
    fn pause(&mut self, now: Instant);

    /// Continue from the frozen position.
    fn resume(&mut self, now: Instant);

    /// Whether the voice still occupies its channel. Paused voices count as
    /// playing; a finished one-shot does not.
    fn is_playing(&self, now: Instant) -> bool;

    fn set_gain(&mut self, gain: f32);

    fn set_pitch(&mut self, pitch: f32);

    fn set_position(&mut self, position: Vec3);

    /// Change looping after start. Clearing it lets the current pass run
    /// out naturally.
    fn set_looping(&mut self, looping: bool);

    /// Periodic chance to refill stream buffers. Only called for voices
    /// playing streamed assets; non-streaming backends can ignore it.
    fn service(&mut self, now: Instant) {
        let _ = now;
    }
}

/// Factory and global state for a playback implementation.
pub trait AudioBackend: Send {
    fn create_voice(&mut self) -> Box<dyn Voice>;

    fn set_listener_position(&mut self, position: Vec3);

    fn set_listener_orientation(&mut self, forward: Vec3, up: Vec3);

    /// Advance any in-flight asset loads. Returns true while more work
    /// remains, so the caller keeps polling.
    fn process_pending_loads(&mut self) -> bool;

    /// Drop all backend-side state in preparation for a fresh start.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy)]
enum VoiceState {
    Idle,
    Playing { deadline: Instant },
    Paused { remaining: Duration },
}

/// A [`Voice`] that tracks lifetimes without producing sound.
#[derive(Debug)]
pub struct NullVoice {
    state: VoiceState,
    looping: bool,
    gain: f32,
    pitch: f32,
    position: Vec3,
    service_count: u32,
}

impl NullVoice {
    pub fn new() -> Self {
        Self {
            state: VoiceState::Idle,
            looping: false,
            gain: 1.0,
            pitch: 1.0,
            position: Vec3::ZERO,
            service_count: 0,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn service_count(&self) -> u32 {
        self.service_count
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, VoiceState::Paused { .. })
    }
}

impl Default for NullVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for NullVoice {
    fn start(&mut self, asset: &SoundAsset, looping: bool, now: Instant) {
        self.looping = looping;
        self.state = VoiceState::Playing {
            deadline: now + asset.duration(),
        };
    }

    fn stop(&mut self) {
        self.state = VoiceState::Idle;
    }

    fn pause(&mut self, now: Instant) {
        if let VoiceState::Playing { deadline } = self.state {
            self.state = VoiceState::Paused {
                remaining: deadline.saturating_duration_since(now),
            };
        }
    }

    fn resume(&mut self, now: Instant) {
        if let VoiceState::Paused { remaining } = self.state {
            self.state = VoiceState::Playing {
                deadline: now + remaining,
            };
        }
    }

    fn is_playing(&self, now: Instant) -> bool {
        match self.state {
            VoiceState::Idle => false,
            VoiceState::Paused { .. } => true,
            VoiceState::Playing { deadline } => self.looping || now < deadline,
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn service(&mut self, _now: Instant) {
        self.service_count += 1;
    }
}

/// An [`AudioBackend`] that vends [`NullVoice`]s and records what it was
/// told. Loads complete immediately.
#[derive(Debug, Default)]
pub struct NullBackend {
    listener_position: Vec3,
    listener_forward: Vec3,
    listener_up: Vec3,
    load_passes: u32,
    resets: u32,
    voices_created: u32,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_position(&self) -> Vec3 {
        self.listener_position
    }

    pub fn listener_forward(&self) -> Vec3 {
        self.listener_forward
    }

    pub fn listener_up(&self) -> Vec3 {
        self.listener_up
    }

    pub fn load_passes(&self) -> u32 {
        self.load_passes
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn voices_created(&self) -> u32 {
        self.voices_created
    }
}

impl AudioBackend for NullBackend {
    fn create_voice(&mut self) -> Box<dyn Voice> {
        self.voices_created += 1;
        Box::new(NullVoice::new())
    }

    fn set_listener_position(&mut self, position: Vec3) {
        self.listener_position = position;
    }

    fn set_listener_orientation(&mut self, forward: Vec3, up: Vec3) {
        self.listener_forward = forward;
        self.listener_up = up;
    }

    fn process_pending_loads(&mut self) -> bool {
        self.load_passes += 1;
        false
    }

    fn reset(&mut self) {
        self.listener_position = Vec3::ZERO;
        self.listener_forward = Vec3::ZERO;
        self.listener_up = Vec3::ZERO;
        self.load_passes = 0;
        self.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(ms: u64) -> SoundAsset {
        SoundAsset::new("clip", Duration::from_millis(ms))
    }

    #[test]
    fn test_one_shot_ends_at_deadline() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.start(&asset(100), false, now);

        assert!(voice.is_playing(now));
        assert!(voice.is_playing(now + Duration::from_millis(99)));
        assert!(!voice.is_playing(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_looping_voice_never_ends() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.start(&asset(100), true, now);

        assert!(voice.is_playing(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_pause_extends_deadline_by_the_pause() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.start(&asset(100), false, now);

        // Pause at 40ms in, sit paused for a full second, then resume.
        voice.pause(now + Duration::from_millis(40));
        assert!(voice.is_paused());
        assert!(voice.is_playing(now + Duration::from_secs(1)));

        let resumed = now + Duration::from_millis(1040);
        voice.resume(resumed);
        assert!(voice.is_playing(resumed + Duration::from_millis(59)));
        assert!(!voice.is_playing(resumed + Duration::from_millis(60)));
    }

    #[test]
    fn test_stop_is_immediate() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.start(&asset(100), true, now);
        voice.stop();
        assert!(!voice.is_playing(now));
    }

    #[test]
    fn test_unloop_lets_the_voice_run_out() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.start(&asset(100), true, now);
        assert!(voice.is_playing(now + Duration::from_secs(10)));

        voice.set_looping(false);
        assert!(voice.is_playing(now + Duration::from_millis(99)));
        assert!(!voice.is_playing(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_resume_without_pause_is_a_no_op() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.start(&asset(100), false, now);
        voice.resume(now + Duration::from_millis(50));
        assert!(!voice.is_playing(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_service_counts_calls() {
        let now = Instant::now();
        let mut voice = NullVoice::new();
        voice.service(now);
        voice.service(now);
        assert_eq!(voice.service_count(), 2);
    }

    #[test]
    fn test_backend_records_listener_and_loads() {
        let mut backend = NullBackend::new();
        backend.set_listener_position(Vec3::new(1.0, 2.0, 3.0));
        backend.set_listener_orientation(Vec3::NEG_Z, Vec3::Y);
        assert_eq!(backend.listener_position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(backend.listener_forward(), Vec3::NEG_Z);
        assert_eq!(backend.listener_up(), Vec3::Y);

        assert!(!backend.process_pending_loads());
        assert_eq!(backend.load_passes(), 1);

        let _ = backend.create_voice();
        let _ = backend.create_voice();
        assert_eq!(backend.voices_created(), 2);

        backend.reset();
        assert_eq!(backend.listener_position(), Vec3::ZERO);
        assert_eq!(backend.load_passes(), 0);
        assert_eq!(backend.resets(), 1);
        assert_eq!(backend.voices_created(), 2);
    }
}
