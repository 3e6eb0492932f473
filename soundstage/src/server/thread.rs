//! Audio thread implementation.
//!
//! Owns the source pool and all mixing policy. Driven entirely by
//! [`AudioCommand`]s arriving over the loop channel, including the periodic
//! `Process` tick, so every state change happens on this one thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use hashbrown::HashMap;
use smallvec::SmallVec;
use stagehand::{EventLoop, TimerId};
use tracing::{debug, trace, warn};

use crate::assets::SoundRef;
use crate::backend::AudioBackend;
use crate::config::AudioConfig;
use crate::play_id::PlayId;

use super::commands::AudioCommand;
use super::fades::{FadeNode, FadeTarget};
use super::metrics::AudioMetrics;
use super::shared::SharedAudio;
use super::sources::ThreadSource;

/// Audio thread state.
///
/// The pool is fixed at construction; plays are bound to slots the logic
/// thread reserved, addressed by slot and defused by generation. Commands
/// whose generation no longer matches are dropped without logging, which is
/// what makes fire-and-forget ids safe.
pub(super) struct AudioThread {
    pub(super) sources: Vec<ThreadSource>,
    /// In-flight fades keyed by slot. At most one per slot.
    pub(super) fades: HashMap<u16, FadeNode>,
    backend: Box<dyn AudioBackend>,
    shared: Arc<SharedAudio>,
    music_volume: f32,
    sound_volume: f32,
    sound_pitch: f32,
    /// Client-requested pause.
    paused: bool,
    /// OS-level interruption. Composes with `paused`; playback resumes
    /// only when both are clear.
    interrupted: bool,
    pub(super) have_pending_loads: bool,
    last_stream_service: Instant,
    last_sanity_check: Instant,
    config: AudioConfig,
    pub(super) metrics: AudioMetrics,
}

impl AudioThread {
    pub fn new(config: AudioConfig, mut backend: Box<dyn AudioBackend>, shared: Arc<SharedAudio>) -> Self {
        let now = Instant::now();
        let sources = (0..shared.pool_size())
            .map(|i| ThreadSource::new(i as u16, backend.create_voice(), now))
            .collect();
        Self {
            sources,
            fades: HashMap::new(),
            backend,
            shared,
            music_volume: config.music_volume,
            sound_volume: config.sound_volume,
            sound_pitch: 1.0,
            paused: false,
            interrupted: false,
            have_pending_loads: false,
            last_stream_service: now,
            last_sanity_check: now,
            config,
            metrics: AudioMetrics::new(),
        }
    }

    /// Main thread loop. Exits once every producer handle is gone and the
    /// queue has drained.
    pub fn run(mut self, mut events: EventLoop<AudioCommand>, tick_timer: TimerId) {
        debug!("Audio thread started ({} source slots)", self.sources.len());
        let mut current_tick = self.config.idle_tick();

        while let Some(command) = events.next() {
            self.metrics.commands_processed += 1;
            self.handle_command(command, Instant::now());

            // Tighten the tick while anything needs per-tick servicing,
            // relax it when idle. Only touch the timer on a change so the
            // cadence is not perpetually rescheduled away.
            let desired = self.desired_tick();
            if desired != current_tick {
                trace!("Audio tick interval -> {:?}", desired);
                events.set_timer_interval(tick_timer, desired);
                current_tick = desired;
            }
        }

        self.shutdown();
        debug!("Audio thread finished");
    }

    pub fn desired_tick(&self) -> Duration {
        let busy = !self.fades.is_empty()
            || self
                .sources
                .iter()
                .any(|s| s.playing && !s.voice_suspended);
        if busy {
            self.config.active_tick()
        } else {
            self.config.idle_tick()
        }
    }

    pub fn handle_command(&mut self, command: AudioCommand, now: Instant) {
        match command {
            AudioCommand::Process => self.process(now),
            AudioCommand::Play { id, sound } => self.play(id, sound, now),
            // Stop and End share the release path; End is the flavor posted
            // when the issuing side lets go of its handle.
            AudioCommand::Stop { id } | AudioCommand::End { id } => {
                if let Some(i) = self.match_slot(id) {
                    self.metrics.sources_stopped += 1;
                    self.release_slot(i);
                }
            }
            AudioCommand::SetGain { id, gain } => {
                if let Some(i) = self.match_slot(id) {
                    let source = &mut self.sources[i];
                    source.gain = gain;
                    source.apply_gain(self.music_volume, self.sound_volume);
                }
            }
            AudioCommand::SetPosition { id, position } => {
                if let Some(i) = self.match_slot(id) {
                    let source = &mut self.sources[i];
                    source.position = position;
                    if source.positional {
                        source.voice.set_position(position);
                    }
                }
            }
            AudioCommand::SetLooping { id, looping } => {
                if let Some(i) = self.match_slot(id) {
                    let source = &mut self.sources[i];
                    source.looping = looping;
                    source.voice.set_looping(looping);
                }
            }
            AudioCommand::SetPositional { id, positional } => {
                if let Some(i) = self.match_slot(id) {
                    let source = &mut self.sources[i];
                    source.positional = positional;
                    // Non-positional playback sits at the listener.
                    let position = if positional { source.position } else { Vec3::ZERO };
                    source.voice.set_position(position);
                }
            }
            AudioCommand::SetIsMusic { id, is_music } => {
                if let Some(i) = self.match_slot(id) {
                    self.sources[i].is_music = is_music;
                    self.sources[i].apply_gain(self.music_volume, self.sound_volume);
                    self.sources[i].apply_pitch(self.sound_pitch);
                    if is_music {
                        if self.music_volume <= 0.0 && !self.sources[i].pause_faded {
                            self.install_fade(id, self.config.pause_fade(), FadeTarget::Pause, now);
                        }
                    } else {
                        // Leaving the music category lifts any music hold.
                        self.lift_pause_fade(i, now);
                    }
                }
            }
            AudioCommand::SetFade { id, duration } => {
                if self.match_slot(id).is_some() {
                    self.install_fade(id, duration, FadeTarget::Stop, now);
                }
            }
            AudioCommand::SetVolumes { music, sound } => {
                self.music_volume = music;
                self.sound_volume = sound;
                self.update_music_state(now);
                self.apply_all_gains();
            }
            AudioCommand::SetPitch { pitch } => {
                self.sound_pitch = pitch;
                for source in &mut self.sources {
                    if source.playing {
                        source.apply_pitch(pitch);
                    }
                }
            }
            AudioCommand::SetPaused { paused } => {
                if self.paused != paused {
                    self.paused = paused;
                    self.shared.set_paused(paused);
                    self.apply_suspension(now);
                }
            }
            AudioCommand::BeginInterruption => {
                self.interrupted = true;
                self.apply_suspension(now);
            }
            AudioCommand::EndInterruption => {
                self.interrupted = false;
                self.apply_suspension(now);
            }
            AudioCommand::SetListenerPosition { position } => {
                self.backend.set_listener_position(position);
            }
            AudioCommand::SetListenerOrientation { forward, up } => {
                self.backend.set_listener_orientation(forward, up);
            }
            AudioCommand::PendingLoads => {
                self.have_pending_loads = true;
            }
            AudioCommand::Unload { sounds } => self.unload(sounds),
            AudioCommand::Reset => self.reset(),
        }
    }

    /// Periodic tick: advance fades, reap finished plays, then the slower
    /// chores on their own cadences.
    pub fn process(&mut self, now: Instant) {
        self.metrics.ticks += 1;

        self.process_fades(now);
        self.reap_finished(now);

        if self.have_pending_loads {
            self.have_pending_loads = self.backend.process_pending_loads();
        }

        if now.saturating_duration_since(self.last_stream_service) >= self.config.stream_tick() {
            self.last_stream_service = now;
            self.service_streams(now);
        }

        if now.saturating_duration_since(self.last_sanity_check)
            >= self.config.sanity_check_interval()
        {
            self.last_sanity_check = now;
            self.sanity_check();
        }

        self.metrics.maybe_log(now);
    }

    /// Resolve a per-play command to its slot. `None` means the play is
    /// over or the id was recycled; the command is dropped in silence.
    fn match_slot(&mut self, id: PlayId) -> Option<usize> {
        let i = id.slot() as usize;
        let matched = self.sources.get(i).is_some_and(|s| s.matches(id));
        if !matched {
            self.metrics.stale_commands += 1;
            return None;
        }
        Some(i)
    }

    fn play(&mut self, id: PlayId, sound: SoundRef, now: Instant) {
        let i = id.slot() as usize;
        if i >= self.sources.len() {
            // Even a bogus play's ref must go home to die.
            warn!("Play {} addresses a slot outside the pool", id);
            self.shared.defer_delete(sound);
            self.metrics.refs_deferred += 1;
            return;
        }
        if self.sources[i].playing {
            // The producer stops a victim before reusing its slot, so an
            // occupied slot here means that stop was overtaken. Newest wins.
            warn!("Slot {} still occupied when play {} arrived; releasing", i, id);
            self.metrics.sources_stopped += 1;
            self.release_slot(i);
        }
        self.fades.remove(&id.slot());

        trace!("Play {} started: {}", id, sound.name());
        let source = &mut self.sources[i];
        source.generation = id.generation();
        source.gain = 1.0;
        source.fade_gain = 1.0;
        source.position = Vec3::ZERO;
        source.looping = false;
        source.positional = false;
        source.is_music = false;
        source.pause_faded = false;
        source.voice_suspended = false;
        source.started_at = now;
        source.voice.set_position(Vec3::ZERO);
        source.voice.start(&sound, false, now);
        source.sound = Some(sound);
        source.playing = true;
        source.apply_gain(self.music_volume, self.sound_volume);
        source.apply_pitch(self.sound_pitch);

        // A play issued while suspended starts held, not skipped.
        let suspended = self.globally_suspended();
        self.sources[i].sync_suspension(suspended, now);
        self.shared.claim(id.slot());
        self.metrics.sources_started += 1;
    }

    /// Tear down a slot and hand its ref back to the logic thread. The
    /// claim flag is cleared last, after the ref is safely queued.
    fn release_slot(&mut self, i: usize) {
        let slot = self.sources[i].index;
        self.fades.remove(&slot);
        let source = &mut self.sources[i];
        source.voice.stop();
        source.playing = false;
        source.pause_faded = false;
        source.voice_suspended = false;
        source.fade_gain = 1.0;
        if let Some(sound) = source.sound.take() {
            self.shared.defer_delete(sound);
            self.metrics.refs_deferred += 1;
        }
        self.shared.release(slot);
    }

    /// Install a fade unless the slot already has one. Fades are idempotent,
    /// not additive: re-posting never restarts the ramp, and a fade in
    /// flight is never retargeted.
    fn install_fade(&mut self, id: PlayId, duration: Duration, target: FadeTarget, now: Instant) {
        let slot = id.slot();
        if self.fades.contains_key(&slot) {
            return;
        }
        self.fades.insert(slot, FadeNode::new(id, now, duration, target));
        self.metrics.fades_installed += 1;
    }

    fn process_fades(&mut self, now: Instant) {
        let (music_volume, sound_volume) = (self.music_volume, self.sound_volume);
        let mut finished: SmallVec<[u16; 8]> = SmallVec::new();

        for (&slot, node) in &self.fades {
            let Some(source) = self.sources.get_mut(slot as usize) else {
                finished.push(slot);
                continue;
            };
            if !source.matches(node.play_id) {
                // The play ended under the fade; nothing left to scale.
                finished.push(slot);
                continue;
            }
            source.fade_gain = node.fraction(now);
            source.apply_gain(music_volume, sound_volume);
            if node.finished(now) {
                finished.push(slot);
            }
        }

        for slot in finished {
            let Some(node) = self.fades.remove(&slot) else {
                continue;
            };
            let i = slot as usize;
            if !self.sources[i].matches(node.play_id) {
                continue;
            }
            self.metrics.fades_completed += 1;
            match node.target {
                FadeTarget::Stop => {
                    trace!("Fade finished, stopping {}", node.play_id);
                    self.metrics.sources_stopped += 1;
                    self.release_slot(i);
                }
                FadeTarget::Pause => {
                    trace!("Fade finished, holding {}", node.play_id);
                    let suspended = self.globally_suspended();
                    let source = &mut self.sources[i];
                    source.pause_faded = true;
                    // The scale snaps back so the voice resumes at its
                    // pre-fade level once the hold lifts.
                    source.fade_gain = 1.0;
                    source.sync_suspension(suspended, now);
                    source.apply_gain(music_volume, sound_volume);
                }
            }
        }
    }

    /// Release slots whose voices ran out on their own.
    fn reap_finished(&mut self, now: Instant) {
        for i in 0..self.sources.len() {
            let source = &self.sources[i];
            if source.playing && !source.voice_suspended && !source.voice.is_playing(now) {
                trace!("Play {} ran out", source.play_id());
                self.metrics.sources_completed += 1;
                self.release_slot(i);
            }
        }
    }

    fn service_streams(&mut self, now: Instant) {
        for source in &mut self.sources {
            if !source.playing || source.voice_suspended {
                continue;
            }
            if source.sound.as_ref().is_some_and(|s| s.is_streamed()) {
                source.voice.service(now);
            }
        }
    }

    /// Cross-check the claim flags against pool state. Claimed-but-idle is
    /// the normal window between a reserve and its play landing, so only
    /// the other direction gets repaired.
    fn sanity_check(&mut self) {
        for source in &self.sources {
            if source.playing && !self.shared.is_in_use(source.index) {
                warn!("Slot {} playing without its claim flag; re-claiming", source.index);
                self.shared.claim(source.index);
            }
        }
    }

    /// Music volume changes also drive the music hold state: dropping to
    /// zero fades playing music out into a silent hold, raising it back
    /// lifts the hold.
    fn update_music_state(&mut self, now: Instant) {
        if self.music_volume > 0.0 {
            for i in 0..self.sources.len() {
                if self.sources[i].playing && self.sources[i].is_music {
                    self.lift_pause_fade(i, now);
                }
            }
        } else {
            let pause_fade = self.config.pause_fade();
            let targets: SmallVec<[PlayId; 8]> = self
                .sources
                .iter()
                .filter(|s| s.playing && s.is_music && !s.pause_faded)
                .map(|s| s.play_id())
                .collect();
            for id in targets {
                self.install_fade(id, pause_fade, FadeTarget::Pause, now);
            }
        }
    }

    fn lift_pause_fade(&mut self, i: usize, now: Instant) {
        let slot = self.sources[i].index;
        let had_fade =
            matches!(self.fades.get(&slot), Some(node) if node.target == FadeTarget::Pause);
        if had_fade {
            self.fades.remove(&slot);
        }
        let suspended = self.globally_suspended();
        let source = &mut self.sources[i];
        if had_fade || source.pause_faded {
            source.pause_faded = false;
            source.fade_gain = 1.0;
            source.sync_suspension(suspended, now);
            source.apply_gain(self.music_volume, self.sound_volume);
        }
    }

    fn apply_all_gains(&mut self) {
        let (music_volume, sound_volume) = (self.music_volume, self.sound_volume);
        for source in &mut self.sources {
            if source.playing {
                source.apply_gain(music_volume, sound_volume);
            }
        }
    }

    fn globally_suspended(&self) -> bool {
        self.paused || self.interrupted
    }

    fn apply_suspension(&mut self, now: Instant) {
        let suspended = self.globally_suspended();
        debug!("Audio {}", if suspended { "suspended" } else { "resumed" });
        for source in &mut self.sources {
            if source.playing {
                source.sync_suspension(suspended, now);
            }
        }
    }

    fn unload(&mut self, sounds: Vec<SoundRef>) {
        for i in 0..self.sources.len() {
            let hit = self.sources[i]
                .sound
                .as_ref()
                .is_some_and(|held| sounds.iter().any(|s| s.same_asset(held)));
            if hit {
                self.metrics.sources_stopped += 1;
                self.release_slot(i);
            }
        }
        trace!("Unloaded {} assets", sounds.len());
        for sound in sounds {
            self.shared.defer_delete(sound);
            self.metrics.refs_deferred += 1;
        }
    }

    fn reset(&mut self) {
        debug!("Audio thread reset");
        for i in 0..self.sources.len() {
            if self.sources[i].playing {
                self.metrics.sources_stopped += 1;
                self.release_slot(i);
            }
        }
        self.have_pending_loads = false;
        self.backend.reset();
    }

    /// Final teardown before the thread exits: every held ref goes onto the
    /// delete list so the logic thread can drain it after the join.
    pub fn shutdown(&mut self) {
        for i in 0..self.sources.len() {
            if self.sources[i].playing || self.sources[i].sound.is_some() {
                self.release_slot(i);
            }
        }
    }
}
