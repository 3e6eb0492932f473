//! Audio thread health monitoring and diagnostics

use std::time::Instant;

use tracing::debug;

/// How often the audio thread reports its counters.
const LOG_INTERVAL_SECS: u64 = 10;

/// Metrics for audio thread health monitoring and diagnostics
#[derive(Debug, Clone)]
pub(super) struct AudioMetrics {
    /// Commands handled (ticks included)
    pub commands_processed: u64,
    /// Periodic process ticks
    pub ticks: u64,
    /// Plays bound to a slot
    pub sources_started: u64,
    /// Plays that ran out on their own
    pub sources_completed: u64,
    /// Plays stopped by command, fade, unload, or reset
    pub sources_stopped: u64,
    /// Per-play commands dropped on a generation mismatch
    pub stale_commands: u64,
    /// Fades installed
    pub fades_installed: u64,
    /// Fades that reached silence and applied their target
    pub fades_completed: u64,
    /// Sound refs handed back to the logic thread
    pub refs_deferred: u64,
    /// Timestamp of last metrics log
    pub last_log_time: Instant,
}

impl AudioMetrics {
    pub fn new() -> Self {
        Self {
            commands_processed: 0,
            ticks: 0,
            sources_started: 0,
            sources_completed: 0,
            sources_stopped: 0,
            stale_commands: 0,
            fades_installed: 0,
            fades_completed: 0,
            refs_deferred: 0,
            last_log_time: Instant::now(),
        }
    }

    /// Log counters if enough time has passed, then reset them so each
    /// report covers one interval.
    pub fn maybe_log(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_log_time).as_secs() < LOG_INTERVAL_SECS {
            return;
        }

        debug!(
            "🔊 AUDIO METRICS [tid={:?}]: cmds={}, ticks={}, started={}, \
             completed={}, stopped={}, stale={}, fades={}+/{}-, deferred={}",
            std::thread::current().id(),
            self.commands_processed,
            self.ticks,
            self.sources_started,
            self.sources_completed,
            self.sources_stopped,
            self.stale_commands,
            self.fades_installed,
            self.fades_completed,
            self.refs_deferred,
        );

        self.commands_processed = 0;
        self.ticks = 0;
        self.sources_started = 0;
        self.sources_completed = 0;
        self.sources_stopped = 0;
        self.stale_commands = 0;
        self.fades_installed = 0;
        self.fades_completed = 0;
        self.refs_deferred = 0;
        self.last_log_time = now;
    }
}
