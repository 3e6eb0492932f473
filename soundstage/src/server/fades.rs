//! Gain fades applied on the audio thread.

use std::time::{Duration, Instant};

use crate::play_id::PlayId;

/// What happens when a fade reaches silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FadeTarget {
    /// Release the source.
    Stop,
    /// Keep the source resident at zero gain, ready to resume.
    Pause,
}

/// One in-flight fade.
///
/// The gain scale runs linearly from 1 at `started` to exactly 0 at
/// `started + duration` and never rises in between. It multiplies the
/// source's own gain rather than replacing it, so a completed pause fade
/// can restore the pre-fade level by resetting the scale to 1.
#[derive(Debug, Clone, Copy)]
pub(super) struct FadeNode {
    pub play_id: PlayId,
    pub started: Instant,
    pub duration: Duration,
    pub target: FadeTarget,
}

impl FadeNode {
    pub fn new(play_id: PlayId, started: Instant, duration: Duration, target: FadeTarget) -> Self {
        Self {
            play_id,
            started,
            duration,
            target,
        }
    }

    /// Remaining gain scale at `now`, in `[0, 1]`.
    pub fn fraction(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= self.duration {
            return 0.0;
        }
        1.0 - elapsed.as_secs_f32() / self.duration.as_secs_f32()
    }

    pub fn finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }

    pub fn deadline(&self) -> Instant {
        self.started + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(duration_ms: u64) -> (FadeNode, Instant) {
        let started = Instant::now();
        let fade = FadeNode::new(
            PlayId::new(0, 1),
            started,
            Duration::from_millis(duration_ms),
            FadeTarget::Stop,
        );
        (fade, started)
    }

    #[test]
    fn test_fraction_starts_at_one() {
        let (fade, started) = node(100);
        assert!((fade.fraction(started) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fraction_hits_midpoint() {
        let (fade, started) = node(100);
        let mid = fade.fraction(started + Duration::from_millis(50));
        assert!((mid - 0.5).abs() < 0.001, "midpoint was {mid}");
    }

    #[test]
    fn test_fraction_never_rises() {
        let (fade, started) = node(100);
        let mut last = f32::INFINITY;
        for ms in 0..=110 {
            let f = fade.fraction(started + Duration::from_millis(ms));
            assert!(f <= last, "fraction rose at {ms}ms: {f} > {last}");
            last = f;
        }
    }

    #[test]
    fn test_fraction_exactly_zero_at_duration() {
        let (fade, started) = node(100);
        assert_eq!(fade.fraction(started + Duration::from_millis(100)), 0.0);
        assert_eq!(fade.fraction(started + Duration::from_secs(60)), 0.0);
        assert!(fade.finished(started + Duration::from_millis(100)));
        assert!(!fade.finished(started + Duration::from_millis(99)));
    }

    #[test]
    fn test_zero_duration_is_finished_immediately() {
        let (fade, started) = node(0);
        assert_eq!(fade.fraction(started), 0.0);
        assert!(fade.finished(started));
    }

    #[test]
    fn test_time_before_start_clamps_to_full() {
        let (fade, started) = node(100);
        // Clock skew between posting and handling never raises the scale.
        let f = fade.fraction(started - Duration::from_millis(10));
        assert!((f - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_deadline() {
        let (fade, started) = node(250);
        assert_eq!(fade.deadline(), started + Duration::from_millis(250));
    }
}
