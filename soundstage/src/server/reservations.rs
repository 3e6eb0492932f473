//! Producer-side slot accounting.
//!
//! `play()` must hand back a usable [`PlayId`] without waiting on the
//! audio thread, so the logic thread allocates slots itself: it scans the
//! shared claim flags for a free slot, bumps that slot's generation, and
//! flags it claimed. The audio thread clears a flag only after teardown,
//! which makes a clear flag proof that the slot is safe to reuse.

use std::sync::Arc;
use std::time::Instant;

use crate::play_id::PlayId;

use super::shared::SharedAudio;

/// Outcome of a slot reservation.
pub(super) struct Reservation {
    pub play_id: PlayId,
    /// A live play the caller must stop to make room, when the pool was
    /// full. Its stop has to be posted before the new play.
    pub evicted: Option<PlayId>,
}

/// The logic thread's view of the source pool.
pub(super) struct SlotReservations {
    shared: Arc<SharedAudio>,
    /// Generation last handed out per slot. Bumped before reuse, so the
    /// first play on a slot is generation 1.
    generations: Vec<u16>,
    /// When each slot's current play was issued. Only meaningful while
    /// the slot is claimed.
    started: Vec<Instant>,
    /// Fade deadline for slots the client faded out, used to pick
    /// eviction victims.
    fade_deadline: Vec<Option<Instant>>,
}

impl SlotReservations {
    pub fn new(shared: Arc<SharedAudio>) -> Self {
        let pool_size = shared.pool_size();
        let now = Instant::now();
        Self {
            shared,
            generations: vec![0; pool_size],
            started: vec![now; pool_size],
            fade_deadline: vec![None; pool_size],
        }
    }

    /// Reserve a slot for a new play, evicting if the pool is full.
    pub fn reserve(&mut self, now: Instant) -> Reservation {
        if let Some(slot) = self.first_free() {
            return Reservation {
                play_id: self.claim(slot, now),
                evicted: None,
            };
        }

        let victim_slot = self.pick_victim();
        let evicted = PlayId::new(victim_slot, self.generations[victim_slot as usize]);
        Reservation {
            play_id: self.claim(victim_slot, now),
            evicted: Some(evicted),
        }
    }

    /// Record a fade deadline so eviction prefers this slot. Ignored when
    /// `id` no longer names the slot's current play.
    pub fn note_fade(&mut self, id: PlayId, deadline: Instant) {
        let i = id.slot() as usize;
        if i < self.generations.len() && self.generations[i] == id.generation() {
            self.fade_deadline[i] = Some(deadline);
        }
    }

    // Scan in usize: a 65536-slot pool is valid, and a u16 range bound
    // would wrap to zero there.
    fn first_free(&self) -> Option<u16> {
        (0..self.generations.len())
            .find(|&slot| !self.shared.is_in_use(slot as u16))
            .map(|slot| slot as u16)
    }

    fn claim(&mut self, slot: u16, now: Instant) -> PlayId {
        let i = slot as usize;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.started[i] = now;
        self.fade_deadline[i] = None;
        self.shared.claim(slot);
        PlayId::new(slot, self.generations[i])
    }

    /// Pick the play to sacrifice on a full pool: a fading slot with the
    /// earliest deadline if any, otherwise the least recently started.
    /// Ties go to the lowest slot.
    fn pick_victim(&self) -> u16 {
        let mut fading: Option<(usize, Instant)> = None;
        for (i, deadline) in self.fade_deadline.iter().enumerate() {
            if let Some(d) = *deadline {
                match fading {
                    Some((_, best)) if d >= best => {}
                    _ => fading = Some((i, d)),
                }
            }
        }
        if let Some((i, _)) = fading {
            return i as u16;
        }

        let mut oldest = 0usize;
        for i in 1..self.started.len() {
            if self.started[i] < self.started[oldest] {
                oldest = i;
            }
        }
        oldest as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reservations(pool_size: usize) -> SlotReservations {
        SlotReservations::new(Arc::new(SharedAudio::new(pool_size)))
    }

    #[test]
    fn test_lowest_free_slot_first() {
        let mut r = reservations(4);
        let now = Instant::now();

        let a = r.reserve(now);
        let b = r.reserve(now);

        assert_eq!(a.play_id, PlayId::new(0, 1));
        assert!(a.evicted.is_none());
        assert_eq!(b.play_id, PlayId::new(1, 1));
    }

    #[test]
    fn test_largest_pool_still_prefers_free_slots() {
        // 65536 slots is the documented ceiling; the free scan must not
        // collapse to an empty range at full width and evict.
        let mut r = reservations(1 << 16);
        let now = Instant::now();

        let a = r.reserve(now);
        let b = r.reserve(now);

        assert_eq!(a.play_id, PlayId::new(0, 1));
        assert!(a.evicted.is_none());
        assert_eq!(b.play_id, PlayId::new(1, 1));
        assert!(b.evicted.is_none());
    }

    #[test]
    fn test_generation_bumps_on_reuse() {
        let mut r = reservations(2);
        let now = Instant::now();

        let first = r.reserve(now).play_id;
        assert_eq!(first, PlayId::new(0, 1));

        // Audio-side teardown frees the slot.
        r.shared.release(0);

        let second = r.reserve(now).play_id;
        assert_eq!(second, PlayId::new(0, 2));
        assert_ne!(first, second);
    }

    #[test]
    fn test_full_pool_evicts_least_recently_started() {
        let mut r = reservations(2);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(10);
        let t2 = t0 + Duration::from_millis(20);

        let a = r.reserve(t0).play_id;
        let _b = r.reserve(t1).play_id;

        let third = r.reserve(t2);
        assert_eq!(third.evicted, Some(a));
        assert_eq!(third.play_id, PlayId::new(0, 2));
    }

    #[test]
    fn test_fading_slot_is_preferred_victim() {
        let mut r = reservations(2);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(10);
        let t2 = t0 + Duration::from_millis(20);

        let _a = r.reserve(t0).play_id;
        let b = r.reserve(t1).play_id;

        // Slot 1 is newer but fading, so it goes first.
        r.note_fade(b, t2 + Duration::from_millis(100));

        let third = r.reserve(t2);
        assert_eq!(third.evicted, Some(b));
        assert_eq!(third.play_id, PlayId::new(1, 2));
    }

    #[test]
    fn test_earliest_fade_deadline_wins() {
        let mut r = reservations(3);
        let t0 = Instant::now();

        let a = r.reserve(t0).play_id;
        let b = r.reserve(t0).play_id;
        let _c = r.reserve(t0).play_id;

        r.note_fade(a, t0 + Duration::from_millis(500));
        r.note_fade(b, t0 + Duration::from_millis(100));

        let fourth = r.reserve(t0 + Duration::from_millis(10));
        assert_eq!(fourth.evicted, Some(b));
    }

    #[test]
    fn test_oldest_eviction_ties_go_to_lowest_slot() {
        let mut r = reservations(3);
        let t0 = Instant::now();

        for _ in 0..3 {
            r.reserve(t0);
        }

        let next = r.reserve(t0 + Duration::from_millis(5));
        assert_eq!(next.evicted, Some(PlayId::new(0, 1)));
    }

    #[test]
    fn test_stale_note_fade_is_ignored() {
        let mut r = reservations(2);
        let now = Instant::now();

        let first = r.reserve(now).play_id;
        r.shared.release(0);
        let _second = r.reserve(now).play_id;

        // `first` no longer owns slot 0.
        r.note_fade(first, now + Duration::from_millis(50));
        assert!(r.fade_deadline[0].is_none());
    }

    #[test]
    fn test_claim_clears_old_fade_deadline() {
        let mut r = reservations(1);
        let now = Instant::now();

        let a = r.reserve(now).play_id;
        r.note_fade(a, now + Duration::from_millis(50));
        assert!(r.fade_deadline[0].is_some());

        // Eviction reuses the slot; the dead play's deadline goes with it.
        let b = r.reserve(now + Duration::from_millis(10));
        assert_eq!(b.evicted, Some(a));
        assert!(r.fade_deadline[0].is_none());
    }
}
