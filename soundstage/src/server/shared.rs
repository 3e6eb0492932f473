//! State shared between the logic and audio threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::assets::SoundRef;

/// Cross-thread coordination state.
///
/// All command traffic rides the loop channel; this holds the few things a
/// channel cannot express: which slots are claimable without a round trip,
/// the applied client pause flag, and custody transfer of asset refs back
/// to the logic thread.
pub(super) struct SharedAudio {
    /// One claim flag per pool slot. The logic thread sets a flag when it
    /// reserves the slot; the audio thread clears it once teardown is
    /// complete (and re-asserts it when a play binds). Flags never lie in
    /// the dangerous direction: a clear flag means any previous play's ref
    /// has already been handed back.
    in_use: Box<[AtomicBool]>,
    /// Sound refs the audio thread is done with, waiting to be dropped on
    /// the logic thread.
    delete_list: Mutex<Vec<SoundRef>>,
    /// Client pause flag as last applied by the audio thread. An OS
    /// interruption suspends playback too but does not show here.
    paused: AtomicBool,
    #[cfg(debug_assertions)]
    home: std::thread::ThreadId,
}

impl SharedAudio {
    pub fn new(pool_size: usize) -> Self {
        Self {
            in_use: (0..pool_size).map(|_| AtomicBool::new(false)).collect(),
            delete_list: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
            #[cfg(debug_assertions)]
            home: std::thread::current().id(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.in_use.len()
    }

    pub fn is_in_use(&self, slot: u16) -> bool {
        self.in_use[slot as usize].load(Ordering::Acquire)
    }

    pub fn claim(&self, slot: u16) {
        self.in_use[slot as usize].store(true, Ordering::Release);
    }

    pub fn release(&self, slot: u16) {
        self.in_use[slot as usize].store(false, Ordering::Release);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Queue a ref for destruction on the logic thread.
    pub fn defer_delete(&self, sound: SoundRef) {
        self.lock_delete_list().push(sound);
    }

    /// Number of refs waiting to be dropped.
    pub fn deferred_len(&self) -> usize {
        self.lock_delete_list().len()
    }

    /// Drop all queued refs. Must run on the thread that owns them.
    pub fn drain_deleted(&self) -> usize {
        #[cfg(debug_assertions)]
        debug_assert_eq!(
            std::thread::current().id(),
            self.home,
            "deferred sound refs drained off their home thread"
        );
        let drained = {
            let mut list = self.lock_delete_list();
            std::mem::take(&mut *list)
        };
        // Refs are dropped here, outside the lock.
        drained.len()
    }

    fn lock_delete_list(&self) -> MutexGuard<'_, Vec<SoundRef>> {
        self.delete_list.lock().unwrap_or_else(|e| {
            warn!("Audio delete list mutex poisoned; continuing");
            e.into_inner()
        })
    }
}
