//! Consumer side of the loop: message draining and repeating timers.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::handle::LoopHandle;

/// Timers shorter than this are clamped; a zero interval would starve the
/// message queue entirely.
const MIN_TIMER_INTERVAL: Duration = Duration::from_millis(1);

/// Identifies a repeating timer registered on an [`EventLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u32);

struct TimerSlot<M> {
    id: TimerId,
    interval: Duration,
    next_fire: Instant,
    message: M,
}

/// Single-consumer message loop with repeating timers.
///
/// Created together with its [`LoopHandle`] via [`EventLoop::new`]. The loop
/// is bound to the first thread that calls [`next`](EventLoop::next); calling
/// it from another thread afterwards is a debug assertion failure.
pub struct EventLoop<M> {
    rx: mpsc::Receiver<M>,

    /// Registered repeating timers. Scanned linearly; loops carry a handful
    /// of timers, not hundreds.
    timers: Vec<TimerSlot<M>>,

    next_timer_id: u32,

    /// Thread the loop is bound to, captured on the first `next()` call.
    #[cfg(debug_assertions)]
    bound_to: Option<std::thread::ThreadId>,
}

impl<M: Clone> EventLoop<M> {
    /// Create a loop and its producer handle.
    ///
    /// The queue is unbounded: `post` never blocks and never drops a message
    /// while the loop is alive.
    pub fn new() -> (EventLoop<M>, LoopHandle<M>) {
        let (tx, rx) = mpsc::channel();
        let event_loop = EventLoop {
            rx,
            timers: Vec::new(),
            next_timer_id: 0,
            #[cfg(debug_assertions)]
            bound_to: None,
        };
        (event_loop, LoopHandle { tx })
    }

    /// Register a repeating timer that yields a clone of `message` each
    /// period. The first fire is one interval from now.
    ///
    /// Sub-millisecond intervals are clamped to 1ms.
    pub fn add_timer(&mut self, interval: Duration, message: M) -> TimerId {
        let interval = interval.max(MIN_TIMER_INTERVAL);
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.timers.push(TimerSlot {
            id,
            interval,
            next_fire: Instant::now() + interval,
            message,
        });
        id
    }

    /// Change a timer's period. Takes effect immediately: the next fire is
    /// rescheduled to one new interval from now rather than waiting out the
    /// old period.
    pub fn set_timer_interval(&mut self, id: TimerId, interval: Duration) {
        let interval = interval.max(MIN_TIMER_INTERVAL);
        let Some(slot) = self.timers.iter_mut().find(|t| t.id == id) else {
            warn!("set_timer_interval: unknown timer {:?}", id);
            return;
        };
        slot.interval = interval;
        slot.next_fire = Instant::now() + interval;
    }

    /// Block until the next message: a due timer message first, then queued
    /// messages in enqueue order. Returns `None` once every handle has been
    /// dropped and the queue is drained.
    pub fn next(&mut self) -> Option<M> {
        #[cfg(debug_assertions)]
        {
            let current = std::thread::current().id();
            match self.bound_to {
                None => self.bound_to = Some(current),
                Some(bound) => debug_assert_eq!(
                    bound, current,
                    "EventLoop::next called off the thread the loop is bound to"
                ),
            }
        }

        loop {
            let now = Instant::now();
            if let Some(message) = self.fire_due(now) {
                return Some(message);
            }
            match self.nearest_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(now);
                    match self.rx.recv_timeout(wait) {
                        Ok(message) => return Some(message),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => return None,
                    }
                }
                None => return self.rx.recv().ok(),
            }
        }
    }

    /// Fire the most overdue timer, if any is due. Missed periods are not
    /// replayed; after a stall the next fire is one interval out.
    fn fire_due(&mut self, now: Instant) -> Option<M> {
        let slot = self
            .timers
            .iter_mut()
            .filter(|t| t.next_fire <= now)
            .min_by_key(|t| t.next_fire)?;
        slot.next_fire = now + slot.interval;
        Some(slot.message.clone())
    }

    fn nearest_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.next_fire).min()
    }
}
