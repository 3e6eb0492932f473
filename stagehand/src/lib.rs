//! Thread-bound event loop with posted messages and repeating timers
//!
//! A `stagehand` loop is the backbone of a worker thread that services a
//! typed message queue: any number of producer threads post messages through
//! a [`LoopHandle`], and exactly one consumer thread drains them in order
//! through [`EventLoop::next`], interleaved with repeating timers.
//!
//! # Architecture
//!
//! ```text
//! Producer Threads                     Consumer Thread
//!       │                                    │
//! [post(msg)]──────────(channel)──────►[next()]
//! [post(msg)]──────────(channel)──────►[next()]
//!                                           │
//!                         [timer due]──►[next() yields timer message]
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let (mut events, handle) = EventLoop::new();
//! let tick = events.add_timer(Duration::from_millis(250), Msg::Tick);
//!
//! std::thread::spawn(move || {
//!     while let Some(msg) = events.next() {
//!         // handle msg; adjust cadence with events.set_timer_interval(tick, ...)
//!     }
//! });
//!
//! handle.post(Msg::Hello);
//! // Dropping every handle shuts the loop down: next() returns None.
//! ```

mod event_loop;
mod handle;

pub use event_loop::{EventLoop, TimerId};
pub use handle::LoopHandle;
