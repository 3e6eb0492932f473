//! Producer side of the loop.

use std::sync::mpsc::Sender;

/// Handle for posting messages to an [`EventLoop`](crate::EventLoop).
///
/// Cloneable; every clone posts into the same queue. Dropping the last handle
/// is the loop's shutdown signal.
pub struct LoopHandle<M> {
    pub(crate) tx: Sender<M>,
}

impl<M> LoopHandle<M> {
    /// Post a message to the loop's thread. Never blocks.
    ///
    /// Returns `false` if the loop is gone; the message is discarded in that
    /// case.
    pub fn post(&self, message: M) -> bool {
        self.tx.send(message).is_ok()
    }
}

impl<M> Clone for LoopHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}
