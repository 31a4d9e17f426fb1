//! Single-assignment result slot shared by racing producers.
//!
//! A slot has any number of [`SlotPublisher`] handles and exactly one
//! [`SlotWaiter`]. The first publish is delivered; every later publish is
//! rejected and its value dropped.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Create an empty slot.
pub fn result_slot<T>() -> (SlotPublisher<T>, SlotWaiter<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        SlotPublisher {
            sender: Arc::new(Mutex::new(Some(sender))),
        },
        SlotWaiter { receiver },
    )
}

/// Producer side of a result slot. Clones publish into the same slot.
pub struct SlotPublisher<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for SlotPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> SlotPublisher<T> {
    /// Store `value` unless something was stored before.
    ///
    /// Returns `true` when this call won the slot. The value is still counted
    /// as published if the waiter has already gone away.
    pub fn publish(&self, value: T) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_published(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Consumer side of a result slot.
pub struct SlotWaiter<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> SlotWaiter<T> {
    /// Suspend until a value is published.
    ///
    /// Returns `None` if every publisher was dropped without publishing.
    pub async fn wait(self) -> Option<T> {
        self.receiver.await.ok()
    }
}
