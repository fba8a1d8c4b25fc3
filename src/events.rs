//! Fire-and-forget progress channels.
//!
//! Long-running operations (clone, install) push progress events to an
//! optional observer. Sends never block and a vanished receiver is ignored.

use crossbeam_channel::{Receiver, Sender};

/// Sending half of a progress stream; `EventSink::none()` discards events.
#[derive(Debug)]
pub struct EventSink<T> {
    sender: Option<Sender<T>>,
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Default for EventSink<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> EventSink<T> {
    #[must_use]
    pub const fn none() -> Self {
        Self { sender: None }
    }

    #[must_use]
    pub const fn new(sender: Sender<T>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Create a connected sink and receiver over an unbounded channel.
    #[must_use]
    pub fn channel() -> (Self, Receiver<T>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: T) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.sender.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_receiver_is_silent() {
        let sink: EventSink<u32> = EventSink::none();
        sink.emit(1);
        assert!(!sink.is_connected());
    }

    #[test]
    fn emit_after_receiver_dropped_does_not_panic() {
        let (sink, rx) = EventSink::<u32>::channel();
        drop(rx);
        sink.emit(7);
    }

    #[test]
    fn events_arrive_in_order() {
        let (sink, rx) = EventSink::channel();
        sink.emit("a");
        sink.clone().emit("b");
        drop(sink);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
