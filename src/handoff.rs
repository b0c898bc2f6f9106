//! Queue carrying decoded images from workers to the coordinating thread.

use crossbeam_channel::{Receiver, Sender};

/// Unbounded FIFO shared between producers on pool threads and the single
/// consumer on the coordinating thread.
///
/// An empty channel does not mean producers are done. The consumer has to
/// combine [`HandoffChannel::is_empty`] with the pool's busy state before it
/// stops draining.
pub struct HandoffChannel<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> HandoffChannel<T> {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Append an item. Never blocks.
    pub fn push(&self, item: T) {
        // Both ends live in `self`, so the channel can't be disconnected
        let _ = self.sender.send(item);
    }

    /// Take the oldest item, if any.
    pub fn try_pop(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

impl<T> Default for HandoffChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let channel = HandoffChannel::new();
        channel.push(1);
        channel.push(2);
        channel.push(3);

        assert_eq!(channel.len(), 3);
        assert_eq!(channel.try_pop(), Some(1));
        assert_eq!(channel.try_pop(), Some(2));
        assert_eq!(channel.try_pop(), Some(3));
        assert_eq!(channel.try_pop(), None);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_concurrent_producers() {
        let channel = Arc::new(HandoffChannel::new());
        let producers: Vec<_> = (0..8)
            .map(|p| {
                let channel = Arc::clone(&channel);
                thread::spawn(move || {
                    for i in 0..100 {
                        channel.push(p * 100 + i);
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().expect("producer finished");
        }

        let mut items = Vec::new();
        while let Some(item) = channel.try_pop() {
            items.push(item);
        }
        items.sort_unstable();
        assert_eq!(items, (0..800).collect::<Vec<_>>());
    }
}
