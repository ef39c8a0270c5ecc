//! Pending-event queue between the audio ingestion and render contexts.
//!
//! This is the only structure both contexts mutate. The audio side pushes,
//! the render side drains everything once per render call.

use crossbeam::channel::{unbounded, Receiver, Sender};

/// Unbounded FIFO of discrete events (onsets, drops, ...).
///
/// Cloning shares the same underlying queue.
#[derive(Debug)]
pub struct EventQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for EventQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Enqueue one event. Never blocks.
    pub fn push(&self, event: T) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(event);
    }

    /// Take every event queued so far, in arrival order.
    ///
    /// Events pushed while the drain is running are left for the next call.
    pub fn drain(&self) -> Vec<T> {
        let pending = self.rx.len();
        self.rx.try_iter().take(pending).collect()
    }

    /// Discard everything queued. Returns the number of dropped events.
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_is_fifo() {
        let queue = EventQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.drain(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_discards_everything() {
        let queue = EventQueue::new();
        for i in 0..10 {
            queue.push(i);
        }
        assert_eq!(queue.clear(), 10);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_cross_thread_push() {
        let queue = EventQueue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            for i in 0..1000 {
                producer.push(i);
            }
        });
        handle.join().unwrap();

        let events = queue.drain();
        assert_eq!(events.len(), 1000);
        assert!(events.windows(2).all(|w| w[0] < w[1]));
    }
}
