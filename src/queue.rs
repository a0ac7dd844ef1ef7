use crate::notification::Notification;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Unbounded holding area for notifications that were rate limited.
///
/// The lock is only held to push or to swap the contents out, never across a delivery, so
/// producers are never blocked for longer than a single insertion.
#[derive(Clone, Default)]
pub struct OverflowQueue {
    items: Arc<Mutex<VecDeque<Notification>>>,
}

impl OverflowQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, notification: Notification) {
        self.items.lock().push_back(notification);
    }

    /// Takes everything currently queued, leaving the queue empty.
    ///
    /// Items enqueued after this returns (including re-queued items from the batch itself) are
    /// left for the next drain.
    pub fn drain_snapshot(&self) -> Vec<Notification> {
        let items = std::mem::take(&mut *self.items.lock());
        items.into()
    }

    /// Puts unprocessed items back at the front of the queue, keeping their order.
    pub(crate) fn restore<I>(&self, notifications: I)
    where
        I: IntoIterator<Item = Notification>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut items = self.items.lock();
        for notification in notifications.into_iter().rev() {
            items.push_front(notification);
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(message: &str) -> Notification {
        Notification::new("status", "user1", message)
    }

    #[test]
    fn test_snapshot_takes_everything() {
        let queue = OverflowQueue::new();
        queue.enqueue(notification("a"));
        queue.enqueue(notification("b"));
        let batch = queue.drain_snapshot();
        assert_eq!(batch, vec![notification("a"), notification("b")]);
        assert!(queue.is_empty());
        assert!(queue.drain_snapshot().is_empty());
    }

    #[test]
    fn test_enqueue_during_drain_is_deferred() {
        let queue = OverflowQueue::new();
        queue.enqueue(notification("a"));
        let batch = queue.drain_snapshot();
        // Anything added while a batch is being processed belongs to the next one
        queue.enqueue(notification("b"));
        assert_eq!(batch.len(), 1);
        assert_eq!(queue.drain_snapshot(), vec![notification("b")]);
    }

    #[test]
    fn test_restore_keeps_order() {
        let queue = OverflowQueue::new();
        queue.enqueue(notification("c"));
        queue.restore(vec![notification("a"), notification("b")]);
        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drain_snapshot(),
            vec![notification("a"), notification("b"), notification("c")]
        );
    }

    #[test]
    fn test_concurrent_producers() {
        use std::thread;

        let queue = OverflowQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for j in 0..250 {
                        queue.enqueue(notification(&format!("{i}-{j}")));
                    }
                })
            })
            .collect();
        let mut drained = 0;
        for handle in handles {
            drained += queue.drain_snapshot().len();
            handle.join().unwrap();
        }
        drained += queue.drain_snapshot().len();
        // Nothing is lost or duplicated across snapshots
        assert_eq!(drained, 1000);
    }
}
