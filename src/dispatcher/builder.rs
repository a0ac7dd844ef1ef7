use crate::channel::DeliveryChannel;
use crate::dispatcher::Dispatcher;
use crate::limiter::LimiterRegistry;
use crate::queue::OverflowQueue;
use std::sync::Arc;

pub struct DispatcherBuilder {
    registry: LimiterRegistry,
    channel: Arc<dyn DeliveryChannel>,
    queue: Option<OverflowQueue>,
    requeue_failed: bool,
}

impl DispatcherBuilder {
    pub(super) fn new(registry: LimiterRegistry, channel: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            registry,
            channel,
            queue: None,
            requeue_failed: false,
        }
    }

    /// Use an existing overflow queue, e.g. one shared with another dispatcher.
    ///
    /// By default a new, empty queue is created.
    pub fn queue(mut self, queue: OverflowQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Choose what happens when the delivery channel fails after a notification was admitted.
    ///
    /// By default the notification is dropped and the consumed slot stays spent. When enabled
    /// the slot is rolled back and the notification goes onto the overflow queue, so that a
    /// later drain retries it under the same limit.
    pub fn requeue_failed_deliveries(mut self, requeue: bool) -> Self {
        self.requeue_failed = requeue;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            registry: self.registry,
            channel: self.channel,
            queue: self.queue.unwrap_or_default(),
            requeue_failed: self.requeue_failed,
        }
    }
}
