pub mod builder;

use crate::channel::DeliveryChannel;
use crate::limiter::LimiterRegistry;
use crate::notification::Notification;
use crate::policy::ConfigurationError;
use crate::queue::OverflowQueue;
use builder::DispatcherBuilder;
use std::sync::Arc;

/// What happened to a notification handed to [Dispatcher::send].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Admitted and handed to the delivery channel successfully.
    Delivered,
    /// Rate limited and placed on the overflow queue.
    Deferred,
    /// Admitted, but the delivery channel failed; the notification was dropped.
    Dropped,
    /// Admitted, but the delivery channel failed; the slot was handed back and the notification
    /// placed on the overflow queue.
    Requeued,
}

impl Outcome {
    /// Whether the notification was either delivered or is waiting on the overflow queue.
    pub fn is_delivered_or_queued(self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

/// Admission control in front of a [DeliveryChannel].
///
/// Cloning is cheap, clones share the same limiters and overflow queue.
#[derive(Clone)]
pub struct Dispatcher {
    registry: LimiterRegistry,
    channel: Arc<dyn DeliveryChannel>,
    queue: OverflowQueue,
    requeue_failed: bool,
}

impl Dispatcher {
    /// # Arguments
    ///
    /// * `registry`: The per-(type, recipient) limiters.
    /// * `channel`: The transport used for admitted notifications.
    pub fn builder<C>(registry: LimiterRegistry, channel: C) -> DispatcherBuilder
    where
        C: DeliveryChannel + 'static,
    {
        DispatcherBuilder::new(registry, Arc::new(channel))
    }

    /// Deliver a notification now if its limiter allows it, otherwise defer it.
    ///
    /// Makes at most one delivery channel call or one overflow queue insertion, never both
    /// (unless requeueing of failed deliveries is enabled). The only error is
    /// [ConfigurationError], for a type without a policy; such notifications are never queued.
    pub async fn send(&self, notification: Notification) -> Result<Outcome, ConfigurationError> {
        let admission = self
            .registry
            .admit(&notification.notification_type, &notification.recipient_id)?;

        if admission.is_denied() {
            log::info!(
                "Rate limit exceeded for {} notifications to {}, queuing message",
                notification.notification_type,
                notification.recipient_id
            );
            self.queue.enqueue(notification);
            return Ok(Outcome::Deferred);
        }

        // No limiter lock is held here, a slow channel only delays this caller
        match self
            .channel
            .send(&notification.recipient_id, &notification.message)
            .await
        {
            Ok(()) => {
                log::debug!(
                    "Delivered {} notification to {}",
                    notification.notification_type,
                    notification.recipient_id
                );
                Ok(Outcome::Delivered)
            }
            Err(e) if self.requeue_failed => {
                log::warn!(
                    "Delivery of {} notification to {} failed: {e}, re-queuing message",
                    notification.notification_type,
                    notification.recipient_id
                );
                // A no-op if the window has reset while the channel was busy
                if let Some(token) = admission.into_rollback_token() {
                    self.registry.rollback(token);
                }
                self.queue.enqueue(notification);
                Ok(Outcome::Requeued)
            }
            Err(e) => {
                log::error!(
                    "Delivery of {} notification to {} failed: {e}, dropping message",
                    notification.notification_type,
                    notification.recipient_id
                );
                Ok(Outcome::Dropped)
            }
        }
    }

    /// Convenience wrapper around [Dispatcher::send] for the inbound operation.
    pub async fn send_notification(
        &self,
        notification_type: &str,
        recipient_id: &str,
        message: &str,
    ) -> Result<Outcome, ConfigurationError> {
        self.send(Notification::new(notification_type, recipient_id, message))
            .await
    }

    pub fn registry(&self) -> &LimiterRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &OverflowQueue {
        &self.queue
    }
}
