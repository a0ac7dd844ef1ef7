use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery failed: {0}")]
    Failed(String),
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The transport that actually delivers a message to a user.
///
/// Implementations are called outside of any rate limiter lock and may take as long as they
/// need; any timeout belongs to the implementation. Failures are reported back to the
/// [Dispatcher](crate::Dispatcher), which does not retry them unless configured to.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, recipient_id: &str, message: &str) -> Result<(), DeliveryError>;
}

/// A [DeliveryChannel] that only writes the message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingChannel;

#[async_trait]
impl DeliveryChannel for LoggingChannel {
    async fn send(&self, recipient_id: &str, message: &str) -> Result<(), DeliveryError> {
        log::info!("sending message to user {recipient_id}: {message}");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingChannel;


#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_logging_channel() {
        assert!(LoggingChannel.send("user1", "Hello").await.is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = DeliveryError::Failed("timeout".to_string());
        assert_eq!(err.to_string(), "Delivery failed: timeout");
        let boxed: Box<dyn std::error::Error + Send + Sync> = "connection reset".into();
        assert_eq!(DeliveryError::from(boxed).to_string(), "connection reset");
    }
}
