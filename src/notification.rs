use serde::{Deserialize, Serialize};

/// A single notification send request.
///
/// Notifications have no identity beyond their fields, two values with the same type, recipient
/// and message are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Notification {
    /// The notification type, used to look up the [RateLimitPolicy](crate::RateLimitPolicy).
    #[serde(rename = "type")]
    pub notification_type: String,
    /// The user the notification is addressed to.
    #[serde(rename = "userId", alias = "recipientId")]
    pub recipient_id: String,
    /// The message body handed to the delivery channel.
    pub message: String,
}

impl Notification {
    pub fn new(
        notification_type: impl Into<String>,
        recipient_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type: notification_type.into(),
            recipient_id: recipient_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_request_body() {
        let body = r#"{"type":"news","userId":"user1","message":"Hello"}"#;
        let notification: Notification = serde_json::from_str(body).unwrap();
        assert_eq!(notification, Notification::new("news", "user1", "Hello"));

        // The recipient may also be named explicitly
        let body = r#"{"type":"news","recipientId":"user1","message":"Hello"}"#;
        let notification: Notification = serde_json::from_str(body).unwrap();
        assert_eq!(notification.recipient_id, "user1");
    }
}
