use actix_web::http::StatusCode;
use actix_web::ResponseError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DRAIN_INTERVAL_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Unknown notification type: {0}")]
    UnknownType(String),
    #[error("Invalid rate limit policy for notification type {notification_type}: {reason}")]
    InvalidPolicy {
        notification_type: String,
        reason: &'static str,
    },
    #[error("Unable to parse rate limit options: {0}")]
    Parse(
        #[source]
        #[from]
        serde_json::Error,
    ),
}

impl ResponseError for ConfigurationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// The rate limit applied to every recipient of a notification type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// The total notifications to be allowed within the period.
    pub limit: u64,
    /// The rate limiting window, in whole seconds when (de)serialized.
    #[serde(with = "seconds")]
    pub period: Duration,
}

impl RateLimitPolicy {
    pub fn new(limit: u64, period: Duration) -> Self {
        Self { limit, period }
    }

    pub(crate) fn validate(&self, notification_type: &str) -> Result<(), ConfigurationError> {
        let reason = if self.limit == 0 {
            "limit must be greater than zero"
        } else if self.period.is_zero() {
            "period must be greater than zero"
        } else {
            return Ok(());
        };
        Err(ConfigurationError::InvalidPolicy {
            notification_type: notification_type.to_owned(),
            reason,
        })
    }
}

/// Startup configuration: one policy per notification type and the overflow drain cadence.
///
/// ```
/// # use notification_rate_limit::RateLimitOptions;
/// let options = RateLimitOptions::from_json(
///     r#"{ "policies": { "status": { "limit": 2, "period": 60 } }, "drain_interval": 5 }"#,
/// )
/// .unwrap();
/// assert_eq!(options.policies["status"].limit, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitOptions {
    pub policies: HashMap<String, RateLimitPolicy>,
    #[serde(with = "seconds", default = "default_drain_interval")]
    pub drain_interval: Duration,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            policies: HashMap::new(),
            drain_interval: default_drain_interval(),
        }
    }
}

impl RateLimitOptions {
    /// Parse and validate options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Add (or replace) the policy for a notification type.
    pub fn with_policy(mut self, notification_type: &str, limit: u64, period: Duration) -> Self {
        self.policies.insert(
            notification_type.to_owned(),
            RateLimitPolicy::new(limit, period),
        );
        self
    }

    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (notification_type, policy) in &self.policies {
            policy.validate(notification_type)?;
        }
        if self.drain_interval.is_zero() {
            return Err(ConfigurationError::InvalidPolicy {
                notification_type: String::new(),
                reason: "drain interval must be greater than zero",
            });
        }
        Ok(())
    }
}

fn default_drain_interval() -> Duration {
    Duration::from_secs(DEFAULT_DRAIN_INTERVAL_SECONDS)
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
