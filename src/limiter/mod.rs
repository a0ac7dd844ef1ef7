mod registry;

pub use registry::{LimiterRegistry, LimiterRegistryBuilder, DEFAULT_GC_INTERVAL_SECONDS};

use actix_web::rt::time::Instant;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Self::Allowed
        } else {
            Self::Denied
        }
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

/// Identifies an independent counting window.
///
/// Quota is never shared between two recipients of the same type, nor between two types sent
/// to the same recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimiterKey {
    pub notification_type: String,
    pub recipient_id: String,
}

impl LimiterKey {
    pub fn new(notification_type: &str, recipient_id: &str) -> Self {
        Self {
            notification_type: notification_type.to_owned(),
            recipient_id: recipient_id.to_owned(),
        }
    }
}

/// The result of [LimiterRegistry::admit].
#[derive(Debug, Clone)]
pub struct Admission {
    pub decision: Decision,
    rollback: Option<RollbackToken>,
}

impl Admission {
    pub(crate) fn allowed(token: RollbackToken) -> Self {
        Self {
            decision: Decision::Allowed,
            rollback: Some(token),
        }
    }

    pub(crate) fn denied() -> Self {
        Self {
            decision: Decision::Denied,
            rollback: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }

    pub fn is_denied(&self) -> bool {
        self.decision.is_denied()
    }

    /// A token for [LimiterRegistry::rollback], only present when the admission was allowed.
    pub fn into_rollback_token(self) -> Option<RollbackToken> {
        self.rollback
    }
}

/// Identifies the window a slot was taken from, so that it can only be handed back to that
/// same window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackToken {
    pub(crate) key: LimiterKey,
    pub(crate) window_expiry: Instant,
}
