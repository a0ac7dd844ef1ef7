use crate::limiter::{Admission, LimiterKey, RollbackToken};
use crate::policy::{ConfigurationError, RateLimitPolicy};
use actix_web::rt::task::JoinHandle;
use actix_web::rt::time::Instant;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GC_INTERVAL_SECONDS: u64 = 60 * 10;

// Upper bound for a window end when `now + period` would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Fixed window rate limiters, one per [LimiterKey], created lazily from a per-type policy table.
///
/// Both tables are [DashMap]s, so an admission check only locks the shard holding its key and
/// unrelated keys never wait on each other. Cloning is cheap and all clones share state.
#[derive(Clone)]
pub struct LimiterRegistry {
    policies: Arc<DashMap<String, RateLimitPolicy>>,
    windows: Arc<DashMap<LimiterKey, Window>>,
    _gc: Option<Arc<GarbageCollector>>,
}

struct Window {
    expiry: Instant,
    count: u64,
}

/// Aborts the collector task once the last registry clone goes away.
struct GarbageCollector(JoinHandle<()>);

impl Drop for GarbageCollector {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl LimiterRegistry {
    pub fn builder<I>(policies: I) -> LimiterRegistryBuilder
    where
        I: IntoIterator<Item = (String, RateLimitPolicy)>,
    {
        LimiterRegistryBuilder {
            policies: policies.into_iter().collect(),
            gc_interval: Some(Duration::from_secs(DEFAULT_GC_INTERVAL_SECONDS)),
        }
    }

    fn garbage_collector(
        windows: Arc<DashMap<LimiterKey, Window>>,
        interval: Duration,
    ) -> JoinHandle<()> {
        assert!(
            interval.as_secs_f64() > 0f64,
            "GC interval must be non-zero"
        );
        actix_web::rt::spawn(async move {
            loop {
                let now = Instant::now();
                let before = windows.len();
                windows.retain(|_k, w| w.expiry > now);
                let evicted = before.saturating_sub(windows.len());
                if evicted > 0 {
                    log::debug!("Evicted {evicted} expired rate limit windows");
                }
                actix_web::rt::time::sleep_until(window_end(now, interval)).await;
            }
        })
    }

    /// Decide whether one more notification may be delivered now for `(type, recipient)`.
    ///
    /// Counting is a single atomic check-and-increment under the key's shard lock: when one
    /// slot remains, exactly one concurrent caller is allowed.
    ///
    /// Fails with [ConfigurationError::UnknownType] if the type has no registered policy.
    pub fn admit(
        &self,
        notification_type: &str,
        recipient_id: &str,
    ) -> Result<Admission, ConfigurationError> {
        let policy = self.require_policy(notification_type)?;
        let now = Instant::now();
        let key = LimiterKey::new(notification_type, recipient_id);
        let mut window = match self.windows.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                // Checked again under the shard lock, otherwise a concurrent remove_policy
                // could finish its sweep before this window is inserted
                if !self.policies.contains_key(notification_type) {
                    return Err(ConfigurationError::UnknownType(
                        notification_type.to_owned(),
                    ));
                }
                entry.insert(Window {
                    expiry: window_end(now, policy.period),
                    count: 0,
                })
            }
        };
        if window.expiry <= now {
            // The previous window has elapsed, start a fresh one
            window.expiry = window_end(now, policy.period);
            window.count = 0;
        }
        if window.count >= policy.limit {
            return Ok(Admission::denied());
        }
        window.count += 1;
        Ok(Admission::allowed(RollbackToken {
            key,
            window_expiry: window.expiry,
        }))
    }

    /// Hand back a slot consumed by a previous [LimiterRegistry::admit].
    ///
    /// The slot is only returned to the window it was taken from. If that window has since
    /// expired (or been evicted) this does nothing and returns false, the new window never
    /// gains a slot it did not hand out.
    pub fn rollback(&self, token: RollbackToken) -> bool {
        match self.windows.get_mut(&token.key) {
            Some(mut window) if window.expiry == token.window_expiry && window.count > 0 => {
                window.count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Admissions left in the current window for a key.
    pub fn remaining(
        &self,
        notification_type: &str,
        recipient_id: &str,
    ) -> Result<u64, ConfigurationError> {
        let policy = self.require_policy(notification_type)?;
        let now = Instant::now();
        let used = self
            .windows
            .get(&LimiterKey::new(notification_type, recipient_id))
            .filter(|w| w.expiry > now)
            .map_or(0, |w| w.count);
        Ok(policy.limit.saturating_sub(used))
    }

    pub fn policy(&self, notification_type: &str) -> Option<RateLimitPolicy> {
        self.policies.get(notification_type).map(|p| *p)
    }

    /// Removes the policy for a type along with every window counted under it.
    ///
    /// Later admissions for the type fail with [ConfigurationError::UnknownType]. The policy is
    /// removed before the windows are swept, and [LimiterRegistry::admit] re-checks it before
    /// creating a window, so no window for the type outlives this call.
    pub fn remove_policy(&self, notification_type: &str) -> Option<RateLimitPolicy> {
        let removed = self.policies.remove(notification_type).map(|(_, p)| p);
        self.windows
            .retain(|k, _w| k.notification_type != notification_type);
        removed
    }

    /// Drops every window that has already expired, returning how many were removed.
    ///
    /// An expired window has no effect on later decisions (the next admission starts a fresh
    /// window), so evicting it is never observable through [LimiterRegistry::admit].
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_k, w| w.expiry > now);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn require_policy(
        &self,
        notification_type: &str,
    ) -> Result<RateLimitPolicy, ConfigurationError> {
        self.policy(notification_type)
            .ok_or_else(|| ConfigurationError::UnknownType(notification_type.to_owned()))
    }
}

fn window_end(now: Instant, period: Duration) -> Instant {
    now.checked_add(period).unwrap_or_else(|| now + FAR_FUTURE)
}

pub struct LimiterRegistryBuilder {
    policies: DashMap<String, RateLimitPolicy>,
    gc_interval: Option<Duration>,
}

impl LimiterRegistryBuilder {
    /// Override the default garbage collector interval.
    ///
    /// Set to None to disable garbage collection.
    ///
    /// The garbage collector periodically evicts expired windows. It is spawned onto the actix
    /// runtime, so [LimiterRegistryBuilder::build] must then be called from within one.
    pub fn with_gc_interval(mut self, interval: Option<Duration>) -> Self {
        self.gc_interval = interval;
        self
    }

    /// Fails with [ConfigurationError::InvalidPolicy] if any policy has a zero limit or period.
    pub fn build(self) -> Result<LimiterRegistry, ConfigurationError> {
        for policy in self.policies.iter() {
            policy.value().validate(policy.key())?;
        }
        let windows = Arc::new(DashMap::<LimiterKey, Window>::new());
        let gc = self.gc_interval.map(|gc_interval| {
            Arc::new(GarbageCollector(LimiterRegistry::garbage_collector(
                windows.clone(),
                gc_interval,
            )))
        });
        Ok(LimiterRegistry {
            policies: Arc::new(self.policies),
            windows,
            _gc: gc,
        })
    }
}
