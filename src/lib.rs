#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod channel;
mod dispatcher;
pub mod drain;
pub mod limiter;
mod notification;
pub mod policy;
pub mod queue;
pub mod service;

pub use channel::{DeliveryChannel, DeliveryError, LoggingChannel};
pub use dispatcher::builder::DispatcherBuilder;
pub use dispatcher::{Dispatcher, Outcome};
pub use drain::{run_cycle, CycleReport, DrainHandle, DrainLoop};
pub use limiter::{Admission, Decision, LimiterKey, LimiterRegistry, RollbackToken};
pub use notification::Notification;
pub use policy::{ConfigurationError, RateLimitOptions, RateLimitPolicy};
pub use queue::OverflowQueue;
