//! Stateless domain-service ports. Every trait here is implemented in the
//! `docuflow` crate's infrastructure layer; the domain depends only on the
//! trait, never the adapter.

pub mod advisory_lock;
pub mod error_logger;
pub mod retry_policy_registry;
pub mod stage_handler;
pub mod stage_tracker;

pub use advisory_lock::{AdvisoryLockManager, LockToken};
pub use error_logger::ErrorLogger;
pub use retry_policy_registry::RetryPolicyRegistry;
pub use stage_handler::{InputHandle, NullProgressSink, Outcome, ProgressSink, StageHandler};
pub use stage_tracker::{StageTracker, TrackResult};
