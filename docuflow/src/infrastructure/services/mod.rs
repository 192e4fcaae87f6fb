// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Concrete implementations of the domain-service ports that need more
//! than a single SQLite table to satisfy: a read-mostly
//! cache in front of the policy repository, coalesced progress writes, and
//! a dual-sink error logger.

pub mod error_logger;
pub mod retry_policy_registry;
pub mod stage_tracker;

pub use error_logger::SqliteFileErrorLogger;
pub use retry_policy_registry::CachedRetryPolicyRegistry;
pub use stage_tracker::SqliteStageTracker;
