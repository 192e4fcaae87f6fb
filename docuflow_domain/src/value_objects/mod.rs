//! Small, immutable, self-validating types shared across entities and
//! service ports.

pub mod content_hash;
pub mod correlation_id;
pub mod document_id;
pub mod progress;
pub mod stage_name;

pub use content_hash::ContentHash;
pub use correlation_id::{CorrelationId, RequestId};
pub use document_id::DocumentId;
pub use progress::Progress;
pub use stage_name::StageName;
