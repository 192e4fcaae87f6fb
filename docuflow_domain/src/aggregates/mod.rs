pub mod document_aggregate;

pub use document_aggregate::{prerequisites_of, DocumentAggregate};
