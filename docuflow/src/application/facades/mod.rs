//! Narrow adapters to the object store and embedding service, used by the
//! core (the storage queue processor and, for tests, a reference embedding
//! handler) — not by third-party extractor stage handlers, which own
//! whatever clients they need directly.

pub mod embedding_service;
pub mod object_store;

pub use embedding_service::EmbeddingServiceFacade;
pub use object_store::ObjectStoreFacade;
