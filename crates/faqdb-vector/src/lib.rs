//! faqdb-vector
//!
//! Exact inner-product search over L2-normalized question embeddings, the
//! retriever that drives it, and an optional LanceDB-backed embedding cache.

pub mod cache;
pub mod index;
pub mod retriever;
pub mod schema;
pub mod table;

pub use index::{normalize_l2, FlatIpIndex};
pub use retriever::VectorRetriever;
