//! faqdb-corpus
//!
//! Incremental corpus builder: source documents are chunked, turned into
//! question/answer entries by the generation collaborators, cached per
//! document version and written out as sharded entry files.

pub mod builder;
pub mod cache;
pub mod source;
pub mod throttle;

pub use builder::{BuildReport, CorpusBuilder};
pub use cache::{CacheRecord, EntryCache};
pub use source::{DirectorySource, ManifestSource};
pub use throttle::Throttle;
