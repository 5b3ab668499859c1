//! faqdb-text
//!
//! Lexical side of retrieval: synonym rewriting of the raw query and the
//! first-match-wins keyword matcher over the ordered entry collection.

pub mod keyword;
pub mod normalize;

pub use keyword::{normalize_for_match, KeywordMatcher};
pub use normalize::SynonymTable;
