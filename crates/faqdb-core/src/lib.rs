//! faqdb-core
//!
//! Shared data model, configuration, error type and collaborator traits for
//! the FAQ retrieval engine and the corpus builder.

pub mod config;
pub mod data_processor;
pub mod entry_set;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
