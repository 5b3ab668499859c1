//! faqdb-generate
//!
//! Gemini `generateContent` client implementing the answer, question and
//! overall-summary generation traits, with the prompts it sends and the
//! parsing of what comes back.

pub mod gemini;
pub mod parse;
pub mod prompt;

pub use gemini::GeminiClient;
