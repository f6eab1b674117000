//! Query answering support
//!
//! Prompt assembly for the completion service and memoization of answers.

pub mod cache;
pub mod prompt;

pub use cache::{AnswerCache, CachedAnswer};
pub use prompt::{build_prompt, industry_profile, Turn};
