//! Side-effecting operations: configuration, prompts, and agent backends.

pub mod config;
pub mod executor;
pub mod gemini;
pub mod process;
pub mod prompt;
