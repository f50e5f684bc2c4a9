pub mod client;
pub mod generator;
pub mod prompt;

pub use client::{ChatTransport, CompletionOptions, HttpTransport, LlmClient, Provider};
pub use generator::{AiGenerateOptions, AiTestGenerator};
