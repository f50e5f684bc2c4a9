//! testgen/mod.rs
//!
//! Template-driven test generation.

pub mod file;
pub mod generator;
pub mod naming;
pub mod synth;
pub mod template;

pub use file::{TestArtifact, TestFileWriter};
pub use generator::{GenerateOptions, TestGenerator, TestType};
pub use template::{substitute, PlaceholderMap, TemplateKind, TemplateSet};
