//! Test scaffolding and test-suite analysis for PHP projects.
//!
//! Generation reads a source file, classifies it, and writes a test class
//! from a template (or asks an AI provider to write one). Analysis runs the
//! project's test runner and scrapes its text output for coverage and
//! per-test timing.

pub mod accelerator;
pub mod commands;
pub mod config;
pub mod detectors;
pub mod error;
pub mod harness;
pub mod llm;
pub mod logging;
pub mod testgen;
pub mod ui;

pub use accelerator::Accelerator;
pub use config::Config;
pub use error::{Error, Result};
