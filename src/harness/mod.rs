//! harness/mod.rs
//!
//! Everything that drives the external test runner and reads its output.

pub mod coverage;
pub mod performance;
pub mod report;
pub mod runner;

pub use coverage::{CoverageAnalyzer, CoverageResult, CoverageStats, ReportFormat};
pub use performance::{PerformanceAnalysis, PerformanceAnalyzer};
pub use report::PerformanceReport;
pub use runner::{CommandRunner, ProcessRunner};
