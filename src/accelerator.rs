//! accelerator.rs
//!
//! One handle over the four services, built from a single `Config` and
//! project root.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::harness::coverage::{CoverageAnalyzer, CoverageResult, CoverageStats, ReportFormat};
use crate::harness::performance::{PerformanceAnalysis, PerformanceAnalyzer, TestRecord};
use crate::harness::report::PerformanceReport;
use crate::llm::{AiGenerateOptions, AiTestGenerator};
use crate::testgen::{GenerateOptions, TestGenerator};

pub struct Accelerator {
    root: PathBuf,
    generator: TestGenerator,
    ai: AiTestGenerator,
    coverage: CoverageAnalyzer,
    performance: PerformanceAnalyzer,
}

impl Accelerator {
    pub fn new(config: &Config, root: &Path) -> Self {
        Self::from_parts(
            root,
            TestGenerator::new(config, root),
            AiTestGenerator::new(config, root),
            CoverageAnalyzer::new(config, root),
            PerformanceAnalyzer::new(config, root),
        )
    }

    /// Assemble from pre-built services (tests swap in fake runners or
    /// transports this way).
    pub fn from_parts(
        root: &Path,
        generator: TestGenerator,
        ai: AiTestGenerator,
        coverage: CoverageAnalyzer,
        performance: PerformanceAnalyzer,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            generator,
            ai,
            coverage,
            performance,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /* ---------- generation ---------- */

    pub fn generate_tests(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.generator.generate_basic_tests(path, opts)
    }

    pub fn generate_model_tests(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.generator.generate_for_model(path, opts)
    }

    pub fn generate_controller_tests(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.generator.generate_for_controller(path, opts)
    }

    pub fn generate_service_tests(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.generator.generate_for_service(path, opts)
    }

    pub fn generate_with_ai(&mut self, path: &Path, opts: &AiGenerateOptions) -> Result<bool> {
        self.ai.generate(path, opts)
    }

    pub fn generate_with_ai_context(
        &mut self,
        path: &Path,
        context: &[(String, String)],
        opts: &AiGenerateOptions,
    ) -> Result<bool> {
        self.ai.generate_with_context(path, context, opts)
    }

    /// Files written so far by either generator, sorted.
    pub fn generated_files(&self) -> Vec<PathBuf> {
        let mut files = self.generator.written_files();
        files.extend(self.ai.written_files());
        files.sort();
        files
    }

    pub fn test_ai_connection(&self) -> bool {
        self.ai.test_connection()
    }

    pub fn validate_ai_configuration(&self) -> Vec<String> {
        self.ai.validate_configuration()
    }

    /* ---------- coverage ---------- */

    pub fn analyze_coverage(&self, threshold: Option<f64>) -> CoverageResult {
        self.coverage.analyze(threshold)
    }

    /// HTML report at `location`, or the default under the reports dir.
    pub fn generate_coverage_report(&self, location: Option<&Path>) -> bool {
        self.coverage.generate_html_report(location)
    }

    pub fn generate_report(&self, format: ReportFormat, location: Option<&Path>) -> bool {
        self.coverage.generate_report(format, location)
    }

    pub fn generate_configured_coverage_reports(
        &self,
        output_dir: Option<&Path>,
    ) -> Vec<(ReportFormat, bool)> {
        self.coverage.generate_configured_reports(output_dir)
    }

    pub fn coverage_stats(&self) -> CoverageStats {
        self.coverage.coverage_stats()
    }

    pub fn reports_dir(&self) -> &Path {
        self.coverage.reports_dir()
    }

    /* ---------- performance ---------- */

    pub fn performance_stats(&self) -> PerformanceAnalysis {
        self.performance.analyze(None, None)
    }

    pub fn analyze_performance(&self, slow_ms: Option<f64>, memory_kb: Option<f64>) -> PerformanceAnalysis {
        self.performance.analyze(slow_ms, memory_kb)
    }

    pub fn slow_tests(&self) -> Vec<TestRecord> {
        self.performance.slow_tests()
    }

    pub fn memory_usage(&self) -> Vec<TestRecord> {
        self.performance.memory_usage()
    }

    /// Report over a fresh run with the configured thresholds.
    pub fn performance_report(&self) -> PerformanceReport {
        PerformanceReport::from_analysis(&self.performance_stats())
    }
}
