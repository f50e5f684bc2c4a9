//! harness/performance.rs
//!
//! Per-test timing and memory scraped from verbose runner output.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{BenchmarkConfig, Config};
use crate::harness::runner::{CommandRunner, ProcessRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub name: String,
    pub status: TestStatus,
    /// Milliseconds.
    pub time: f64,
    /// Kilobytes; 0 when the line carries no memory figure.
    pub memory: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Performance,
    Memory,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
    pub tests: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub slow_ms: f64,
    pub memory_kb: f64,
}

impl From<&BenchmarkConfig> for Thresholds {
    fn from(cfg: &BenchmarkConfig) -> Self {
        Self {
            slow_ms: cfg.slow_threshold,
            memory_kb: cfg.memory_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
    pub total_tests: usize,
    pub slow_tests: Vec<TestRecord>,
    pub memory_issues: Vec<TestRecord>,
    pub average_time: f64,
    pub total_time: f64,
    pub recommendations: Vec<Recommendation>,
}

impl PerformanceAnalysis {
    pub fn has_issues(&self) -> bool {
        !self.slow_tests.is_empty() || !self.memory_issues.is_empty()
    }
}

/* ============================================================
   Parsing
   ============================================================ */

fn test_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(PASS|FAIL)\s+(.+?)\s+\((\d+(?:\.\d+)?)ms\)").unwrap())
}

fn memory_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)MB").unwrap())
}

/// `PASS <name> (<n>ms)` / `FAIL ...`, optionally with `<n>MB` somewhere
/// on the same line. Other lines are ignored.
pub fn parse_test_output(output: &str) -> Vec<TestRecord> {
    output
        .lines()
        .filter(|l| l.contains("PASS") || l.contains("FAIL"))
        .filter_map(parse_test_line)
        .collect()
}

fn parse_test_line(line: &str) -> Option<TestRecord> {
    let caps = test_line_re().captures(line)?;

    let status = match &caps[1] {
        "PASS" => TestStatus::Pass,
        _ => TestStatus::Fail,
    };

    Some(TestRecord {
        name: caps[2].trim().to_string(),
        status,
        time: caps[3].parse().ok()?,
        memory: memory_kb(line),
    })
}

fn memory_kb(line: &str) -> f64 {
    memory_re()
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|mb| mb * 1024.0)
        .unwrap_or(0.0)
}

/* ============================================================
   Classification
   ============================================================ */

/// Strictly above the threshold.
pub fn slow_tests(records: &[TestRecord], threshold_ms: f64) -> Vec<TestRecord> {
    records
        .iter()
        .filter(|r| r.time > threshold_ms)
        .cloned()
        .collect()
}

/// Strictly above the threshold.
pub fn memory_issues(records: &[TestRecord], threshold_kb: f64) -> Vec<TestRecord> {
    records
        .iter()
        .filter(|r| r.memory > threshold_kb)
        .cloned()
        .collect()
}

pub fn recommendations(slow: &[TestRecord], memory: &[TestRecord]) -> Vec<Recommendation> {
    let names = |list: &[TestRecord]| -> Vec<String> { list.iter().map(|r| r.name.clone()).collect() };
    let mut out = Vec::new();

    if !slow.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::Performance,
            message: format!("Consider optimizing {} slow tests", slow.len()),
            tests: names(slow),
        });
    }

    if !memory.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::Memory,
            message: format!("Consider optimizing {} memory-intensive tests", memory.len()),
            tests: names(memory),
        });
    }

    if out.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::Success,
            message: "All tests are performing well!".into(),
            tests: Vec::new(),
        });
    }

    out
}

pub fn analyze_records(records: &[TestRecord], thresholds: Thresholds) -> PerformanceAnalysis {
    let slow = slow_tests(records, thresholds.slow_ms);
    let memory = memory_issues(records, thresholds.memory_kb);
    let total_time: f64 = records.iter().map(|r| r.time).sum();
    let average_time = if records.is_empty() {
        0.0
    } else {
        total_time / records.len() as f64
    };

    PerformanceAnalysis {
        total_tests: records.len(),
        recommendations: recommendations(&slow, &memory),
        slow_tests: slow,
        memory_issues: memory,
        average_time,
        total_time,
    }
}

/* ============================================================
   Analyzer
   ============================================================ */

pub struct PerformanceAnalyzer {
    config: BenchmarkConfig,
    runner: Box<dyn CommandRunner>,
}

impl PerformanceAnalyzer {
    pub fn new(config: &Config, root: &Path) -> Self {
        Self::with_runner(config, Box::new(ProcessRunner::from_config(config, root)))
    }

    pub fn with_runner(config: &Config, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            config: config.benchmark.clone(),
            runner,
        }
    }

    /// Overrides fall back to the configured thresholds.
    pub fn analyze(&self, slow_ms: Option<f64>, memory_kb: Option<f64>) -> PerformanceAnalysis {
        let defaults = Thresholds::from(&self.config);
        let thresholds = Thresholds {
            slow_ms: slow_ms.unwrap_or(defaults.slow_ms),
            memory_kb: memory_kb.unwrap_or(defaults.memory_kb),
        };

        let analysis = analyze_records(&self.run_tests(), thresholds);
        info!(
            tests = analysis.total_tests,
            slow = analysis.slow_tests.len(),
            memory = analysis.memory_issues.len(),
            "performance analyzed"
        );
        analysis
    }

    pub fn slow_tests(&self) -> Vec<TestRecord> {
        slow_tests(&self.run_tests(), self.config.slow_threshold)
    }

    pub fn memory_usage(&self) -> Vec<TestRecord> {
        memory_issues(&self.run_tests(), self.config.memory_threshold)
    }

    fn run_tests(&self) -> Vec<TestRecord> {
        let flags = ["--verbose".to_string(), "--coverage-text".to_string()];
        match self.runner.run(&flags) {
            Ok(stdout) => parse_test_output(&stdout),
            Err(e) => {
                warn!(error = %e, "performance run failed; no test data");
                Vec::new()
            }
        }
    }
}
