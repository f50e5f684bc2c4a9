//! harness/report.rs
//!
//! JSON performance report.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::harness::performance::{PerformanceAnalysis, Recommendation, TestRecord};

pub const REPORT_FILE_NAME: &str = "performance-report.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_tests: usize,
    pub slow_tests_count: usize,
    pub memory_issues_count: usize,
    pub average_time: f64,
    pub total_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub summary: ReportSummary,
    pub slow_tests: Vec<TestRecord>,
    pub memory_issues: Vec<TestRecord>,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: String,
}

impl PerformanceReport {
    pub fn from_analysis(analysis: &PerformanceAnalysis) -> Self {
        Self::from_analysis_at(analysis, Utc::now())
    }

    pub fn from_analysis_at(analysis: &PerformanceAnalysis, at: DateTime<Utc>) -> Self {
        Self {
            summary: ReportSummary {
                total_tests: analysis.total_tests,
                slow_tests_count: analysis.slow_tests.len(),
                memory_issues_count: analysis.memory_issues.len(),
                average_time: analysis.average_time,
                total_time: analysis.total_time,
            },
            slow_tests: analysis.slow_tests.clone(),
            memory_issues: analysis.memory_issues.clone(),
            recommendations: analysis.recommendations.clone(),
            generated_at: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes `<dir>/performance-report.json`, creating `dir` if needed.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let path = dir.join(REPORT_FILE_NAME);
        fs::write(&path, self.to_json()?).map_err(|e| Error::io(&path, e))?;

        info!(path = %path.display(), "performance report written");
        Ok(path)
    }
}
