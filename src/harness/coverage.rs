//! harness/coverage.rs
//!
//! Coverage scraping from the runner's `--coverage-text` output, plus
//! delegation of HTML / XML / Clover reports to the runner itself.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, CoverageConfig};
use crate::harness::runner::{CommandRunner, ProcessRunner};

/// Per-file status cut-off. Independent of the pass/fail threshold.
pub const GOOD_COVERAGE: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Good,
    Low,
}

impl CoverageStatus {
    pub fn of(percent: f64) -> Self {
        if percent >= GOOD_COVERAGE {
            CoverageStatus::Good
        } else {
            CoverageStatus::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileCoverage {
    pub file: String,
    pub coverage: f64,
    pub status: CoverageStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageData {
    pub total: f64,
    pub files: Vec<FileCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageResult {
    pub total: f64,
    pub files: Vec<FileCoverage>,
    pub threshold: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total_coverage: f64,
    pub files_analyzed: usize,
    pub files_covered: usize,
    pub files_low_coverage: usize,
}

/* ============================================================
   Parsing
   ============================================================ */

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").unwrap())
}

pub fn extract_percentage(text: &str) -> Option<f64> {
    percent_re()
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
}

/// Lines with both `%` and `|` are file rows (`path | NN.N% ...`); a line
/// containing `Total Coverage:` sets the total. The last marker wins, and a
/// marker without a percentage resets the total to 0.
pub fn parse_coverage_output(output: &str) -> CoverageData {
    let mut data = CoverageData::default();

    for line in output.lines() {
        if line.contains('%') && line.contains('|') {
            let mut parts = line.split('|');
            if let (Some(path), Some(cell)) = (parts.next(), parts.next()) {
                if let Some(coverage) = extract_percentage(cell) {
                    data.files.push(FileCoverage {
                        file: path.trim().to_string(),
                        coverage,
                        status: CoverageStatus::of(coverage),
                    });
                }
            }
        }

        if line.contains("Total Coverage:") {
            data.total = extract_percentage(line).unwrap_or(0.0);
        }
    }

    data
}

/* ============================================================
   Report formats
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Xml,
    Clover,
}

impl ReportFormat {
    /// Location under a reports directory.
    pub fn default_location(self, reports_dir: &Path) -> PathBuf {
        match self {
            ReportFormat::Html => reports_dir.join("coverage"),
            ReportFormat::Xml => reports_dir.join("coverage.xml"),
            ReportFormat::Clover => reports_dir.join("clover.xml"),
        }
    }

    pub fn flag(self, location: &Path) -> String {
        let name = match self {
            ReportFormat::Html => "html",
            ReportFormat::Xml => "xml",
            ReportFormat::Clover => "clover",
        };
        format!("--coverage-{name}={}", location.display())
    }

    /// The directory that must exist before the runner writes.
    fn target_dir(self, location: &Path) -> Option<&Path> {
        match self {
            ReportFormat::Html => Some(location),
            ReportFormat::Xml | ReportFormat::Clover => location.parent(),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportFormat::Html => "HTML",
            ReportFormat::Xml => "XML",
            ReportFormat::Clover => "Clover",
        };
        f.write_str(s)
    }
}

/* ============================================================
   Analyzer
   ============================================================ */

pub struct CoverageAnalyzer {
    config: CoverageConfig,
    reports_dir: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl CoverageAnalyzer {
    pub fn new(config: &Config, root: &Path) -> Self {
        Self::with_runner(config, root, Box::new(ProcessRunner::from_config(config, root)))
    }

    pub fn with_runner(config: &Config, root: &Path, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            config: config.coverage.clone(),
            reports_dir: config.reports_dir(root),
            runner,
        }
    }

    /// `threshold` falls back to the configured one.
    pub fn analyze(&self, threshold: Option<f64>) -> CoverageResult {
        let threshold = threshold.unwrap_or(self.config.threshold);
        let data = self.run_analysis();
        let passed = data.total >= threshold;

        info!(
            total = data.total,
            files = data.files.len(),
            threshold,
            passed,
            "coverage analyzed"
        );

        CoverageResult {
            total: data.total,
            files: data.files,
            threshold,
            passed,
        }
    }

    pub fn coverage_stats(&self) -> CoverageStats {
        let data = self.run_analysis();
        let covered = data
            .files
            .iter()
            .filter(|f| f.coverage >= GOOD_COVERAGE)
            .count();

        CoverageStats {
            total_coverage: data.total,
            files_analyzed: data.files.len(),
            files_covered: covered,
            files_low_coverage: data.files.len() - covered,
        }
    }

    pub fn generate_html_report(&self, location: Option<&Path>) -> bool {
        self.generate_report(ReportFormat::Html, location)
    }

    pub fn generate_xml_report(&self, location: Option<&Path>) -> bool {
        self.generate_report(ReportFormat::Xml, location)
    }

    pub fn generate_clover_report(&self, location: Option<&Path>) -> bool {
        self.generate_report(ReportFormat::Clover, location)
    }

    /// `location` is the exact report path; `None` uses the reports
    /// directory default for the format.
    pub fn generate_report(&self, format: ReportFormat, location: Option<&Path>) -> bool {
        let location = location
            .map(Path::to_path_buf)
            .unwrap_or_else(|| format.default_location(&self.reports_dir));

        if let Some(dir) = format.target_dir(&location) {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), error = %e, "cannot create report directory");
                return false;
            }
        }

        let flags = vec![format.flag(&location), "--coverage-text".to_string()];
        match self.runner.run(&flags) {
            Ok(_) => {
                info!(format = %format, path = %location.display(), "coverage report generated");
                true
            }
            Err(e) => {
                warn!(format = %format, error = %e, "coverage report failed");
                false
            }
        }
    }

    /// Formats switched on in configuration, written under `output_dir`
    /// (or the reports directory).
    pub fn generate_configured_reports(&self, output_dir: Option<&Path>) -> Vec<(ReportFormat, bool)> {
        let dir = output_dir.unwrap_or(self.reports_dir.as_path());

        [
            (ReportFormat::Html, self.config.html_reports),
            (ReportFormat::Xml, self.config.xml_reports),
            (ReportFormat::Clover, self.config.clover_reports),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(format, _)| {
            let location = format.default_location(dir);
            (format, self.generate_report(format, Some(&location)))
        })
        .collect()
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn run_analysis(&self) -> CoverageData {
        match self.runner.run(&["--coverage-text".to_string()]) {
            Ok(stdout) => parse_coverage_output(&stdout),
            Err(e) => {
                warn!(error = %e, "coverage run failed; reporting zero coverage");
                CoverageData::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use std::cell::RefCell;
    use std::rc::Rc;

    const SAMPLE: &str = "\
  Tests:    12 passed (30 assertions)

  app/Models/User.php ............................ | 92.5% | 10 / 11
  app/Http/Controllers/UserController.php ........ | 45% | 9 / 20
  app/Services/PaymentService.php | 80.0%
  some text with a % sign but no delimiter

  Total Coverage: 78.3%
";

    struct FakeRunner {
        stdout: Option<String>,
        calls: Rc<RefCell<Vec<Vec<String>>>>,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, flags: &[String]) -> Result<String> {
            self.calls.borrow_mut().push(flags.to_vec());
            self.stdout
                .clone()
                .ok_or_else(|| Error::RunnerInvocationFailed("exit 1".into()))
        }
    }

    fn analyzer(stdout: Option<&str>, root: &Path) -> (CoverageAnalyzer, Rc<RefCell<Vec<Vec<String>>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = FakeRunner {
            stdout: stdout.map(str::to_string),
            calls: calls.clone(),
        };
        (
            CoverageAnalyzer::with_runner(&Config::default(), root, Box::new(runner)),
            calls,
        )
    }

    #[test]
    fn parses_files_and_total() {
        let data = parse_coverage_output(SAMPLE);

        assert_eq!(data.total, 78.3);
        assert_eq!(data.files.len(), 3);
        assert!(data.files[0].file.starts_with("app/Models/User.php"));
        assert!(!data.files[0].file.ends_with(' '));
        assert_eq!(data.files[0].coverage, 92.5);
        assert_eq!(data.files[0].status, CoverageStatus::Good);
        assert_eq!(data.files[1].coverage, 45.0);
        assert_eq!(data.files[1].status, CoverageStatus::Low);
        assert_eq!(data.files[2].status, CoverageStatus::Good);
    }

    #[test]
    fn missing_total_marker_means_zero() {
        let data = parse_coverage_output("a.php | 50%\n");
        assert_eq!(data.total, 0.0);
        assert_eq!(data.files.len(), 1);
    }

    #[test]
    fn marker_without_percentage_resets_total() {
        let data = parse_coverage_output("Total Coverage: 90%\nTotal Coverage: n/a\n");
        assert_eq!(data.total, 0.0);
    }

    #[test]
    fn file_row_without_percentage_in_second_cell_is_skipped() {
        let data = parse_coverage_output("a.php | n/a | 50%\n");
        assert!(data.files.is_empty());
    }

    #[test]
    fn analyze_compares_total_with_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let (a, calls) = analyzer(Some(SAMPLE), dir.path());

        let strict = a.analyze(None);
        assert_eq!(strict.threshold, 80.0);
        assert!(!strict.passed);

        let lenient = a.analyze(Some(78.3));
        assert!(lenient.passed);

        assert_eq!(calls.borrow()[0], vec!["--coverage-text".to_string()]);
    }

    #[test]
    fn runner_failure_gives_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = analyzer(None, dir.path());

        let r = a.analyze(Some(0.0));
        assert_eq!(r.total, 0.0);
        assert!(r.files.is_empty());
        assert!(r.passed);
        assert!(!a.analyze(None).passed);
    }

    #[test]
    fn stats_split_at_eighty() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = analyzer(Some(SAMPLE), dir.path());

        assert_eq!(
            a.coverage_stats(),
            CoverageStats {
                total_coverage: 78.3,
                files_analyzed: 3,
                files_covered: 2,
                files_low_coverage: 1,
            }
        );
    }

    #[test]
    fn reports_use_runner_flags_and_default_locations() {
        let dir = tempfile::tempdir().unwrap();
        let (a, calls) = analyzer(Some(""), dir.path());
        let reports = Config::default().reports_dir(dir.path());

        assert!(a.generate_html_report(None));
        assert!(a.generate_xml_report(None));
        assert!(a.generate_clover_report(None));

        let calls = calls.borrow();
        assert_eq!(
            calls[0],
            vec![
                format!("--coverage-html={}", reports.join("coverage").display()),
                "--coverage-text".to_string(),
            ]
        );
        assert_eq!(calls[1][0], format!("--coverage-xml={}", reports.join("coverage.xml").display()));
        assert_eq!(calls[2][0], format!("--coverage-clover={}", reports.join("clover.xml").display()));
        assert!(reports.join("coverage").is_dir());
    }

    #[test]
    fn failed_report_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = analyzer(None, dir.path());
        assert!(!a.generate_html_report(Some(&dir.path().join("out"))));
    }

    #[test]
    fn configured_reports_follow_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.coverage.xml_reports = true;

        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = FakeRunner {
            stdout: Some(String::new()),
            calls: calls.clone(),
        };
        let a = CoverageAnalyzer::with_runner(&config, dir.path(), Box::new(runner));

        let out = dir.path().join("custom");
        let done = a.generate_configured_reports(Some(&out));
        assert_eq!(done, vec![(ReportFormat::Html, true), (ReportFormat::Xml, true)]);
        assert_eq!(calls.borrow()[1][0], format!("--coverage-xml={}", out.join("coverage.xml").display()));
    }
}
