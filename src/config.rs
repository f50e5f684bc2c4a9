//! config.rs
//!
//! Tool configuration. Built once at startup (defaults, then a TOML file,
//! then `TEST_ACCELERATOR_*` environment overrides) and handed to every
//! component by reference.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "test-accelerator.toml";
const ENV_PREFIX: &str = "TEST_ACCELERATOR_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub test_paths: Vec<String>,
    pub ignore_directories: Vec<String>,
    pub generation: GenerationConfig,
    pub benchmark: BenchmarkConfig,
    pub coverage: CoverageConfig,
    pub templates: TemplatesConfig,
    pub reports: ReportsConfig,
    pub runner: RunnerConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// File-name globs skipped in directory mode.
    pub exclude_patterns: Vec<String>,
    /// Source and test file extension.
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Milliseconds.
    pub slow_threshold: f64,
    /// Kilobytes.
    pub memory_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub threshold: f64,
    pub html_reports: bool,
    pub xml_reports: bool,
    pub clover_reports: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub unit_test: Option<PathBuf>,
    pub model_test: Option<PathBuf>,
    pub controller_test: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub output_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub binary: String,
    /// Prepended to every invocation, before the coverage/verbose flags.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai: AiConfig::default(),
            test_paths: vec![
                "tests/Unit".into(),
                "tests/Feature".into(),
                "tests/Integration".into(),
            ],
            ignore_directories: vec![
                "vendor".into(),
                "node_modules".into(),
                "storage".into(),
                "bootstrap/cache".into(),
                "public".into(),
                "resources/views".into(),
            ],
            generation: GenerationConfig::default(),
            benchmark: BenchmarkConfig::default(),
            coverage: CoverageConfig::default(),
            templates: TemplatesConfig::default(),
            reports: ReportsConfig::default(),
            runner: RunnerConfig::default(),
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            api_key: String::new(),
            model: "gpt-4".into(),
            max_tokens: 4000,
            temperature: 0.7,
            base_url: None,
            timeout_secs: 60,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: vec!["*Test.php".into(), "*Trait.php".into(), "Abstract*".into()],
            extension: "php".into(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            slow_threshold: 1000.0,
            memory_threshold: 1024.0,
        }
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            html_reports: true,
            xml_reports: false,
            clover_reports: false,
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("storage/app/laravel-test-accelerator"),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            binary: "vendor/bin/pest".into(),
            args: Vec::new(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channels: vec!["mail".into()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl Config {
    /// Load configuration for a project rooted at `root`.
    ///
    /// File lookup order: `explicit`, `<root>/test-accelerator.toml`, then the
    /// user config directory. Environment overrides are applied last.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match candidate_files(root).into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `TEST_ACCELERATOR_*` overrides. `lookup` receives the full
    /// variable name.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("AI_PROVIDER") {
            self.ai.provider = v;
        }
        if let Some(v) = var("AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Some(v) = var("AI_MODEL") {
            self.ai.model = v;
        }
        if let Some(v) = var("AI_BASE_URL") {
            self.ai.base_url = Some(v);
        }
        if let Some(v) = var("RUNNER") {
            self.runner.binary = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }

        override_number(&mut self.benchmark.slow_threshold, "SLOW_THRESHOLD", var("SLOW_THRESHOLD"));
        override_number(&mut self.benchmark.memory_threshold, "MEMORY_THRESHOLD", var("MEMORY_THRESHOLD"));
        override_number(&mut self.coverage.threshold, "COVERAGE_THRESHOLD", var("COVERAGE_THRESHOLD"));

        if let Some(v) = var("HTML_REPORTS") {
            self.coverage.html_reports = truthy(&v);
        }
        if let Some(v) = var("XML_REPORTS") {
            self.coverage.xml_reports = truthy(&v);
        }
        if let Some(v) = var("CLOVER_REPORTS") {
            self.coverage.clover_reports = truthy(&v);
        }
        if let Some(v) = var("NOTIFICATIONS") {
            self.notifications.enabled = truthy(&v);
        }
    }

    /* ---------- path helpers ---------- */

    pub fn unit_test_dir(&self, root: &Path) -> PathBuf {
        root.join(self.test_paths.first().map(String::as_str).unwrap_or("tests/Unit"))
    }

    /// Second configured test path, falling back to the first.
    pub fn feature_test_dir(&self, root: &Path) -> PathBuf {
        match self.test_paths.get(1) {
            Some(p) => root.join(p),
            None => self.unit_test_dir(root),
        }
    }

    pub fn reports_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.reports.output_directory)
    }
}

fn candidate_files(root: &Path) -> Vec<PathBuf> {
    let mut out = vec![root.join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        out.push(dir.join("test-accelerator").join("config.toml"));
    }
    out
}

fn override_number(slot: &mut f64, name: &str, raw: Option<String>) {
    let Some(raw) = raw else {
        return;
    };

    match raw.trim().parse::<f64>() {
        Ok(v) if v >= 0.0 => *slot = v,
        _ => warn!(var = %format!("{ENV_PREFIX}{name}"), value = %raw, "ignoring non-numeric override"),
    }
}

fn truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = Config::default();
        assert_eq!(c.ai.provider, "openai");
        assert_eq!(c.ai.model, "gpt-4");
        assert_eq!(c.ai.max_tokens, 4000);
        assert!((c.ai.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(c.test_paths, vec!["tests/Unit", "tests/Feature", "tests/Integration"]);
        assert_eq!(c.benchmark.slow_threshold, 1000.0);
        assert_eq!(c.benchmark.memory_threshold, 1024.0);
        assert_eq!(c.coverage.threshold, 80.0);
        assert_eq!(c.runner.binary, "vendor/bin/pest");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let c = Config::from_toml(
            r#"
            test_paths = ["spec/unit"]

            [ai]
            provider = "anthropic"

            [benchmark]
            slow_threshold = 250
            "#,
        )
        .unwrap();

        assert_eq!(c.ai.provider, "anthropic");
        assert_eq!(c.ai.model, "gpt-4");
        assert_eq!(c.benchmark.slow_threshold, 250.0);
        assert_eq!(c.benchmark.memory_threshold, 1024.0);
        assert_eq!(c.test_paths, vec!["spec/unit"]);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml("[ai\nprovider = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply_and_bad_numbers_are_ignored() {
        let vars = env(&[
            ("TEST_ACCELERATOR_AI_API_KEY", "sk-test"),
            ("TEST_ACCELERATOR_AI_PROVIDER", "anthropic"),
            ("TEST_ACCELERATOR_SLOW_THRESHOLD", "500"),
            ("TEST_ACCELERATOR_MEMORY_THRESHOLD", "lots"),
            ("TEST_ACCELERATOR_XML_REPORTS", "yes"),
        ]);

        let mut c = Config::default();
        c.apply_env_overrides(|k| vars.get(k).cloned());

        assert_eq!(c.ai.api_key, "sk-test");
        assert_eq!(c.ai.provider, "anthropic");
        assert_eq!(c.benchmark.slow_threshold, 500.0);
        assert_eq!(c.benchmark.memory_threshold, 1024.0);
        assert!(c.coverage.xml_reports);
    }

    #[test]
    fn feature_dir_falls_back_to_first_path() {
        let mut c = Config::default();
        let root = Path::new("/project");
        assert_eq!(c.feature_test_dir(root), PathBuf::from("/project/tests/Feature"));

        c.test_paths = vec!["tests/Only".into()];
        assert_eq!(c.feature_test_dir(root), PathBuf::from("/project/tests/Only"));
    }

    #[test]
    fn load_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[coverage]\nthreshold = 65\n",
        )
        .unwrap();

        let c = Config::load(dir.path(), None).unwrap();
        assert_eq!(c.coverage.threshold, 65.0);
    }

    #[test]
    fn load_with_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(dir.path(), Some(&missing)),
            Err(Error::Io { .. })
        ));
    }
}
