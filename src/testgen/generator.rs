//! generator.rs
//!
//! Template-driven test generation pipeline:
//! source file → classification → method synthesis → placeholder
//! substitution → file write.
//!
//! Every entry point returns `bool`. Per-file failures are logged and never
//! abort a directory run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glob::Pattern;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::detectors::{classify, SourceUnit, UnitKind};
use crate::error::{Error, Result};
use crate::testgen::file::{destination_for, TestArtifact, TestFileWriter};
use crate::testgen::synth;
use crate::testgen::template::{substitute, PlaceholderMap, TemplateKind, TemplateSet};

/// Requested test type (`--type`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TestType {
    Unit,
    Feature,
    Model,
    Controller,
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" => Ok(TestType::Unit),
            "feature" => Ok(TestType::Feature),
            "model" => Ok(TestType::Model),
            "controller" => Ok(TestType::Controller),
            other => Err(format!(
                "unknown test type `{other}` (expected unit, feature, model or controller)"
            )),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestType::Unit => "unit",
            TestType::Feature => "feature",
            TestType::Model => "model",
            TestType::Controller => "controller",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub force: bool,
    pub test_type: Option<TestType>,
}

impl GenerateOptions {
    /// `model` / `controller` force that kind; anything else auto-classifies.
    fn forced_kind(&self) -> Option<UnitKind> {
        match self.test_type {
            Some(TestType::Model) => Some(UnitKind::Model),
            Some(TestType::Controller) => Some(UnitKind::Controller),
            _ => None,
        }
    }
}

/// Unit or Feature test suite.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Suite {
    Unit,
    Feature,
}

impl Suite {
    fn namespace(self) -> &'static str {
        match self {
            Suite::Unit => "Tests\\Unit",
            Suite::Feature => "Tests\\Feature",
        }
    }
}

pub struct TestGenerator {
    config: Config,
    root: PathBuf,
    templates: TemplateSet,
    writer: TestFileWriter,
    exclude: Vec<Pattern>,
}

impl TestGenerator {
    pub fn new(config: &Config, root: &Path) -> Self {
        let exclude = config
            .generation
            .exclude_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pat) => Some(pat),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            config: config.clone(),
            root: root.to_path_buf(),
            templates: TemplateSet::load(&config.templates, root),
            writer: TestFileWriter::new(),
            exclude,
        }
    }

    /* ============================================================
       Public API
       ============================================================ */

    /// File or directory; anything else fails.
    pub fn generate_basic_tests(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        if path.is_dir() {
            return self.generate_for_directory(path, opts);
        }

        if path.is_file() {
            return self.generate_for_file(path, opts);
        }

        warn!(path = %path.display(), "path is neither a file nor a directory");
        false
    }

    pub fn generate_for_model(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.run(path, Some(UnitKind::Model), opts)
    }

    pub fn generate_for_controller(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.run(path, Some(UnitKind::Controller), opts)
    }

    pub fn generate_for_service(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.run(path, Some(UnitKind::Service), opts)
    }

    pub fn generate_unit_test(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.run(path, Some(UnitKind::Plain), opts)
    }

    /// Classify, then dispatch to the matching generator.
    pub fn generate_for_file(&mut self, path: &Path, opts: GenerateOptions) -> bool {
        self.run(path, opts.forced_kind(), opts)
    }

    /// Every eligible file is attempted; success only if all succeeded.
    pub fn generate_for_directory(&mut self, dir: &Path, opts: GenerateOptions) -> bool {
        let mut success = true;
        let mut attempted = 0usize;

        for file in self.source_files(dir) {
            attempted += 1;
            if !self.generate_for_file(&file, opts) {
                success = false;
            }
        }

        info!(dir = %dir.display(), attempted, success, "directory generation finished");
        success
    }

    pub fn written_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.writer.written().map(Path::to_path_buf).collect();
        files.sort();
        files
    }

    /* ============================================================
       Pipeline
       ============================================================ */

    fn run(&mut self, path: &Path, kind: Option<UnitKind>, opts: GenerateOptions) -> bool {
        match self.generate(path, kind, opts) {
            Ok(written) => {
                debug!(source = %path.display(), test = %written.display(), "generated");
                true
            }
            Err(Error::NotAClass(p)) => {
                debug!(path = %p.display(), "skipping: no class declaration");
                false
            }
            Err(Error::DestinationExists(p)) => {
                warn!(path = %p.display(), "test file exists; use --force to overwrite");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "test generation failed");
                false
            }
        }
    }

    fn generate(
        &mut self,
        path: &Path,
        kind: Option<UnitKind>,
        opts: GenerateOptions,
    ) -> Result<PathBuf> {
        let unit = SourceUnit::read(path)?;
        let class = unit.require_class()?.to_string();
        let kind = kind.unwrap_or_else(|| classify(&unit.raw_text));

        let (suite, template, namespace_key) = match kind {
            UnitKind::Model => (Suite::Unit, TemplateKind::ModelTest, "MODEL_NAMESPACE"),
            UnitKind::Controller => (
                Suite::Feature,
                TemplateKind::ControllerTest,
                "CONTROLLER_NAMESPACE",
            ),
            UnitKind::Service | UnitKind::Plain => {
                (Suite::Unit, TemplateKind::UnitTest, "SERVICE_NAMESPACE")
            }
        };

        let destination = destination_for(
            &self.suite_dir(suite),
            &class,
            &self.config.generation.extension,
        );
        self.writer.ensure_writable(&destination, opts.force)?;

        let placeholders = PlaceholderMap::new()
            .with("CLASS", class.as_str())
            .with("TEST_CLASS", format!("{class}Test"))
            .with("NAMESPACE", suite.namespace())
            .with(namespace_key, unit.namespace.as_str())
            .with("METHODS", synth::synthesize(kind, &class, &unit));

        let content = substitute(&self.templates.get(template).raw_template, &placeholders);

        debug!(class = %class, kind = %kind, "synthesized test class");

        self.writer.write(
            &TestArtifact {
                destination_path: destination,
                content,
            },
            opts.force,
        )
    }

    fn suite_dir(&self, suite: Suite) -> PathBuf {
        match suite {
            Suite::Unit => self.config.unit_test_dir(&self.root),
            Suite::Feature => self.config.feature_test_dir(&self.root),
        }
    }

    /* ============================================================
       Directory walk
       ============================================================ */

    fn source_files(&self, dir: &Path) -> Vec<PathBuf> {
        let ignore = &self.config.ignore_directories;

        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e, ignore))
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| has_extension(e.path(), &self.config.generation.extension))
            .filter(|e| !self.is_excluded(e))
            .map(DirEntry::into_path)
            .collect()
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        let hit = self.exclude.iter().any(|p| p.matches(&name));
        if hit {
            debug!(file = %entry.path().display(), "excluded by pattern");
        }
        hit
    }
}

fn is_ignored_dir(entry: &DirEntry, ignore: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && ignore.iter().any(|i| entry.path().ends_with(Path::new(i)))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}
