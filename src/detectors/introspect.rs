//! detectors/introspect.rs
//!
//! Best-effort textual scan of a PHP source file.
//!
//! This is pattern matching over raw text, not a parser: nested or anonymous
//! classes, traits, and declarations inside strings or comments are not
//! told apart and may produce false positives.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// One scanned source file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub raw_text: String,
    /// `None` means the file has no recognizable class declaration.
    pub class_name: Option<String>,
    /// Empty when the file declares no namespace.
    pub namespace: String,
    /// In textual order, duplicates kept.
    pub public_methods: Vec<String>,
}

impl SourceUnit {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_text(path, raw))
    }

    pub fn from_text(path: impl Into<PathBuf>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();

        Self {
            path: path.into(),
            class_name: extract_class_name(&raw_text),
            namespace: extract_namespace(&raw_text),
            public_methods: extract_public_methods(&raw_text),
            raw_text,
        }
    }

    pub fn is_class(&self) -> bool {
        self.class_name.is_some()
    }

    /// Class name, or `NotAClass` for files without one.
    pub fn require_class(&self) -> Result<&str> {
        self.class_name
            .as_deref()
            .ok_or_else(|| Error::NotAClass(self.path.clone()))
    }

    /// Public methods other than the constructor.
    pub fn testable_methods(&self) -> impl Iterator<Item = &str> {
        self.public_methods
            .iter()
            .map(String::as_str)
            .filter(|m| *m != "__construct")
    }
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"class\s+([A-Za-z0-9_]+)").unwrap())
}

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"namespace\s+([^;]+);").unwrap())
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"public\s+function\s+([A-Za-z0-9_]+)").unwrap())
}

pub fn extract_class_name(text: &str) -> Option<String> {
    class_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_namespace(text: &str) -> String {
    namespace_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

pub fn extract_public_methods(text: &str) -> Vec<String> {
    method_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_class_namespace_and_methods() {
        let src = "<?php\n\nnamespace App\\Models;\n\nclass User {\n    public function __construct() {}\n    public function posts() {}\n    protected function hidden() {}\n    public function getFullNameAttribute() {}\n}";
        let unit = SourceUnit::from_text("app/Models/User.php", src);

        assert_eq!(unit.class_name.as_deref(), Some("User"));
        assert_eq!(unit.namespace, "App\\Models");
        assert_eq!(
            unit.public_methods,
            vec!["__construct", "posts", "getFullNameAttribute"]
        );
        assert_eq!(
            unit.testable_methods().collect::<Vec<_>>(),
            vec!["posts", "getFullNameAttribute"]
        );
    }

    #[test]
    fn missing_class_is_not_a_class() {
        let unit = SourceUnit::from_text("helpers.php", "<?php\nfunction helper() {}\n");
        assert!(!unit.is_class());
        assert!(matches!(unit.require_class(), Err(Error::NotAClass(_))));
        assert_eq!(unit.namespace, "");
    }

    #[test]
    fn duplicate_methods_are_kept_in_order() {
        let src = "class A { public function run() {} public  function stop() {} public function run() {} }";
        assert_eq!(extract_public_methods(src), vec!["run", "stop", "run"]);
    }

    #[test]
    fn first_class_keyword_wins() {
        let src = "class First {}\nclass Second {}";
        assert_eq!(extract_class_name(src).as_deref(), Some("First"));
    }

    #[test]
    fn read_reports_io_errors() {
        let err = SourceUnit::read(Path::new("/definitely/not/here.php")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
