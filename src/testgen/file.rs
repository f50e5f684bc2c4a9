// src/testgen/file.rs

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Generated test source bound for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArtifact {
    pub destination_path: PathBuf,
    pub content: String,
}

/// `<dir>/<Class>Test.<ext>`
pub fn destination_for(dir: &Path, class: &str, extension: &str) -> PathBuf {
    dir.join(format!("{class}Test.{extension}"))
}

/// Writes test files, refusing to clobber existing ones unless forced and
/// never writing the same destination twice in one run.
#[derive(Debug, Default)]
pub struct TestFileWriter {
    written: HashSet<PathBuf>,
}

impl TestFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite guard, usable before any content is built.
    pub fn ensure_writable(&self, path: &Path, force: bool) -> Result<()> {
        if self.written.contains(path) {
            return Err(Error::DestinationExists(path.to_path_buf()));
        }

        if path.exists() && !force {
            return Err(Error::DestinationExists(path.to_path_buf()));
        }

        Ok(())
    }

    pub fn write(&mut self, artifact: &TestArtifact, force: bool) -> Result<PathBuf> {
        let path = &artifact.destination_path;
        self.ensure_writable(path, force)?;
        ensure_parent_dir(path)?;

        fs::write(path, &artifact.content).map_err(|e| Error::io(path, e))?;
        self.written.insert(path.clone());

        info!(path = %path.display(), bytes = artifact.content.len(), "wrote test file");
        Ok(path.clone())
    }

    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.written.iter().map(PathBuf::as_path)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            debug!(dir = %parent.display(), "ensuring test directory");
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(dir: &Path) -> TestArtifact {
        TestArtifact {
            destination_path: destination_for(&dir.join("tests/Unit"), "Foo", "php"),
            content: "<?php // test".into(),
        }
    }

    #[test]
    fn destination_is_class_test_file() {
        assert_eq!(
            destination_for(Path::new("tests/Unit"), "Foo", "php"),
            PathBuf::from("tests/Unit/FooTest.php")
        );
    }

    #[test]
    fn creates_parent_dirs_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = TestFileWriter::new();
        let a = artifact(dir.path());

        let path = w.write(&a, false).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "<?php // test");
    }

    #[test]
    fn existing_file_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path());
        fs::create_dir_all(a.destination_path.parent().unwrap()).unwrap();
        fs::write(&a.destination_path, "original").unwrap();

        let mut w = TestFileWriter::new();
        assert!(matches!(w.write(&a, false), Err(Error::DestinationExists(_))));
        assert_eq!(fs::read_to_string(&a.destination_path).unwrap(), "original");

        w.write(&a, true).unwrap();
        assert_eq!(fs::read_to_string(&a.destination_path).unwrap(), "<?php // test");
    }

    #[test]
    fn same_destination_is_written_once_even_with_force() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path());
        let mut w = TestFileWriter::new();

        w.write(&a, true).unwrap();
        assert!(matches!(w.write(&a, true), Err(Error::DestinationExists(_))));
        assert_eq!(w.written().count(), 1);
    }
}
