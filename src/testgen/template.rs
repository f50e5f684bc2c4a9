//! testgen/template.rs
//!
//! `{{KEY}}` placeholder templates for generated test files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::config::TemplatesConfig;

const UNIT_TEST: &str = include_str!("../../templates/unit-test.php.tpl");
const MODEL_TEST: &str = include_str!("../../templates/model-test.php.tpl");
const CONTROLLER_TEST: &str = include_str!("../../templates/controller-test.php.tpl");

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TemplateKind {
    UnitTest,
    ModelTest,
    ControllerTest,
}

impl TemplateKind {
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::UnitTest => "unit_test",
            TemplateKind::ModelTest => "model_test",
            TemplateKind::ControllerTest => "controller_test",
        }
    }

    pub fn builtin(self) -> &'static str {
        match self {
            TemplateKind::UnitTest => UNIT_TEST,
            TemplateKind::ModelTest => MODEL_TEST,
            TemplateKind::ControllerTest => CONTROLLER_TEST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateSpec {
    pub name: &'static str,
    pub raw_template: String,
}

/// Resolved templates, read-only during generation.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    unit: TemplateSpec,
    model: TemplateSpec,
    controller: TemplateSpec,
}

impl TemplateSet {
    pub fn builtin() -> Self {
        Self {
            unit: builtin_spec(TemplateKind::UnitTest),
            model: builtin_spec(TemplateKind::ModelTest),
            controller: builtin_spec(TemplateKind::ControllerTest),
        }
    }

    /// Configured template files (relative to `root`) replace the built-ins
    /// when they can be read.
    pub fn load(cfg: &TemplatesConfig, root: &Path) -> Self {
        Self {
            unit: resolve(TemplateKind::UnitTest, cfg.unit_test.as_deref(), root),
            model: resolve(TemplateKind::ModelTest, cfg.model_test.as_deref(), root),
            controller: resolve(
                TemplateKind::ControllerTest,
                cfg.controller_test.as_deref(),
                root,
            ),
        }
    }

    pub fn get(&self, kind: TemplateKind) -> &TemplateSpec {
        match kind {
            TemplateKind::UnitTest => &self.unit,
            TemplateKind::ModelTest => &self.model,
            TemplateKind::ControllerTest => &self.controller,
        }
    }
}

fn builtin_spec(kind: TemplateKind) -> TemplateSpec {
    TemplateSpec {
        name: kind.name(),
        raw_template: kind.builtin().to_string(),
    }
}

fn resolve(kind: TemplateKind, configured: Option<&Path>, root: &Path) -> TemplateSpec {
    let Some(path) = configured else {
        return builtin_spec(kind);
    };

    let full: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    match fs::read_to_string(&full) {
        Ok(raw) => {
            debug!(template = kind.name(), path = %full.display(), "using custom template");
            TemplateSpec {
                name: kind.name(),
                raw_template: raw,
            }
        }
        Err(e) => {
            warn!(template = kind.name(), path = %full.display(), error = %e, "falling back to built-in template");
            builtin_spec(kind)
        }
    }
}

/* ============================================================
   Substitution
   ============================================================ */

#[derive(Debug, Clone, Default)]
pub struct PlaceholderMap {
    entries: BTreeMap<String, String>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").unwrap())
}

/// Replace every `{{KEY}}` that has an entry in `map`. Single pass over the
/// template, so substituted text is never re-scanned and key order does not
/// matter. Markers without an entry are left verbatim.
pub fn substitute(template: &str, map: &PlaceholderMap) -> String {
    marker_re()
        .replace_all(template, |caps: &Captures| match map.get(&caps[1]) {
            Some(v) => v.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
