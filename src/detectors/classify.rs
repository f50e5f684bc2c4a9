//! detectors/classify.rs
//!
//! Heuristic unit classification based on substring matches.

use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UnitKind {
    Model,
    Controller,
    Service,
    Plain,
}

/// Rules apply in order, first match wins:
/// 1. `extends Model` / `extends Authenticatable`
/// 2. `extends Controller` or any `Controller`
/// 3. `Service` without `Test`
/// 4. everything else
pub fn classify(text: &str) -> UnitKind {
    if text.contains("extends Model") || text.contains("extends Authenticatable") {
        return UnitKind::Model;
    }

    if text.contains("Controller") {
        return UnitKind::Controller;
    }

    if text.contains("Service") && !text.contains("Test") {
        return UnitKind::Service;
    }

    UnitKind::Plain
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitKind::Model => "model",
            UnitKind::Controller => "controller",
            UnitKind::Service => "service",
            UnitKind::Plain => "plain",
        };
        f.write_str(s)
    }
}
