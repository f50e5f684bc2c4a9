pub mod classify;
pub mod introspect;

pub use classify::{classify, UnitKind};
pub use introspect::SourceUnit;
