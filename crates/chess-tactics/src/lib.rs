//! Pure tactical classification over chess positions.
//! No I/O, no engine dependencies.

pub mod board_utils;
pub mod classify;
pub mod severity;
pub mod tags;

pub use classify::classify_pattern;
pub use severity::{classify_severity, SeverityPreset};
pub use tags::{Severity, TacticalTag};
