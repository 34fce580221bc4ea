//! Severity classification from the mover-perspective centipawn delta.
//! Two selectable threshold presets; one preset applies uniformly per run.

use std::str::FromStr;

use crate::tags::Severity;

// Coarse preset thresholds
const COARSE_BLUNDER: i32 = -200;
const COARSE_MISTAKE: i32 = -80;
const COARSE_INACCURACY: i32 = -20;
const COARSE_EXCELLENT: i32 = 20;

// Fine preset thresholds
const FINE_BLUNDER: i32 = -200;
const FINE_MISTAKE: i32 = -100;
const FINE_INACCURACY: i32 = -50;

/// Threshold preset selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityPreset {
    /// Production default.
    #[default]
    Coarse,
    Fine,
}

impl FromStr for SeverityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coarse" => Ok(SeverityPreset::Coarse),
            "fine" => Ok(SeverityPreset::Fine),
            other => Err(format!("unknown severity preset: {other}")),
        }
    }
}

/// Classify a move's severity from its signed centipawn delta
/// (negative = the mover lost ground).
pub fn classify_severity(score_diff: i32, preset: SeverityPreset) -> Severity {
    match preset {
        SeverityPreset::Coarse => {
            if score_diff <= COARSE_BLUNDER {
                Severity::Blunder
            } else if score_diff <= COARSE_MISTAKE {
                Severity::Mistake
            } else if score_diff <= COARSE_INACCURACY {
                Severity::Inaccuracy
            } else if score_diff >= COARSE_EXCELLENT {
                Severity::Excellent
            } else {
                Severity::Acceptable
            }
        }
        SeverityPreset::Fine => {
            if score_diff <= FINE_BLUNDER {
                Severity::Blunder
            } else if score_diff <= FINE_MISTAKE {
                Severity::Mistake
            } else if score_diff <= FINE_INACCURACY {
                Severity::Inaccuracy
            } else {
                Severity::Good
            }
        }
    }
}
