//! Tag and severity vocabularies for move classification

use serde::{Deserialize, Serialize};

/// Tactical category of a single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticalTag {
    Mate,
    Check,
    Fork,
    Pin,
    DiscoveredAttack,
    Blunder,
    TacticalOpportunity,
}

impl TacticalTag {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            TacticalTag::Mate => "mate",
            TacticalTag::Check => "check",
            TacticalTag::Fork => "fork",
            TacticalTag::Pin => "pin",
            TacticalTag::DiscoveredAttack => "discovered_attack",
            TacticalTag::Blunder => "blunder",
            TacticalTag::TacticalOpportunity => "tactical_opportunity",
        }
    }
}

/// Severity of a move, derived from the centipawn delta alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Excellent,
    Good,
    Acceptable,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl Severity {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Excellent => "excellent",
            Severity::Good => "good",
            Severity::Acceptable => "acceptable",
            Severity::Inaccuracy => "inaccuracy",
            Severity::Mistake => "mistake",
            Severity::Blunder => "blunder",
        }
    }
}
