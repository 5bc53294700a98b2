//! Ordered severity levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Totally ordered safety levels consumed by the downstream scheduler and
/// notifier. Comparisons use ordinal position only; the numeric band
/// boundaries live in the escalation config, not here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EscalationLevel {
    /// Baseline operation
    Normal,
    /// Sustained deviation worth watching
    Watch,
    /// Corrective action recommended
    Alert,
    /// Corrective action required
    Critical,
    /// All-hands response
    Emergency,
}

impl EscalationLevel {
    /// All levels in ascending order.
    pub const ALL: [EscalationLevel; 5] = [
        EscalationLevel::Normal,
        EscalationLevel::Watch,
        EscalationLevel::Alert,
        EscalationLevel::Critical,
        EscalationLevel::Emergency,
    ];

    /// Ordinal position (0 = Normal).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Level at the given ordinal position, if any.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Next level up, or `None` at the top.
    pub fn next_up(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Next level down, or `None` at the bottom.
    pub fn next_down(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Is this the highest level?
    pub fn is_top(&self) -> bool {
        *self == EscalationLevel::Emergency
    }
}

impl fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EscalationLevel::Normal => "NORMAL",
            EscalationLevel::Watch => "WATCH",
            EscalationLevel::Alert => "ALERT",
            EscalationLevel::Critical => "CRITICAL",
            EscalationLevel::Emergency => "EMERGENCY",
        };
        write!(f, "{name}")
    }
}
