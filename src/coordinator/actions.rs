//! Corrective-action records emitted each cycle.
//!
//! Severity is bucketed from signal magnitude through fixed thresholds and
//! the category comes from a per-metric direction table: exhaustive matches
//! over closed enums plus data, so adding a tier cannot silently fall
//! through to a default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::controller::ControllerResult;
use crate::escalation::EscalationLevel;

/// Signal fraction at or above which an action is Advisory.
pub const ADVISORY_FRACTION: f64 = 0.25;
/// Signal fraction at or above which an action is Urgent.
pub const URGENT_FRACTION: f64 = 0.50;
/// Signal fraction at or above which an action is Critical.
pub const CRITICAL_FRACTION: f64 = 0.80;

/// What the consuming scheduler/notifier should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    /// Add staffing or capacity
    IncreaseResource,
    /// Remove excess staffing or capacity
    DecreaseResource,
    /// Rebalance load across workers
    Redistribute,
    /// Notify only, no scheduling change
    AlertOnly,
    /// Call in backup staff
    RecruitBackup,
    /// Shed non-essential scope
    ReduceScope,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionCategory::IncreaseResource => "increase-resource",
            ActionCategory::DecreaseResource => "decrease-resource",
            ActionCategory::Redistribute => "redistribute",
            ActionCategory::AlertOnly => "alert-only",
            ActionCategory::RecruitBackup => "recruit-backup",
            ActionCategory::ReduceScope => "reduce-scope",
        };
        write!(f, "{name}")
    }
}

/// How urgently the consumer should act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionSeverity {
    /// Informational
    Info,
    /// Worth scheduling attention soon
    Advisory,
    /// Act this cycle
    Urgent,
    /// Act immediately
    Critical,
}

impl ActionSeverity {
    /// Bucket a normalized signal magnitude (0..=1) into a severity.
    pub fn from_signal_fraction(fraction: f64) -> Self {
        if fraction >= CRITICAL_FRACTION {
            ActionSeverity::Critical
        } else if fraction >= URGENT_FRACTION {
            ActionSeverity::Urgent
        } else if fraction >= ADVISORY_FRACTION {
            ActionSeverity::Advisory
        } else {
            ActionSeverity::Info
        }
    }

    /// Severity implied by an escalation level.
    pub fn from_level(level: EscalationLevel) -> Self {
        match level {
            EscalationLevel::Normal => ActionSeverity::Info,
            EscalationLevel::Watch => ActionSeverity::Advisory,
            EscalationLevel::Alert => ActionSeverity::Urgent,
            EscalationLevel::Critical | EscalationLevel::Emergency => ActionSeverity::Critical,
        }
    }
}

/// Per-metric mapping from control-signal sign to action category.
///
/// A positive signal means the loop wants the metric pushed *up* toward its
/// setpoint; what that means operationally differs per metric (coverage
/// shortfall recruits backup, utilization shortfall adds resources).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectionTable {
    entries: BTreeMap<String, (ActionCategory, ActionCategory)>,
}

impl DirectionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method mapping one metric's (positive, negative) directions.
    pub fn with_metric(
        mut self,
        metric: impl Into<String>,
        on_positive: ActionCategory,
        on_negative: ActionCategory,
    ) -> Self {
        self.entries.insert(metric.into(), (on_positive, on_negative));
        self
    }

    /// Category for a metric and signal sign. Metrics without an entry
    /// degrade to alert-only.
    pub fn category_for(&self, metric: &str, signal: f64) -> ActionCategory {
        match self.entries.get(metric) {
            Some(&(positive, negative)) => {
                if signal >= 0.0 {
                    positive
                } else {
                    negative
                }
            }
            None => ActionCategory::AlertOnly,
        }
    }
}

/// Where a corrective action originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionSource {
    /// A controller's update step for the named metric
    Controller { metric: String },
    /// An escalation level transition
    Escalation,
}

/// One corrective-action recommendation, produced fresh each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CorrectiveAction {
    /// Originating controller or escalation event
    pub source: ActionSource,
    /// What the consumer should do
    pub category: ActionCategory,
    /// How urgently
    pub severity: ActionSeverity,
    /// Magnitude (|control signal| or risk score, per source)
    pub magnitude: f64,
    /// Free-text diagnostic summary
    pub summary: String,
    /// P/I/D breakdown and saturation flags, when controller-sourced
    pub diagnostics: Option<ControllerResult>,
    /// When this action was produced
    pub timestamp_ms: u64,
}

impl CorrectiveAction {
    /// Build an action from one controller result.
    pub fn from_controller(
        result: &ControllerResult,
        directions: &DirectionTable,
        now_ms: u64,
    ) -> Self {
        let category = directions.category_for(&result.name, result.control_signal);
        let severity = ActionSeverity::from_signal_fraction(result.signal_fraction);
        let summary = format!(
            "{}: signal {:+.4} (error {:+.4}{}){}",
            result.name,
            result.control_signal,
            result.error,
            if result.predicted { ", predicted" } else { "" },
            if result.output_saturated {
                ", output saturated"
            } else {
                ""
            },
        );
        Self {
            source: ActionSource::Controller {
                metric: result.name.clone(),
            },
            category,
            severity,
            magnitude: result.control_signal.abs(),
            summary,
            diagnostics: Some(result.clone()),
            timestamp_ms: now_ms,
        }
    }

    /// Build an action announcing a committed level transition.
    pub fn from_transition(
        from: EscalationLevel,
        to: EscalationLevel,
        risk_score: f64,
        now_ms: u64,
    ) -> Self {
        Self {
            source: ActionSource::Escalation,
            category: ActionCategory::AlertOnly,
            severity: ActionSeverity::from_level(to),
            magnitude: risk_score,
            summary: format!("escalation level changed {from} -> {to} at risk {risk_score:.1}"),
            diagnostics: None,
            timestamp_ms: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_buckets_are_exhaustive() {
        assert_eq!(
            ActionSeverity::from_signal_fraction(0.0),
            ActionSeverity::Info
        );
        assert_eq!(
            ActionSeverity::from_signal_fraction(0.25),
            ActionSeverity::Advisory
        );
        assert_eq!(
            ActionSeverity::from_signal_fraction(0.5),
            ActionSeverity::Urgent
        );
        assert_eq!(
            ActionSeverity::from_signal_fraction(0.8),
            ActionSeverity::Critical
        );
        assert_eq!(
            ActionSeverity::from_signal_fraction(1.0),
            ActionSeverity::Critical
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ActionSeverity::Info < ActionSeverity::Advisory);
        assert!(ActionSeverity::Advisory < ActionSeverity::Urgent);
        assert!(ActionSeverity::Urgent < ActionSeverity::Critical);
    }

    #[test]
    fn test_direction_table_lookup() {
        let table = DirectionTable::new().with_metric(
            "coverage",
            ActionCategory::RecruitBackup,
            ActionCategory::ReduceScope,
        );

        assert_eq!(
            table.category_for("coverage", 0.1),
            ActionCategory::RecruitBackup
        );
        assert_eq!(
            table.category_for("coverage", -0.1),
            ActionCategory::ReduceScope
        );
        // Unknown metric degrades to alert-only.
        assert_eq!(table.category_for("unknown", 0.1), ActionCategory::AlertOnly);
    }

    #[test]
    fn test_level_severity_mapping() {
        assert_eq!(
            ActionSeverity::from_level(EscalationLevel::Watch),
            ActionSeverity::Advisory
        );
        assert_eq!(
            ActionSeverity::from_level(EscalationLevel::Emergency),
            ActionSeverity::Critical
        );
    }
}
