//! Per-zone orchestration of one control cycle.
//!
//! The coordinator exclusively owns one controller bank, one escalation
//! engine and one gain scheduler per monitored scheduling zone. Each cycle:
//!
//! ```text
//! measurements -> ControllerBank.update_all() -> per-loop results
//!              -> RiskModel.score()           -> risk score
//!              -> EscalationEngine.step()     -> committed level
//!              -> GainScheduler.weights_for() -> smoothed weights
//!              -> merge corrective actions    -> ordered recommendations
//! ```
//!
//! Zones never share mutable state; cross-zone aggregation is a read-only
//! reporting concern layered above this core.

mod actions;
mod risk;

pub use actions::{
    ActionCategory, ActionSeverity, ActionSource, CorrectiveAction, DirectionTable,
    ADVISORY_FRACTION, CRITICAL_FRACTION, URGENT_FRACTION,
};
pub use risk::{RiskModel, RiskWeights, RISK_SCALE};

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::controller::{ControllerBank, ControllerConfig, ControllerResult, CycleWarning, PidGains};
use crate::errors::{ConfigError, OverrideError};
use crate::escalation::{
    EscalationConfig, EscalationDecision, EscalationEngine, EscalationLevel, ManualOverride,
};
use crate::gain::{GainSchedule, GainScheduler, WeightVector};

/// Full configuration for one zone's coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Zone identifier (for logging and output records)
    pub zone: String,
    /// One controller per tracked metric
    pub controllers: Vec<ControllerConfig>,
    /// Escalation engine tuning
    pub escalation: EscalationConfig,
    /// Per-level weight table
    pub schedule: GainSchedule,
    /// EMA smoothing factor for emitted weights
    pub smoothing_alpha: f64,
    /// Risk formula component weights
    pub risk_weights: RiskWeights,
    /// Per-metric signal-sign to action-category table
    pub directions: DirectionTable,
}

impl CoordinatorConfig {
    /// Empty configuration for the named zone.
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            controllers: Vec::new(),
            escalation: EscalationConfig::default(),
            schedule: GainSchedule::default(),
            smoothing_alpha: GainScheduler::DEFAULT_ALPHA,
            risk_weights: RiskWeights::default(),
            directions: DirectionTable::new(),
        }
    }

    /// Ready-made profile tracking coverage, utilization and workload
    /// balance, the standard three loops of a scheduling zone. Domain
    /// variants are configuration on top of this, not separate code.
    pub fn workforce_defaults(zone: impl Into<String>) -> Self {
        let controllers = vec![
            ControllerConfig::new("coverage")
                .with_setpoint(0.95)
                .with_gains(8.0, 0.4, 0.5)
                .with_output_bounds(-0.25, 0.25)
                .with_integral_bounds(-2.0, 2.0)
                .with_measurement_range(0.0, 1.0)
                .with_unit("fraction"),
            ControllerConfig::new("utilization")
                .with_setpoint(0.80)
                .with_gains(5.0, 0.2, 0.0)
                .with_output_bounds(-0.2, 0.2)
                .with_integral_bounds(-2.0, 2.0)
                .with_measurement_range(0.0, 1.5)
                .with_unit("fraction"),
            ControllerConfig::new("workload_balance")
                .with_setpoint(0.90)
                .with_gains(4.0, 0.1, 0.0)
                .with_output_bounds(-0.2, 0.2)
                .with_integral_bounds(-2.0, 2.0)
                .with_measurement_range(0.0, 1.0)
                .with_unit("index"),
        ];

        let mut schedule = GainSchedule::new();
        for (i, level) in EscalationLevel::ALL.into_iter().enumerate() {
            let step = i as f64;
            schedule = schedule.with_level(
                level,
                [
                    ("coverage".to_string(), 1.0 + step * 0.25),
                    ("utilization".to_string(), 1.0 + step * 0.10),
                    ("workload_balance".to_string(), (1.0 - step * 0.10).max(0.5)),
                ],
            );
        }

        let directions = DirectionTable::new()
            .with_metric(
                "coverage",
                ActionCategory::RecruitBackup,
                ActionCategory::ReduceScope,
            )
            .with_metric(
                "utilization",
                ActionCategory::IncreaseResource,
                ActionCategory::DecreaseResource,
            )
            .with_metric(
                "workload_balance",
                ActionCategory::Redistribute,
                ActionCategory::AlertOnly,
            );

        Self {
            zone: zone.into(),
            controllers,
            escalation: EscalationConfig::default(),
            schedule,
            smoothing_alpha: GainScheduler::DEFAULT_ALPHA,
            risk_weights: RiskWeights::default(),
            directions,
        }
    }
}

/// Everything one cycle produced, returned synchronously to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutput {
    /// Zone this cycle belongs to
    pub zone: String,
    /// Caller-supplied cycle timestamp
    pub timestamp_ms: u64,
    /// Aggregate risk score fed to the escalation engine
    pub risk_score: f64,
    /// Committed level after this cycle
    pub level: EscalationLevel,
    /// Escalation engine diagnostics
    pub escalation: EscalationDecision,
    /// Smoothed weight vector for the downstream optimizer
    pub weights: WeightVector,
    /// Merged recommendations, ordered by descending severity then recency
    pub actions: Vec<CorrectiveAction>,
    /// Per-metric controller results
    pub results: BTreeMap<String, ControllerResult>,
    /// Degraded-input warnings (cycle still completed)
    pub warnings: Vec<CycleWarning>,
}

impl CycleOutput {
    /// Did any input degrade this cycle?
    pub fn degraded(&self) -> bool {
        !self.warnings.is_empty() || self.results.values().any(|r| r.predicted)
    }
}

/// Orchestrates one scheduling zone's control loop.
pub struct ZoneCoordinator {
    zone: String,
    bank: ControllerBank,
    engine: EscalationEngine,
    scheduler: GainScheduler,
    risk_model: RiskModel,
    directions: DirectionTable,
}

impl ZoneCoordinator {
    /// Build a coordinator, validating every sub-configuration. A failed
    /// construction has no side effects.
    pub fn new(config: CoordinatorConfig) -> Result<Self, ConfigError> {
        let mut bank = ControllerBank::new();
        for controller in config.controllers {
            bank.register(controller)?;
        }
        let engine = EscalationEngine::new(config.escalation)?;
        let scheduler = GainScheduler::new(config.schedule, config.smoothing_alpha)?;
        Ok(Self {
            zone: config.zone,
            bank,
            engine,
            scheduler,
            risk_model: RiskModel::new(config.risk_weights),
            directions: config.directions,
        })
    }

    /// Zone identifier.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Current committed escalation level.
    pub fn level(&self) -> EscalationLevel {
        self.engine.level()
    }

    /// The controller bank (read-only).
    pub fn bank(&self) -> &ControllerBank {
        &self.bank
    }

    /// The escalation engine (read-only, for history/audit access).
    pub fn engine(&self) -> &EscalationEngine {
        &self.engine
    }

    /// Process one measurement batch to completion.
    pub fn run_cycle(
        &mut self,
        measurements: &HashMap<String, f64>,
        now_ms: u64,
    ) -> CycleOutput {
        let cycle = self.bank.update_all(measurements, now_ms);
        for warning in &cycle.warnings {
            warn!(
                zone = %self.zone,
                metric = %warning.metric,
                reason = %warning.reason,
                "cycle proceeding with degraded input"
            );
        }

        let risk_score = self.risk_model.score(cycle.results.values());
        let decision = self.engine.step(risk_score, now_ms);
        let weights = self.scheduler.weights_for(decision.level);

        let mut actions: Vec<CorrectiveAction> = cycle
            .results
            .values()
            .map(|result| CorrectiveAction::from_controller(result, &self.directions, now_ms))
            .collect();
        if let Some(transition) = &decision.transition {
            actions.push(CorrectiveAction::from_transition(
                transition.from,
                transition.to,
                risk_score,
                now_ms,
            ));
        }
        // Descending severity; ties broken by recency (later-produced first).
        let mut indexed: Vec<(usize, CorrectiveAction)> = actions.into_iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.timestamp_ms.cmp(&a.timestamp_ms))
                .then_with(|| ib.cmp(ia))
        });
        let actions: Vec<CorrectiveAction> = indexed.into_iter().map(|(_, a)| a).collect();

        debug!(
            zone = %self.zone,
            risk = risk_score,
            level = %decision.level,
            actions = actions.len(),
            "cycle complete"
        );

        CycleOutput {
            zone: self.zone.clone(),
            timestamp_ms: now_ms,
            risk_score,
            level: decision.level,
            escalation: decision,
            weights,
            actions,
            results: cycle.results,
            warnings: cycle.warnings,
        }
    }

    /// Submit an administrative override; applies from the next cycle.
    pub fn submit_override(&mut self, ov: ManualOverride) -> Result<(), OverrideError> {
        self.engine.submit_override(ov)
    }

    /// Clear the active override, returning it for the caller's audit log.
    pub fn clear_override(&mut self) -> Option<ManualOverride> {
        self.engine.clear_override()
    }

    /// Change a controller's setpoint (resets its windup when the change
    /// exceeds epsilon).
    pub fn set_setpoint(&mut self, metric: &str, setpoint: f64) -> Result<(), ConfigError> {
        self.bank.set_setpoint(metric, setpoint)
    }

    /// Replace one controller's gains.
    pub fn retune_controller(&mut self, metric: &str, gains: PidGains) -> Result<(), ConfigError> {
        self.bank.retune(metric, gains)
    }

    /// Replace the weight table; resets the smoothing memory.
    pub fn retune_schedule(&mut self, schedule: GainSchedule) -> Result<(), ConfigError> {
        self.scheduler.retune(schedule)
    }
}
