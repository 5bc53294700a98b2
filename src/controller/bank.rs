//! Named collection of controllers, one per tracked metric.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use super::config::{ControllerConfig, PidGains};
use super::pid::{ControllerResult, PidController};
use crate::errors::{ConfigError, MeasurementError};

/// A degraded-input warning surfaced by a bank cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleWarning {
    /// Metric whose measurement was rejected
    pub metric: String,
    /// Human-readable rejection reason
    pub reason: String,
}

impl CycleWarning {
    fn from_error(metric: &str, error: &MeasurementError) -> Self {
        Self {
            metric: metric.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Output of one bank update: per-metric results plus degraded-input warnings.
///
/// A rejected or missing measurement never aborts the cycle; the affected
/// controller contributes a predict-only result instead.
#[derive(Debug, Clone, Serialize)]
pub struct BankCycle {
    /// Per-metric results, keyed by controller name
    pub results: BTreeMap<String, ControllerResult>,
    /// Warnings for metrics whose measurements were rejected
    pub warnings: Vec<CycleWarning>,
}

impl BankCycle {
    /// Number of results produced from fresh measurements.
    pub fn measured_count(&self) -> usize {
        self.results.values().filter(|r| !r.predicted).count()
    }

    /// Any controller ran predict-only this cycle?
    pub fn degraded(&self) -> bool {
        !self.warnings.is_empty() || self.results.values().any(|r| r.predicted)
    }
}

/// Named collection of [`PidController`]s; routes updates by metric name.
#[derive(Debug, Clone, Default)]
pub struct ControllerBank {
    controllers: BTreeMap<String, PidController>,
}

impl ControllerBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller for its configured metric name.
    pub fn register(&mut self, config: ControllerConfig) -> Result<(), ConfigError> {
        if self.controllers.contains_key(&config.name) {
            return Err(ConfigError::DuplicateController {
                name: config.name.clone(),
            });
        }
        let name = config.name.clone();
        let controller = PidController::new(config)?;
        debug!(controller = %name, "controller registered");
        self.controllers.insert(name, controller);
        Ok(())
    }

    /// Run one update cycle against a batch of fresh measurements.
    ///
    /// Metrics with no fresh measurement get a predict-only result; invalid
    /// measurements are skipped (predict-only) with a warning. Errors in one
    /// metric never abort evaluation of the others.
    pub fn update_all(
        &mut self,
        measurements: &HashMap<String, f64>,
        now_ms: u64,
    ) -> BankCycle {
        let mut results = BTreeMap::new();
        let mut warnings = Vec::new();

        for (name, controller) in &mut self.controllers {
            let result = match measurements.get(name) {
                Some(&value) => match controller.update(value, now_ms) {
                    Ok(result) => result,
                    Err(error) => {
                        warn!(
                            controller = %name,
                            %error,
                            "measurement rejected, falling back to predict-only"
                        );
                        warnings.push(CycleWarning::from_error(name, &error));
                        controller.predict(now_ms)
                    }
                },
                None => controller.predict(now_ms),
            };
            results.insert(name.clone(), result);
        }

        BankCycle { results, warnings }
    }

    /// Change the setpoint of a named controller.
    pub fn set_setpoint(&mut self, name: &str, setpoint: f64) -> Result<(), ConfigError> {
        self.get_mut(name)?.set_setpoint(setpoint);
        Ok(())
    }

    /// Replace the gains of a named controller.
    pub fn retune(&mut self, name: &str, gains: PidGains) -> Result<(), ConfigError> {
        self.get_mut(name)?.retune(gains)
    }

    /// Reset a named controller to its initial zero state.
    pub fn reset(&mut self, name: &str) -> Result<(), ConfigError> {
        self.get_mut(name)?.reset();
        Ok(())
    }

    /// Reset every controller in the bank.
    pub fn reset_all(&mut self) {
        for controller in self.controllers.values_mut() {
            controller.reset();
        }
    }

    /// Look up a controller by name.
    pub fn get(&self, name: &str) -> Option<&PidController> {
        self.controllers.get(name)
    }

    /// Registered metric names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    /// Number of registered controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// No controllers registered?
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut PidController, ConfigError> {
        self.controllers
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownController {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_metric_bank() -> ControllerBank {
        let mut bank = ControllerBank::new();
        bank.register(
            ControllerConfig::new("coverage")
                .with_setpoint(0.95)
                .with_gains(2.0, 0.1, 0.0),
        )
        .unwrap();
        bank.register(
            ControllerConfig::new("utilization")
                .with_setpoint(0.80)
                .with_gains(1.0, 0.0, 0.0),
        )
        .unwrap();
        bank
    }

    #[test]
    fn test_register_and_route_by_name() {
        let mut bank = two_metric_bank();
        let measurements =
            HashMap::from([("coverage".to_string(), 0.90), ("utilization".to_string(), 0.85)]);

        let cycle = bank.update_all(&measurements, 1_000);

        assert_eq!(cycle.results.len(), 2);
        assert_eq!(cycle.measured_count(), 2);
        assert!(!cycle.degraded());
        assert!((cycle.results["coverage"].error - 0.05).abs() < 1e-12);
        assert!((cycle.results["utilization"].error - (-0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut bank = two_metric_bank();
        assert!(matches!(
            bank.register(ControllerConfig::new("coverage")),
            Err(ConfigError::DuplicateController { .. })
        ));
    }

    #[test]
    fn test_missing_metric_runs_predict_only() {
        let mut bank = two_metric_bank();
        bank.update_all(
            &HashMap::from([
                ("coverage".to_string(), 0.90),
                ("utilization".to_string(), 0.85),
            ]),
            1_000,
        );

        // Second cycle only has coverage.
        let cycle = bank.update_all(&HashMap::from([("coverage".to_string(), 0.92)]), 2_000);

        assert!(cycle.results["utilization"].predicted);
        assert!(!cycle.results["coverage"].predicted);
        assert!(cycle.warnings.is_empty());
        assert!(cycle.degraded());
    }

    #[test]
    fn test_invalid_measurement_warns_and_continues() {
        let mut bank = two_metric_bank();
        let cycle = bank.update_all(
            &HashMap::from([
                ("coverage".to_string(), f64::NAN),
                ("utilization".to_string(), 0.85),
            ]),
            1_000,
        );

        // The bad metric is predict-only, the good one still updated.
        assert!(cycle.results["coverage"].predicted);
        assert!(!cycle.results["utilization"].predicted);
        assert_eq!(cycle.warnings.len(), 1);
        assert_eq!(cycle.warnings[0].metric, "coverage");
    }

    #[test]
    fn test_setpoint_and_retune_routing() {
        let mut bank = two_metric_bank();
        bank.set_setpoint("coverage", 0.90).unwrap();
        bank.retune("coverage", PidGains::new(5.0, 0.2, 0.0)).unwrap();

        assert_eq!(bank.get("coverage").unwrap().config().setpoint, 0.90);
        assert_eq!(bank.get("coverage").unwrap().config().gains.kp, 5.0);

        assert!(matches!(
            bank.set_setpoint("nope", 1.0),
            Err(ConfigError::UnknownController { .. })
        ));
    }

    #[test]
    fn test_reset_all() {
        let mut bank = two_metric_bank();
        bank.update_all(&HashMap::from([("coverage".to_string(), 0.50)]), 1_000);
        assert!(bank.get("coverage").unwrap().integral() != 0.0);

        bank.reset_all();
        assert_eq!(bank.get("coverage").unwrap().integral(), 0.0);
    }
}
