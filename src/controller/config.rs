//! Immutable tuning records for PID controllers.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Proportional / integral / derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

impl PidGains {
    /// Create gains from the three constants.
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// All three gains finite?
    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

/// Immutable tuning record for one controller.
///
/// Output bounds and integral bounds are each closed intervals with
/// min <= max; inverted bounds are rejected at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Metric name this controller tracks (e.g. "coverage")
    pub name: String,
    /// Target value the loop drives toward
    pub setpoint: f64,
    /// PID gains
    pub gains: PidGains,
    /// Lower output bound
    pub output_min: f64,
    /// Upper output bound
    pub output_max: f64,
    /// Lower integral bound (anti-windup clamp)
    pub integral_min: f64,
    /// Upper integral bound (anti-windup clamp)
    pub integral_max: f64,
    /// Optional declared measurement range; finite values outside it are
    /// rejected for the cycle
    pub measurement_range: Option<(f64, f64)>,
    /// Unit label for diagnostics (e.g. "fraction", "shifts")
    pub unit: String,
    /// Capacity of the (timestamp, error) and (timestamp, signal) rings
    pub history_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            setpoint: 0.0,
            gains: PidGains::default(),
            output_min: -1.0,
            output_max: 1.0,
            integral_min: -10.0,
            integral_max: 10.0,
            measurement_range: None,
            unit: String::new(),
            history_capacity: 64,
        }
    }
}

impl ControllerConfig {
    /// Create a config for the named metric with default tuning.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder method for the setpoint.
    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = setpoint;
        self
    }

    /// Builder method for the gains.
    pub fn with_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.gains = PidGains::new(kp, ki, kd);
        self
    }

    /// Builder method for the output bounds.
    pub fn with_output_bounds(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    /// Builder method for the integral bounds.
    pub fn with_integral_bounds(mut self, min: f64, max: f64) -> Self {
        self.integral_min = min;
        self.integral_max = max;
        self
    }

    /// Builder method for the declared measurement range.
    pub fn with_measurement_range(mut self, min: f64, max: f64) -> Self {
        self.measurement_range = Some((min, max));
        self
    }

    /// Builder method for the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Builder method for the history ring capacity.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// Largest absolute output bound, used to normalize signal magnitude.
    pub fn output_span(&self) -> f64 {
        self.output_min.abs().max(self.output_max.abs())
    }

    /// Validate the tuning record.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.setpoint.is_finite()
            && self.gains.is_finite()
            && self.output_min.is_finite()
            && self.output_max.is_finite()
            && self.integral_min.is_finite()
            && self.integral_max.is_finite();
        if !finite {
            return Err(ConfigError::NonFiniteConfig {
                name: self.name.clone(),
            });
        }
        if self.output_min > self.output_max {
            return Err(ConfigError::InvertedOutputBounds {
                name: self.name.clone(),
                min: self.output_min,
                max: self.output_max,
            });
        }
        if self.integral_min > self.integral_max {
            return Err(ConfigError::InvertedIntegralBounds {
                name: self.name.clone(),
                min: self.integral_min,
                max: self.integral_max,
            });
        }
        if let Some((min, max)) = self.measurement_range {
            if !min.is_finite() || !max.is_finite() {
                return Err(ConfigError::NonFiniteConfig {
                    name: self.name.clone(),
                });
            }
            if min > max {
                return Err(ConfigError::InvertedMeasurementRange {
                    name: self.name.clone(),
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = ControllerConfig::new("coverage")
            .with_setpoint(0.95)
            .with_gains(8.0, 0.4, 0.5)
            .with_output_bounds(-0.25, 0.25)
            .with_integral_bounds(-2.0, 2.0)
            .with_measurement_range(0.0, 1.0)
            .with_unit("fraction");

        assert_eq!(config.name, "coverage");
        assert_eq!(config.gains.kp, 8.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_output_bounds_rejected() {
        let config = ControllerConfig::new("x").with_output_bounds(1.0, -1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedOutputBounds { .. })
        ));
    }

    #[test]
    fn test_inverted_integral_bounds_rejected() {
        let config = ControllerConfig::new("x").with_integral_bounds(5.0, -5.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedIntegralBounds { .. })
        ));
    }

    #[test]
    fn test_non_finite_setpoint_rejected() {
        let config = ControllerConfig::new("x").with_setpoint(f64::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteConfig { .. })
        ));
    }

    #[test]
    fn test_inverted_measurement_range_rejected() {
        let config = ControllerConfig::new("x").with_measurement_range(1.0, 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedMeasurementRange { .. })
        ));
    }

    #[test]
    fn test_output_span() {
        let config = ControllerConfig::new("x").with_output_bounds(-0.5, 0.2);
        assert!((config.output_span() - 0.5).abs() < f64::EPSILON);
    }
}
