//! Single discrete-time PID loop with anti-windup by integral clamping.
//!
//! ```text
//! error  = setpoint - measurement
//! P      = Kp * error
//! I      = Ki * clamp(integral + error*dt, integral bounds)
//! D      = Kd * (error - prev_error) / dt        (0 on the first sample)
//! signal = clamp(P + I + D, output bounds)
//! ```
//!
//! On the very first call, or when the caller's clock is non-monotonic,
//! dt is substituted with [`MIN_DT_SECS`] and the derivative term is forced
//! to zero for that call only.
//!
//! While the error reads zero the integral bleeds toward zero instead of
//! integrating. Clamping alone would deadlock after a long saturation:
//! `integral += 0` holds the stored windup at its bound and the I term
//! keeps the output pinned even with the process back on target.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use super::config::{ControllerConfig, PidGains};
use crate::errors::{ConfigError, MeasurementError};

/// Substitute dt (seconds) for the first call or a non-monotonic clock.
pub const MIN_DT_SECS: f64 = 0.001;

/// Setpoint changes beyond this reset the integral and history.
pub const SETPOINT_EPSILON: f64 = 1e-9;

/// Errors at or below this magnitude count as zero for integration.
const ZERO_ERROR_EPSILON: f64 = 1e-9;

/// Per-update decay applied to the integral while the error is zero.
const INTEGRAL_LEAK: f64 = 0.5;

/// Result of one controller update step.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerResult {
    /// Metric name this result belongs to
    pub name: String,
    /// setpoint - measurement (held from the prior sample when predicted)
    pub error: f64,
    /// Proportional term
    pub proportional: f64,
    /// Integral term (Ki * clamped integral)
    pub integral_term: f64,
    /// Derivative term
    pub derivative: f64,
    /// Unclamped P + I + D
    pub raw_output: f64,
    /// Output after clamping to the configured bounds
    pub control_signal: f64,
    /// |control_signal| as a fraction of the largest output bound
    pub signal_fraction: f64,
    /// |proportional| as a fraction of the largest output bound, capped at
    /// 1. Tracks the current setpoint miss only; accumulated windup never
    /// shows up here.
    pub deviation_fraction: f64,
    /// Integral sits at either bound
    pub integral_saturated: bool,
    /// Raw output was clamped
    pub output_saturated: bool,
    /// Error sign flipped relative to the prior sample
    pub sign_flipped: bool,
    /// No fresh measurement this cycle; terms carry no correction
    pub predicted: bool,
    /// Elapsed time used for the integral/derivative, in seconds
    pub dt_secs: f64,
    /// Caller-supplied timestamp of this step
    pub timestamp_ms: u64,
}

/// Mutable state exclusively owned by one controller.
#[derive(Debug, Clone)]
struct ControllerState {
    integral: f64,
    prev_error: Option<f64>,
    prev_time_ms: Option<u64>,
    error_history: VecDeque<(u64, f64)>,
    signal_history: VecDeque<(u64, f64)>,
    saturation_count: u64,
    oscillation_count: u64,
}

impl ControllerState {
    fn new(capacity: usize) -> Self {
        Self {
            integral: 0.0,
            prev_error: None,
            prev_time_ms: None,
            error_history: VecDeque::with_capacity(capacity),
            signal_history: VecDeque::with_capacity(capacity),
            saturation_count: 0,
            oscillation_count: 0,
        }
    }
}

/// One discrete-time PID loop tracking one process variable.
#[derive(Debug, Clone)]
pub struct PidController {
    config: ControllerConfig,
    state: ControllerState,
}

impl PidController {
    /// Create a controller, validating the tuning record.
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.history_capacity.max(1);
        Ok(Self {
            config,
            state: ControllerState::new(capacity),
        })
    }

    /// The tuning record.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current accumulated (clamped) integral.
    pub fn integral(&self) -> f64 {
        self.state.integral
    }

    /// Times the raw output was clamped.
    pub fn saturation_count(&self) -> u64 {
        self.state.saturation_count
    }

    /// Times the error sign reversed between consecutive samples.
    pub fn oscillation_count(&self) -> u64 {
        self.state.oscillation_count
    }

    /// Bounded (timestamp, error) history, oldest first.
    pub fn error_history(&self) -> impl Iterator<Item = &(u64, f64)> {
        self.state.error_history.iter()
    }

    /// Bounded (timestamp, control signal) history, oldest first.
    pub fn signal_history(&self) -> impl Iterator<Item = &(u64, f64)> {
        self.state.signal_history.iter()
    }

    /// Run one update step against a fresh measurement.
    ///
    /// Non-finite or out-of-declared-range input is rejected with state
    /// unchanged. All other numeric edge cases degrade to a clamped,
    /// well-defined output.
    pub fn update(
        &mut self,
        value: f64,
        now_ms: u64,
    ) -> Result<ControllerResult, MeasurementError> {
        if !value.is_finite() {
            return Err(MeasurementError::NonFinite {
                metric: self.config.name.clone(),
            });
        }
        if let Some((min, max)) = self.config.measurement_range {
            if value < min || value > max {
                return Err(MeasurementError::OutOfRange {
                    metric: self.config.name.clone(),
                    value,
                    min,
                    max,
                });
            }
        }

        let (dt, clock_ok) = match self.state.prev_time_ms {
            Some(prev) if now_ms > prev => ((now_ms - prev) as f64 / 1000.0, true),
            // First call or non-monotonic clock: fixed minimum dt, no derivative.
            _ => (MIN_DT_SECS, false),
        };

        let error = self.config.setpoint - value;
        let gains = self.config.gains;

        let proportional = gains.kp * error;

        if error.abs() <= ZERO_ERROR_EPSILON {
            // Nothing left for the accumulated integral to cancel; bleed it
            // instead of holding stale windup against the output clamp.
            self.state.integral *= INTEGRAL_LEAK;
        } else {
            self.state.integral = (self.state.integral + error * dt)
                .clamp(self.config.integral_min, self.config.integral_max);
        }
        let integral_saturated = self.at_integral_bound();
        let integral_term = gains.ki * self.state.integral;

        let derivative = match self.state.prev_error {
            Some(prev) if clock_ok => gains.kd * (error - prev) / dt,
            _ => 0.0,
        };

        let raw_output = proportional + integral_term + derivative;
        let control_signal = raw_output.clamp(self.config.output_min, self.config.output_max);
        let output_saturated = raw_output != control_signal;

        let sign_flipped = self
            .state
            .prev_error
            .is_some_and(|prev| prev * error < 0.0);
        if sign_flipped {
            self.state.oscillation_count += 1;
        }
        if output_saturated {
            self.state.saturation_count += 1;
        }

        self.push_history(now_ms, error, control_signal);
        self.state.prev_error = Some(error);
        self.state.prev_time_ms = Some(now_ms);

        debug!(
            controller = %self.config.name,
            error,
            signal = control_signal,
            saturated = output_saturated,
            "controller updated"
        );

        Ok(ControllerResult {
            name: self.config.name.clone(),
            error,
            proportional,
            integral_term,
            derivative,
            raw_output,
            control_signal,
            signal_fraction: self.fraction_of_span(control_signal),
            deviation_fraction: self.fraction_of_span(proportional),
            integral_saturated,
            output_saturated,
            sign_flipped,
            predicted: false,
            dt_secs: dt,
            timestamp_ms: now_ms,
        })
    }

    /// Predict-only step for a cycle with no fresh measurement.
    ///
    /// Holds the last error, applies no integral accumulation and no
    /// derivative, and flags the result instead of raising an error.
    /// State is not mutated.
    pub fn predict(&self, now_ms: u64) -> ControllerResult {
        let error = self.state.prev_error.unwrap_or(0.0);
        let gains = self.config.gains;
        let proportional = gains.kp * error;
        let integral_term = gains.ki * self.state.integral;
        let raw_output = proportional + integral_term;
        let control_signal = raw_output.clamp(self.config.output_min, self.config.output_max);

        ControllerResult {
            name: self.config.name.clone(),
            error,
            proportional,
            integral_term,
            derivative: 0.0,
            raw_output,
            control_signal,
            signal_fraction: self.fraction_of_span(control_signal),
            deviation_fraction: self.fraction_of_span(proportional),
            integral_saturated: self.at_integral_bound(),
            output_saturated: raw_output != control_signal,
            sign_flipped: false,
            predicted: true,
            dt_secs: 0.0,
            timestamp_ms: now_ms,
        }
    }

    /// Change the setpoint.
    ///
    /// A change beyond [`SETPOINT_EPSILON`] resets the integral and history:
    /// stale windup carried into a new target causes a guaranteed transient
    /// overshoot proportional to the old accumulated integral.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        if (setpoint - self.config.setpoint).abs() > SETPOINT_EPSILON {
            debug!(
                controller = %self.config.name,
                from = self.config.setpoint,
                to = setpoint,
                "setpoint changed, clearing integral and history"
            );
            self.state.integral = 0.0;
            self.state.error_history.clear();
            self.state.signal_history.clear();
        }
        self.config.setpoint = setpoint;
    }

    /// Replace the gains without touching accumulated state.
    pub fn retune(&mut self, gains: PidGains) -> Result<(), ConfigError> {
        if !gains.is_finite() {
            return Err(ConfigError::NonFiniteConfig {
                name: self.config.name.clone(),
            });
        }
        self.config.gains = gains;
        Ok(())
    }

    /// Zero the integral, previous error, counters and history.
    /// Configuration is unchanged.
    pub fn reset(&mut self) {
        self.state = ControllerState::new(self.config.history_capacity.max(1));
    }

    fn at_integral_bound(&self) -> bool {
        (self.state.integral - self.config.integral_min).abs() <= f64::EPSILON
            || (self.state.integral - self.config.integral_max).abs() <= f64::EPSILON
    }

    fn fraction_of_span(&self, value: f64) -> f64 {
        let span = self.config.output_span();
        if span > 0.0 {
            (value.abs() / span).min(1.0)
        } else {
            0.0
        }
    }

    fn push_history(&mut self, now_ms: u64, error: f64, signal: f64) {
        let capacity = self.config.history_capacity.max(1);
        if self.state.error_history.len() == capacity {
            self.state.error_history.pop_front();
        }
        if self.state.signal_history.len() == capacity {
            self.state.signal_history.pop_front();
        }
        self.state.error_history.push_back((now_ms, error));
        self.state.signal_history.push_back((now_ms, signal));
    }
}
