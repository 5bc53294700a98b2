//! Discrete-time PID controllers with anti-windup.
//!
//! One [`PidController`] tracks one process variable against one setpoint.
//! The [`ControllerBank`] routes per-metric measurements to its registered
//! controllers and degrades gracefully: metrics with no fresh measurement
//! get a predict-only update, invalid measurements are surfaced as warnings
//! rather than aborting the cycle.
//!
//! Anti-windup is by integral clamping. The loop always produces a clamped
//! signal; numeric edge cases never propagate a fault.

mod bank;
mod config;
mod pid;

pub use bank::{BankCycle, ControllerBank, CycleWarning};
pub use config::{ControllerConfig, PidGains};
pub use pid::{ControllerResult, PidController, MIN_DT_SECS, SETPOINT_EPSILON};
