#![deny(unreachable_pub)]

//! Adaptive control core for a workforce-scheduling platform.
//!
//! Per monitored zone: a bank of discrete-time PID controllers tracks
//! staffing metrics against their setpoints, a weighted risk score drives a
//! debounced hysteresis escalation engine, a gain scheduler maps the
//! committed level to smoothed optimizer weights, and the coordinator
//! merges everything into an ordered list of corrective actions.
//!
//! All computation is synchronous and deterministic; time enters only as a
//! caller-supplied epoch-milliseconds timestamp per cycle.

// Core modules
mod controller;
mod errors;
mod escalation;
mod gain;

// Feature modules
mod coordinator;
mod zone;

#[cfg(test)]
mod tests;

// Re-exports
pub use controller::{
    BankCycle, ControllerBank, ControllerConfig, ControllerResult, CycleWarning, PidController,
    PidGains, MIN_DT_SECS, SETPOINT_EPSILON,
};
pub use coordinator::{
    ActionCategory, ActionSeverity, ActionSource, CoordinatorConfig, CorrectiveAction,
    CycleOutput, DirectionTable, RiskModel, RiskWeights, ZoneCoordinator, ADVISORY_FRACTION,
    CRITICAL_FRACTION, RISK_SCALE, URGENT_FRACTION,
};
pub use errors::{ConfigError, MeasurementError, OverrideError};
pub use escalation::{
    EscalationConfig, EscalationDecision, EscalationEngine, EscalationLevel, ManualOverride,
    OverrideKind, TransitionReason, TransitionRecord,
};
pub use gain::{GainSchedule, GainScheduler, WeightVector};
pub use zone::ZoneHandle;
