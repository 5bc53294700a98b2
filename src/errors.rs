use thiserror::Error;

use crate::escalation::OverrideKind;

/// Configuration errors, raised only at construction or retune time.
///
/// A failed construction never corrupts already-running state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Output bounds with min > max
    #[error("inverted output bounds for '{name}': min {min} > max {max}")]
    InvertedOutputBounds { name: String, min: f64, max: f64 },

    /// Integral bounds with min > max
    #[error("inverted integral bounds for '{name}': min {min} > max {max}")]
    InvertedIntegralBounds { name: String, min: f64, max: f64 },

    /// Declared measurement range with min > max
    #[error("inverted measurement range for '{name}': min {min} > max {max}")]
    InvertedMeasurementRange { name: String, min: f64, max: f64 },

    /// A tuning value is NaN or infinite
    #[error("non-finite value in configuration for '{name}'")]
    NonFiniteConfig { name: String },

    /// Escalation band boundaries must be non-decreasing
    #[error("band boundaries must be non-decreasing: {boundaries:?}")]
    NonMonotonicBands { boundaries: Vec<f64> },

    /// Debounce confirmation counts must be at least 1
    #[error("debounce counts must be at least 1 (escalate={escalate}, deescalate={deescalate})")]
    InvalidDebounce { escalate: u32, deescalate: u32 },

    /// De-escalation buffer fraction outside [0, 1)
    #[error("de-escalation buffer fraction {0} outside [0, 1)")]
    InvalidBuffer(f64),

    /// EMA smoothing factor outside (0, 1]
    #[error("smoothing factor {0} outside (0, 1]")]
    InvalidSmoothing(f64),

    /// Weight table missing an entry for a level
    #[error("weight table missing an entry for level {level}")]
    MissingLevelWeights { level: String },

    /// Named controller does not exist in the bank
    #[error("no controller registered under '{name}'")]
    UnknownController { name: String },

    /// A controller with the same name is already registered
    #[error("controller '{name}' is already registered")]
    DuplicateController { name: String },
}

/// Per-cycle measurement rejection.
///
/// Recovered locally: the affected controller falls back to a predict-only
/// update for the cycle and the coordinator surfaces a warning instead of
/// aborting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// NaN or infinite measurement
    #[error("non-finite measurement for '{metric}'")]
    NonFinite { metric: String },

    /// Finite measurement outside the controller's declared range
    #[error("measurement {value} for '{metric}' outside declared range [{min}, {max}]")]
    OutOfRange {
        metric: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Override submission rejection. No state change on rejection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverrideError {
    /// Force-level and lock-level overrides need a target
    #[error("override '{id}' of kind {kind:?} requires a target level")]
    MissingTarget { id: String, kind: OverrideKind },

    /// Expiry must be after creation
    #[error("override '{id}' expires at {expires_at_ms} which is not after creation {created_at_ms}")]
    ExpiryBeforeCreation {
        id: String,
        created_at_ms: u64,
        expires_at_ms: u64,
    },
}
