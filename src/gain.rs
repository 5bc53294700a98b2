//! Gain scheduling: escalation level to weight multipliers.
//!
//! The lookup table is static configuration; the scheduler blends each
//! lookup with the previously emitted vector via exponential smoothing so
//! the downstream optimizer never sees a stepwise shock even though the
//! level itself moves in discrete steps. The smoothing memory is an owned
//! field, so independent zones cannot interfere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::escalation::EscalationLevel;

/// Scalar multipliers keyed by metric name.
pub type WeightVector = BTreeMap<String, f64>;

/// Per-level weight table. Every level must have an entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GainSchedule {
    table: BTreeMap<EscalationLevel, WeightVector>,
}

impl GainSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method setting the weights for one level.
    pub fn with_level<I, S>(mut self, level: EscalationLevel, weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.table.insert(
            level,
            weights.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        );
        self
    }

    /// Weights for a level, if present.
    pub fn get(&self, level: EscalationLevel) -> Option<&WeightVector> {
        self.table.get(&level)
    }

    /// Validate that every level has an entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for level in EscalationLevel::ALL {
            if !self.table.contains_key(&level) {
                return Err(ConfigError::MissingLevelWeights {
                    level: level.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Maps the current level to a smoothed weight vector.
#[derive(Debug, Clone)]
pub struct GainScheduler {
    schedule: GainSchedule,
    alpha: f64,
    /// Previously emitted vector; owned here, never global
    previous: Option<WeightVector>,
}

impl GainScheduler {
    /// Default smoothing factor.
    pub const DEFAULT_ALPHA: f64 = 0.3;

    /// Create a scheduler over a validated schedule.
    pub fn new(schedule: GainSchedule, alpha: f64) -> Result<Self, ConfigError> {
        schedule.validate()?;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::InvalidSmoothing(alpha));
        }
        Ok(Self {
            schedule,
            alpha,
            previous: None,
        })
    }

    /// The smoothing factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The active schedule.
    pub fn schedule(&self) -> &GainSchedule {
        &self.schedule
    }

    /// Emit the weight vector for a level.
    ///
    /// `emitted = alpha * lookup + (1 - alpha) * previous_emitted`; the
    /// first call after construction or retune returns the raw lookup.
    pub fn weights_for(&mut self, level: EscalationLevel) -> WeightVector {
        // validate() guarantees an entry per level.
        let lookup = self
            .schedule
            .get(level)
            .cloned()
            .unwrap_or_default();

        let emitted = match &self.previous {
            Some(previous) => {
                let mut blended = WeightVector::new();
                for (metric, &target) in &lookup {
                    let prior = previous.get(metric).copied().unwrap_or(target);
                    blended.insert(
                        metric.clone(),
                        self.alpha * target + (1.0 - self.alpha) * prior,
                    );
                }
                blended
            }
            None => lookup,
        };

        debug!(level = %level, weights = ?emitted, "gain schedule emitted");
        self.previous = Some(emitted.clone());
        emitted
    }

    /// Replace the table and reset the smoothing memory: the next emission
    /// is the fresh lookup with no blending across the retune.
    pub fn retune(&mut self, schedule: GainSchedule) -> Result<(), ConfigError> {
        schedule.validate()?;
        self.schedule = schedule;
        self.previous = None;
        Ok(())
    }
}
