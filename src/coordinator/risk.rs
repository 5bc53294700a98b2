//! Aggregate risk score derivation.
//!
//! A fixed weighted formula over the cycle's controller results: normalized
//! setpoint deviation, oscillation indicator, and proximity-to-bound. The
//! deviation component reads the windup-free fraction, so stale integral
//! draining after a crisis cannot hold the score up once measurements are
//! back on target. The weights are configuration, not structure; the output
//! lands in the 0-100 domain of the escalation band table.

use serde::{Deserialize, Serialize};

use crate::controller::ControllerResult;

/// Risk score range ceiling.
pub const RISK_SCALE: f64 = 100.0;

/// Relative weights of the risk components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskWeights {
    /// Weight of the normalized setpoint-deviation component
    pub deviation: f64,
    /// Weight of the error-sign-flip indicator
    pub oscillation: f64,
    /// Weight of the saturation (proximity-to-bound) indicator
    pub saturation: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            deviation: 0.6,
            oscillation: 0.2,
            saturation: 0.2,
        }
    }
}

impl RiskWeights {
    fn total(&self) -> f64 {
        self.deviation + self.oscillation + self.saturation
    }
}

/// Derives one scalar risk score from a batch of controller results.
#[derive(Debug, Clone, Default)]
pub struct RiskModel {
    weights: RiskWeights,
}

impl RiskModel {
    /// Create a model with the given component weights.
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    /// The component weights.
    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Score a cycle's results into [0, RISK_SCALE].
    ///
    /// An empty batch scores zero: no evidence is treated as no risk, the
    /// degraded-input warnings carry the signal instead.
    pub fn score<'a, I>(&self, results: I) -> f64
    where
        I: IntoIterator<Item = &'a ControllerResult>,
    {
        let total_weight = self.weights.total();
        if total_weight <= 0.0 {
            return 0.0;
        }

        let mut accumulated = 0.0;
        let mut count = 0usize;
        for result in results {
            let deviation = result.deviation_fraction;
            let oscillation = if result.sign_flipped { 1.0 } else { 0.0 };
            let saturation = if result.output_saturated || result.integral_saturated {
                1.0
            } else {
                0.0
            };
            accumulated += self.weights.deviation * deviation
                + self.weights.oscillation * oscillation
                + self.weights.saturation * saturation;
            count += 1;
        }

        if count == 0 {
            return 0.0;
        }

        (RISK_SCALE * accumulated / (total_weight * count as f64)).clamp(0.0, RISK_SCALE)
    }
}
