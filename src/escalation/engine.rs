//! Debounced ordered hysteresis over the escalation levels.
//!
//! Escalation is deliberately asymmetric: moving up requires k1 consecutive
//! confirmations, moving down requires k2 (> k1 by default) confirmations
//! *and* a risk score strictly below the current band's lower edge reduced
//! by a buffer fraction. Scores inside the buffer band clear any pending
//! candidate: the engine holds rather than partially counting.
//!
//! The committed level changes only on a confirmed transition or an
//! unconditional override; this is what prevents flapping.
//!
//! Boundary comparisons are lower-inclusive everywhere: a score equal to a
//! band edge maps to the higher level.

use std::cmp::Ordering;
use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use super::level::EscalationLevel;
use super::manual::{ManualOverride, OverrideKind};
use crate::errors::{ConfigError, OverrideError};

/// Tuning for the escalation engine.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationConfig {
    /// Band boundaries between the five levels, non-decreasing.
    /// A score >= boundaries[i] maps at least to level i+1.
    pub boundaries: [f64; 4],
    /// Consecutive confirmations required to escalate (k1)
    pub escalate_confirmations: u32,
    /// Consecutive confirmations required to de-escalate (k2)
    pub deescalate_confirmations: u32,
    /// Fraction by which the band edge is lowered before a de-escalation
    /// sample counts (the buffer band)
    pub deescalation_buffer: f64,
    /// Capacity of the transition history ring
    pub history_capacity: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            boundaries: [20.0, 40.0, 60.0, 80.0],
            escalate_confirmations: 2,
            deescalate_confirmations: 3,
            deescalation_buffer: 0.10,
            history_capacity: 128,
        }
    }
}

impl EscalationConfig {
    /// Builder method for the band boundaries.
    pub fn with_boundaries(mut self, boundaries: [f64; 4]) -> Self {
        self.boundaries = boundaries;
        self
    }

    /// Builder method for the debounce counts.
    pub fn with_confirmations(mut self, escalate: u32, deescalate: u32) -> Self {
        self.escalate_confirmations = escalate;
        self.deescalate_confirmations = deescalate;
        self
    }

    /// Builder method for the de-escalation buffer fraction.
    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.deescalation_buffer = buffer;
        self
    }

    /// Validate the tuning record.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boundaries.iter().any(|b| !b.is_finite()) {
            return Err(ConfigError::NonMonotonicBands {
                boundaries: self.boundaries.to_vec(),
            });
        }
        if self.boundaries.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::NonMonotonicBands {
                boundaries: self.boundaries.to_vec(),
            });
        }
        if self.escalate_confirmations == 0 || self.deescalate_confirmations == 0 {
            return Err(ConfigError::InvalidDebounce {
                escalate: self.escalate_confirmations,
                deescalate: self.deescalate_confirmations,
            });
        }
        if !(0.0..1.0).contains(&self.deescalation_buffer) {
            return Err(ConfigError::InvalidBuffer(self.deescalation_buffer));
        }
        Ok(())
    }
}

/// Why a committed transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionReason {
    /// Debounced escalation
    Escalation,
    /// Debounced de-escalation
    Deescalation,
    /// Unconditional override application
    Override,
    /// Override expired with auto-restore; level re-derived from risk
    OverrideExpired,
}

/// One committed level transition, suitable for an external audit log.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    /// When the transition committed (epoch ms)
    pub timestamp_ms: u64,
    /// Level before
    pub from: EscalationLevel,
    /// Level after
    pub to: EscalationLevel,
    /// Risk score that triggered the commit
    pub risk_score: f64,
    /// Trigger classification
    pub reason: TransitionReason,
}

/// Output of one engine step.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationDecision {
    /// Committed level after this step
    pub level: EscalationLevel,
    /// Level the raw band mapping alone recommends
    pub recommended: EscalationLevel,
    /// Candidate under debounce evaluation, if any
    pub pending: Option<EscalationLevel>,
    /// Consecutive confirmations for the pending candidate
    pub consecutive: u32,
    /// Hysteresis is currently suppressing a move the raw mapping would make
    pub hysteresis_holding: bool,
    /// Transition committed by this step, if any
    pub transition: Option<TransitionRecord>,
    /// Identifier of the override consulted this step, if any
    pub override_id: Option<String>,
    /// Kind of the override consulted this step, if any
    pub override_kind: Option<OverrideKind>,
    /// At the top level with risk still in the top band; there is no
    /// escalation target above
    pub at_ceiling: bool,
    /// The risk score evaluated
    pub risk_score: f64,
    /// Caller-supplied timestamp of this step
    pub timestamp_ms: u64,
}

/// Ordered-level state machine driven by a scalar risk score.
#[derive(Debug, Clone)]
pub struct EscalationEngine {
    config: EscalationConfig,
    level: EscalationLevel,
    /// Pending (candidate, consecutive count); direction always strictly
    /// away from `level`
    candidate: Option<(EscalationLevel, u32)>,
    last_observation_ms: u64,
    history: VecDeque<TransitionRecord>,
    active_override: Option<ManualOverride>,
}

impl EscalationEngine {
    /// Create an engine starting at the lowest level.
    pub fn new(config: EscalationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.history_capacity.max(1);
        Ok(Self {
            config,
            level: EscalationLevel::Normal,
            candidate: None,
            last_observation_ms: 0,
            history: VecDeque::with_capacity(capacity),
            active_override: None,
        })
    }

    /// Current committed level.
    pub fn level(&self) -> EscalationLevel {
        self.level
    }

    /// The tuning record.
    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Bounded transition history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.history.iter()
    }

    /// Currently stored override, if any (may be expired-but-frozen).
    pub fn active_override(&self) -> Option<&ManualOverride> {
        self.active_override.as_ref()
    }

    /// Timestamp of the last observation fed to `step`.
    pub fn last_observation_ms(&self) -> u64 {
        self.last_observation_ms
    }

    /// Map a risk score to a level via the band table (lower-inclusive).
    pub fn level_for_score(&self, risk_score: f64) -> EscalationLevel {
        let index = self
            .config
            .boundaries
            .iter()
            .filter(|&&b| risk_score >= b)
            .count();
        EscalationLevel::from_index(index).unwrap_or(EscalationLevel::Emergency)
    }

    /// Submit an override, replacing any previous one.
    ///
    /// Takes effect no later than the next `step`; an in-flight evaluation
    /// is never affected retroactively.
    pub fn submit_override(&mut self, ov: ManualOverride) -> Result<(), OverrideError> {
        ov.validate()?;
        info!(
            id = %ov.id,
            kind = ?ov.kind,
            target = ?ov.target,
            issued_by = %ov.issued_by,
            reason = %ov.reason,
            replaced = self.active_override.is_some(),
            "override submitted"
        );
        self.active_override = Some(ov);
        Ok(())
    }

    /// Clear the stored override, returning it for the caller's audit log.
    pub fn clear_override(&mut self) -> Option<ManualOverride> {
        let cleared = self.active_override.take();
        if let Some(ov) = &cleared {
            info!(id = %ov.id, "override cleared");
        }
        cleared
    }

    /// Advance the state machine by one observation.
    pub fn step(&mut self, risk_score: f64, now_ms: u64) -> EscalationDecision {
        let recommended = self.level_for_score(risk_score);
        self.last_observation_ms = now_ms;

        if let Some(ov) = self.active_override.clone() {
            if ov.is_expired(now_ms) {
                return self.step_expired_override(ov, recommended, risk_score, now_ms);
            }
            return self.step_with_override(ov, recommended, risk_score, now_ms);
        }

        self.evaluate(recommended, risk_score, now_ms)
    }

    fn step_expired_override(
        &mut self,
        ov: ManualOverride,
        recommended: EscalationLevel,
        risk_score: f64,
        now_ms: u64,
    ) -> EscalationDecision {
        if ov.auto_restore {
            // Retire and re-derive the level purely from current risk, as
            // if no override existed.
            self.active_override = None;
            self.candidate = None;
            info!(id = %ov.id, "override expired, auto-restoring from risk");
            let transition = (recommended != self.level).then(|| {
                self.commit(recommended, risk_score, now_ms, TransitionReason::OverrideExpired)
            });
            return EscalationDecision {
                level: self.level,
                recommended,
                pending: None,
                consecutive: 0,
                hysteresis_holding: false,
                transition,
                override_id: Some(ov.id),
                override_kind: Some(ov.kind),
                at_ceiling: false,
                risk_score,
                timestamp_ms: now_ms,
            };
        }

        // No auto-restore: stay frozen at the override target until a
        // human clears it.
        let target = ov.target.unwrap_or(self.level);
        let transition = (target != self.level)
            .then(|| self.commit(target, risk_score, now_ms, TransitionReason::Override));
        self.candidate = None;
        EscalationDecision {
            level: self.level,
            recommended,
            pending: None,
            consecutive: 0,
            hysteresis_holding: false,
            transition,
            override_id: Some(ov.id),
            override_kind: Some(ov.kind),
            at_ceiling: false,
            risk_score,
            timestamp_ms: now_ms,
        }
    }

    fn step_with_override(
        &mut self,
        ov: ManualOverride,
        recommended: EscalationLevel,
        risk_score: f64,
        now_ms: u64,
    ) -> EscalationDecision {
        match ov.kind {
            OverrideKind::ForceLevel | OverrideKind::LockLevel => {
                let target = ov.target.unwrap_or(self.level);
                let transition = (target != self.level)
                    .then(|| self.commit(target, risk_score, now_ms, TransitionReason::Override));
                self.candidate = None;
                EscalationDecision {
                    level: self.level,
                    recommended,
                    pending: None,
                    consecutive: 0,
                    hysteresis_holding: false,
                    transition,
                    override_id: Some(ov.id),
                    override_kind: Some(ov.kind),
                    at_ceiling: false,
                    risk_score,
                    timestamp_ms: now_ms,
                }
            }
            OverrideKind::SingleShot => {
                // Bypass hysteresis once, then retire.
                self.active_override = None;
                self.candidate = None;
                let transition = (recommended != self.level)
                    .then(|| self.commit(recommended, risk_score, now_ms, TransitionReason::Override));
                EscalationDecision {
                    level: self.level,
                    recommended,
                    pending: None,
                    consecutive: 0,
                    hysteresis_holding: false,
                    transition,
                    override_id: Some(ov.id),
                    override_kind: Some(ov.kind),
                    at_ceiling: false,
                    risk_score,
                    timestamp_ms: now_ms,
                }
            }
            OverrideKind::DryRun => {
                // Compute and log what the engine would do, mutate nothing.
                let mut shadow = self.clone();
                shadow.active_override = None;
                let would = shadow.evaluate(recommended, risk_score, now_ms);
                debug!(
                    id = %ov.id,
                    current = %self.level,
                    would_level = %would.level,
                    would_transition = would.transition.is_some(),
                    "dry-run override evaluated"
                );
                EscalationDecision {
                    level: self.level,
                    recommended,
                    pending: self.candidate.map(|(c, _)| c),
                    consecutive: self.candidate.map(|(_, n)| n).unwrap_or(0),
                    hysteresis_holding: false,
                    transition: None,
                    override_id: Some(ov.id),
                    override_kind: Some(ov.kind),
                    at_ceiling: false,
                    risk_score,
                    timestamp_ms: now_ms,
                }
            }
        }
    }

    /// Steps 3-6 of the transition function: debounced hysteresis.
    fn evaluate(
        &mut self,
        recommended: EscalationLevel,
        risk_score: f64,
        now_ms: u64,
    ) -> EscalationDecision {
        let mut transition = None;
        let mut hysteresis_holding = false;
        let mut at_ceiling = false;

        match recommended.cmp(&self.level) {
            Ordering::Greater => {
                let count = match self.candidate {
                    Some((candidate, n)) if candidate == recommended => n + 1,
                    _ => 1,
                };
                if count >= self.config.escalate_confirmations {
                    transition = Some(self.commit(
                        recommended,
                        risk_score,
                        now_ms,
                        TransitionReason::Escalation,
                    ));
                    self.candidate = None;
                } else {
                    self.candidate = Some((recommended, count));
                    hysteresis_holding = true;
                }
            }
            Ordering::Less => {
                let floor = self.band_floor(self.level);
                let threshold = floor * (1.0 - self.config.deescalation_buffer);
                if risk_score < threshold {
                    let count = match self.candidate {
                        Some((candidate, n)) if candidate == recommended => n + 1,
                        _ => 1,
                    };
                    if count >= self.config.deescalate_confirmations {
                        transition = Some(self.commit(
                            recommended,
                            risk_score,
                            now_ms,
                            TransitionReason::Deescalation,
                        ));
                        self.candidate = None;
                    } else {
                        self.candidate = Some((recommended, count));
                        hysteresis_holding = true;
                    }
                } else {
                    // Inside the buffer band: hold at the current level and
                    // reset any partial count.
                    self.candidate = None;
                    hysteresis_holding = true;
                }
            }
            Ordering::Equal => {
                // Full agreement resets pending evaluation.
                self.candidate = None;
                if self.level.is_top() {
                    at_ceiling = risk_score >= self.config.boundaries[3];
                }
            }
        }

        EscalationDecision {
            level: self.level,
            recommended,
            pending: self.candidate.map(|(c, _)| c),
            consecutive: self.candidate.map(|(_, n)| n).unwrap_or(0),
            hysteresis_holding,
            transition,
            override_id: None,
            override_kind: None,
            at_ceiling,
            risk_score,
            timestamp_ms: now_ms,
        }
    }

    /// Lower band edge of a level; Normal has no lower edge.
    fn band_floor(&self, level: EscalationLevel) -> f64 {
        match level.index().checked_sub(1) {
            Some(i) => self.config.boundaries[i],
            None => f64::NEG_INFINITY,
        }
    }

    fn commit(
        &mut self,
        to: EscalationLevel,
        risk_score: f64,
        now_ms: u64,
        reason: TransitionReason,
    ) -> TransitionRecord {
        let record = TransitionRecord {
            timestamp_ms: now_ms,
            from: self.level,
            to,
            risk_score,
            reason,
        };
        info!(
            from = %self.level,
            to = %to,
            risk = risk_score,
            reason = ?reason,
            "escalation level transition"
        );
        self.level = to;
        if self.history.len() == self.config.history_capacity.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EscalationEngine {
        EscalationEngine::new(EscalationConfig::default()).unwrap()
    }

    #[test]
    fn test_band_mapping_is_lower_inclusive() {
        let engine = engine();
        assert_eq!(engine.level_for_score(0.0), EscalationLevel::Normal);
        assert_eq!(engine.level_for_score(19.9), EscalationLevel::Normal);
        // A score exactly at a boundary maps to the higher level.
        assert_eq!(engine.level_for_score(20.0), EscalationLevel::Watch);
        assert_eq!(engine.level_for_score(40.0), EscalationLevel::Alert);
        assert_eq!(engine.level_for_score(60.0), EscalationLevel::Critical);
        assert_eq!(engine.level_for_score(80.0), EscalationLevel::Emergency);
        assert_eq!(engine.level_for_score(150.0), EscalationLevel::Emergency);
    }

    #[test]
    fn test_non_monotonic_bands_rejected() {
        let config = EscalationConfig::default().with_boundaries([40.0, 20.0, 60.0, 80.0]);
        assert!(matches!(
            EscalationEngine::new(config),
            Err(ConfigError::NonMonotonicBands { .. })
        ));
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let config = EscalationConfig::default().with_confirmations(0, 3);
        assert!(matches!(
            EscalationEngine::new(config),
            Err(ConfigError::InvalidDebounce { .. })
        ));
    }

    #[test]
    fn test_single_sample_spike_never_commits() {
        let mut engine = engine();
        // Crosses the Watch boundary for exactly one sample.
        engine.step(25.0, 1_000);
        let decision = engine.step(5.0, 2_000);

        assert_eq!(decision.level, EscalationLevel::Normal);
        assert!(engine.history().count() == 0, "no committed transition");
    }

    #[test]
    fn test_escalation_on_kth_confirmation() {
        let mut engine = engine();
        // [38, 41, 42]: Watch candidate, then two consecutive Alert samples.
        let d1 = engine.step(38.0, 1_000);
        assert_eq!(d1.level, EscalationLevel::Normal);
        assert_eq!(d1.pending, Some(EscalationLevel::Watch));

        let d2 = engine.step(41.0, 2_000);
        assert_eq!(d2.level, EscalationLevel::Normal);
        assert_eq!(d2.pending, Some(EscalationLevel::Alert));
        assert_eq!(d2.consecutive, 1);
        assert!(d2.hysteresis_holding);

        let d3 = engine.step(42.0, 3_000);
        assert_eq!(d3.level, EscalationLevel::Alert);
        assert!(d3.transition.is_some());
        assert_eq!(
            d3.transition.as_ref().unwrap().reason,
            TransitionReason::Escalation
        );
    }

    #[test]
    fn test_candidate_reset_on_changing_recommendation() {
        let mut engine = engine();
        // [41, 39, 41]: the recommendation flips between Alert and Watch,
        // resetting the candidate each time. Never commits.
        engine.step(41.0, 1_000);
        engine.step(39.0, 2_000);
        let decision = engine.step(41.0, 3_000);

        assert_eq!(decision.level, EscalationLevel::Normal);
        assert_eq!(decision.pending, Some(EscalationLevel::Alert));
        assert_eq!(decision.consecutive, 1);
        assert_eq!(engine.history().count(), 0);
    }

    fn escalate_to_alert(engine: &mut EscalationEngine, start_ms: u64) {
        engine.step(45.0, start_ms);
        engine.step(45.0, start_ms + 1_000);
        assert_eq!(engine.level(), EscalationLevel::Alert);
    }

    #[test]
    fn test_deescalation_needs_buffer_and_persistence() {
        let mut engine = engine();
        escalate_to_alert(&mut engine, 1_000);

        // Alert's lower edge is 40; the de-escalation threshold is 36.
        // Oscillating between 41 and 39 never drops below 36: holds forever.
        for i in 0..20u64 {
            let score = if i % 2 == 0 { 41.0 } else { 39.0 };
            let decision = engine.step(score, 10_000 + i * 1_000);
            assert_eq!(decision.level, EscalationLevel::Alert);
        }

        // Three consecutive samples strictly below 36 de-escalate.
        engine.step(30.0, 50_000);
        engine.step(30.0, 51_000);
        let decision = engine.step(30.0, 52_000);
        assert_eq!(decision.level, EscalationLevel::Watch);
        assert_eq!(
            decision.transition.as_ref().unwrap().reason,
            TransitionReason::Deescalation
        );
    }

    #[test]
    fn test_buffer_band_clears_partial_count() {
        let mut engine = engine();
        escalate_to_alert(&mut engine, 1_000);

        // Two samples below the lowered threshold, then one inside the
        // buffer band: the count must restart from scratch.
        engine.step(30.0, 10_000);
        engine.step(30.0, 11_000);
        let held = engine.step(38.0, 12_000);
        assert_eq!(held.pending, None);
        assert!(held.hysteresis_holding);

        engine.step(30.0, 13_000);
        let decision = engine.step(30.0, 14_000);
        assert_eq!(
            decision.level,
            EscalationLevel::Alert,
            "only two samples since the buffer reset"
        );
    }

    #[test]
    fn test_no_change_cycles_are_idempotent() {
        let mut engine = engine();
        let first = engine.step(10.0, 1_000);
        for i in 2..10u64 {
            let decision = engine.step(10.0, i * 1_000);
            assert_eq!(decision.level, first.level);
            assert_eq!(decision.pending, None);
            assert_eq!(decision.consecutive, 0);
        }
        assert_eq!(engine.history().count(), 0);
    }

    #[test]
    fn test_force_override_precedence() {
        let mut engine = engine();
        engine
            .submit_override(
                ManualOverride::new("ov-1", OverrideKind::ForceLevel, "ops")
                    .with_target(EscalationLevel::Watch)
                    .created_at(1_000),
            )
            .unwrap();

        // Even an EMERGENCY-grade score is preempted.
        let decision = engine.step(99.0, 2_000);
        assert_eq!(decision.level, EscalationLevel::Watch);
        assert_eq!(decision.override_kind, Some(OverrideKind::ForceLevel));
        assert_eq!(decision.recommended, EscalationLevel::Emergency);

        let decision = engine.step(99.0, 3_000);
        assert_eq!(decision.level, EscalationLevel::Watch);
    }

    #[test]
    fn test_override_expiry_auto_restores_from_risk() {
        let mut engine = engine();
        engine
            .submit_override(
                ManualOverride::new("ov-2", OverrideKind::ForceLevel, "ops")
                    .with_target(EscalationLevel::Emergency)
                    .created_at(1_000)
                    .expires_at(10_000)
                    .with_auto_restore(true),
            )
            .unwrap();

        assert_eq!(engine.step(5.0, 2_000).level, EscalationLevel::Emergency);

        // Past expiry: the very next step ignores the override and
        // re-derives from the risk score.
        let decision = engine.step(5.0, 11_000);
        assert_eq!(decision.level, EscalationLevel::Normal);
        assert_eq!(
            decision.transition.as_ref().unwrap().reason,
            TransitionReason::OverrideExpired
        );
        assert!(engine.active_override().is_none());
    }

    #[test]
    fn test_override_expiry_without_auto_restore_freezes() {
        let mut engine = engine();
        engine
            .submit_override(
                ManualOverride::new("ov-3", OverrideKind::LockLevel, "ops")
                    .with_target(EscalationLevel::Critical)
                    .created_at(1_000)
                    .expires_at(10_000)
                    .with_auto_restore(false),
            )
            .unwrap();

        engine.step(5.0, 2_000);
        // Expired but frozen until a human clears it.
        assert_eq!(engine.step(5.0, 20_000).level, EscalationLevel::Critical);
        assert!(engine.active_override().is_some());

        engine.clear_override();
        // Re-derivation goes through normal hysteresis from Critical.
        let decision = engine.step(5.0, 21_000);
        assert_eq!(decision.level, EscalationLevel::Critical);
        assert!(decision.hysteresis_holding);
    }

    #[test]
    fn test_single_shot_bypasses_once_then_retires() {
        let mut engine = engine();
        engine
            .submit_override(
                ManualOverride::new("ov-4", OverrideKind::SingleShot, "ops").created_at(1_000),
            )
            .unwrap();

        // One step jumps straight to the recommendation, no debounce.
        let decision = engine.step(65.0, 2_000);
        assert_eq!(decision.level, EscalationLevel::Critical);
        assert!(engine.active_override().is_none());

        // Next steps are back to normal hysteresis.
        let decision = engine.step(85.0, 3_000);
        assert_eq!(decision.level, EscalationLevel::Critical);
        assert_eq!(decision.pending, Some(EscalationLevel::Emergency));
    }

    #[test]
    fn test_dry_run_observes_without_mutating() {
        let mut engine = engine();
        engine
            .submit_override(
                ManualOverride::new("ov-5", OverrideKind::DryRun, "ops").created_at(1_000),
            )
            .unwrap();

        for i in 0..5u64 {
            let decision = engine.step(95.0, 2_000 + i * 1_000);
            assert_eq!(decision.level, EscalationLevel::Normal);
            assert_eq!(decision.override_kind, Some(OverrideKind::DryRun));
        }
        assert_eq!(engine.history().count(), 0);
    }

    #[test]
    fn test_override_replacement() {
        let mut engine = engine();
        engine
            .submit_override(
                ManualOverride::new("ov-a", OverrideKind::ForceLevel, "ops")
                    .with_target(EscalationLevel::Watch),
            )
            .unwrap();
        engine
            .submit_override(
                ManualOverride::new("ov-b", OverrideKind::ForceLevel, "ops")
                    .with_target(EscalationLevel::Critical),
            )
            .unwrap();

        assert_eq!(engine.step(5.0, 1_000).level, EscalationLevel::Critical);
        assert_eq!(engine.active_override().unwrap().id, "ov-b");
    }

    #[test]
    fn test_ceiling_diagnostic_at_top_level() {
        let mut engine = engine();
        engine.step(95.0, 1_000);
        engine.step(95.0, 2_000);
        assert_eq!(engine.level(), EscalationLevel::Emergency);

        let decision = engine.step(99.0, 3_000);
        assert_eq!(decision.level, EscalationLevel::Emergency);
        assert!(decision.at_ceiling);
        assert!(decision.transition.is_none());
    }

    #[test]
    fn test_transition_history_records_audit_fields() {
        let mut engine = engine();
        engine.step(45.0, 1_000);
        engine.step(45.0, 2_000);

        let records: Vec<_> = engine.history().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, EscalationLevel::Normal);
        assert_eq!(records[0].to, EscalationLevel::Alert);
        assert_eq!(records[0].timestamp_ms, 2_000);
        assert!((records[0].risk_score - 45.0).abs() < f64::EPSILON);
    }
}
