//! Administrative override channel.
//!
//! An operator can preempt the automatic level derivation for a bounded or
//! indefinite period. At most one override is active per engine; a new
//! submission replaces the previous one. Every field needed for an external
//! audit log (who/when/why/what level) is carried on the record itself.

use serde::{Deserialize, Serialize};

use super::level::EscalationLevel;
use crate::errors::OverrideError;

/// How an override preempts automatic evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideKind {
    /// Pin the engine to the target level
    ForceLevel,
    /// Pin the engine to the target level; semantically a hold an operator
    /// intends to keep until cleared
    LockLevel,
    /// Bypass hysteresis for exactly one step, then retire
    SingleShot,
    /// Compute and log the decision, but return the unchanged level
    DryRun,
}

impl OverrideKind {
    /// Force-level and lock-level overrides must carry a target.
    pub fn requires_target(&self) -> bool {
        matches!(self, OverrideKind::ForceLevel | OverrideKind::LockLevel)
    }
}

/// An administrative override record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualOverride {
    /// Identifier for audit correlation
    pub id: String,
    /// Preemption behavior
    pub kind: OverrideKind,
    /// Target level (required for force/lock kinds)
    pub target: Option<EscalationLevel>,
    /// Issuing principal
    pub issued_by: String,
    /// Operator-supplied reason
    pub reason: String,
    /// Creation time (epoch ms)
    pub created_at_ms: u64,
    /// Optional expiry (epoch ms); `None` never expires
    pub expires_at_ms: Option<u64>,
    /// On expiry, re-derive the level from current risk. When false the
    /// engine stays frozen at the override target until a human clears it.
    pub auto_restore: bool,
}

impl ManualOverride {
    /// Create an override with no target, reason, or expiry.
    pub fn new(id: impl Into<String>, kind: OverrideKind, issued_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            target: None,
            issued_by: issued_by.into(),
            reason: String::new(),
            created_at_ms: 0,
            expires_at_ms: None,
            auto_restore: true,
        }
    }

    /// Builder method for the target level.
    pub fn with_target(mut self, target: EscalationLevel) -> Self {
        self.target = Some(target);
        self
    }

    /// Builder method for the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Builder method for creation time.
    pub fn created_at(mut self, created_at_ms: u64) -> Self {
        self.created_at_ms = created_at_ms;
        self
    }

    /// Builder method for the expiry.
    pub fn expires_at(mut self, expires_at_ms: u64) -> Self {
        self.expires_at_ms = Some(expires_at_ms);
        self
    }

    /// Builder method for the auto-restore flag.
    pub fn with_auto_restore(mut self, auto_restore: bool) -> Self {
        self.auto_restore = auto_restore;
        self
    }

    /// Validate the submission. Rejection leaves engine state untouched.
    pub fn validate(&self) -> Result<(), OverrideError> {
        if self.kind.requires_target() && self.target.is_none() {
            return Err(OverrideError::MissingTarget {
                id: self.id.clone(),
                kind: self.kind,
            });
        }
        if let Some(expires_at_ms) = self.expires_at_ms {
            if expires_at_ms <= self.created_at_ms {
                return Err(OverrideError::ExpiryBeforeCreation {
                    id: self.id.clone(),
                    created_at_ms: self.created_at_ms,
                    expires_at_ms,
                });
            }
        }
        Ok(())
    }

    /// Has this override's expiry passed?
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|expiry| now_ms > expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_level_requires_target() {
        let ov = ManualOverride::new("ov-1", OverrideKind::ForceLevel, "ops");
        assert!(matches!(
            ov.validate(),
            Err(OverrideError::MissingTarget { .. })
        ));

        let ov = ov.with_target(EscalationLevel::Critical);
        assert!(ov.validate().is_ok());
    }

    #[test]
    fn test_dry_run_needs_no_target() {
        let ov = ManualOverride::new("ov-2", OverrideKind::DryRun, "ops");
        assert!(ov.validate().is_ok());
    }

    #[test]
    fn test_expiry_must_follow_creation() {
        let ov = ManualOverride::new("ov-3", OverrideKind::SingleShot, "ops")
            .created_at(5_000)
            .expires_at(4_000);
        assert!(matches!(
            ov.validate(),
            Err(OverrideError::ExpiryBeforeCreation { .. })
        ));
    }

    #[test]
    fn test_expiry_check() {
        let ov = ManualOverride::new("ov-4", OverrideKind::ForceLevel, "ops")
            .with_target(EscalationLevel::Watch)
            .created_at(1_000)
            .expires_at(2_000);

        assert!(!ov.is_expired(2_000));
        assert!(ov.is_expired(2_001));

        let indefinite = ManualOverride::new("ov-5", OverrideKind::LockLevel, "ops")
            .with_target(EscalationLevel::Watch);
        assert!(!indefinite.is_expired(u64::MAX));
    }

    #[test]
    fn test_audit_fields_serialize() {
        let ov = ManualOverride::new("ov-6", OverrideKind::ForceLevel, "oncall@example")
            .with_target(EscalationLevel::Emergency)
            .with_reason("storm response drill")
            .created_at(1_000)
            .expires_at(90_000);

        let json = serde_json::to_string(&ov).unwrap();
        assert!(json.contains("oncall@example"));
        assert!(json.contains("storm response drill"));
        assert!(json.contains("Emergency"));
    }
}
