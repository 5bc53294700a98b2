//! Hysteresis-based escalation engine.
//!
//! An ordered-level state machine driven by a scalar risk score, with
//! asymmetric debounce (escalate fast, de-escalate slowly), a buffer band
//! below each level's edge, and an administrative override channel with
//! expiry and auto-restore.
//!
//! ```text
//! risk score ──> band mapping ──> debounce ──> committed level
//!                      ^                            |
//!                      └──── override preemption ───┘
//! ```

mod engine;
mod level;
mod manual;

pub use engine::{
    EscalationConfig, EscalationDecision, EscalationEngine, TransitionReason, TransitionRecord,
};
pub use level::EscalationLevel;
pub use manual::{ManualOverride, OverrideKind};
