//! Triage stage: symptom severity scoring, condition rule matching,
//! red-flag detection, and case routing.

pub mod coordinator;
pub mod red_flags;
pub mod rules;
pub mod severity;

pub use coordinator::{RoutingDecision, TriageCoordinator};
pub use red_flags::{detect_emergency_conditions, detect_red_flags, RedFlag};
pub use rules::{
    CandidateDiagnosis, ConditionRule, ConditionRuleEngine, ConditionTable, RuleTableError,
};
pub use severity::score_severity;
