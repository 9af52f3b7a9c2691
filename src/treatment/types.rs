use serde::{Deserialize, Serialize};

use crate::models::enums::UrgencyLevel;

/// A medication suggestion extracted from guideline text, or the
/// consult-provider placeholder when nothing was extractable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationRecommendation {
    pub name: String,
    pub dosage: String,
    pub duration: String,
    pub instructions: String,
    /// Which guideline document the suggestion came from.
    pub source: String,
}

/// A diagnostic test suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestRecommendation {
    pub test: String,
    pub purpose: String,
    pub urgency: String,
}

/// A specialist referral suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferralRecommendation {
    pub specialist: String,
    pub reason: String,
    pub urgency: String,
}

/// Deadline descriptions per plan phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub immediate: String,
    pub short_term: String,
    pub follow_up: String,
}

/// The treatment stage's output. Every action list and the medication
/// list carry at least one entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPlan {
    pub urgency_level: UrgencyLevel,
    pub immediate_actions: Vec<String>,
    pub short_term_actions: Vec<String>,
    pub follow_up_actions: Vec<String>,
    pub timeline: Timeline,
    pub warnings: Vec<String>,
    pub success_criteria: Vec<String>,
    pub medications: Vec<MedicationRecommendation>,
    pub diagnostic_tests: Vec<TestRecommendation>,
    pub specialist_referrals: Vec<ReferralRecommendation>,
    pub evidence_sources: Vec<String>,
    pub knowledge_base_used: bool,
}
