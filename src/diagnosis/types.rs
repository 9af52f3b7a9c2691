use serde::{Deserialize, Serialize};

use crate::models::enums::UrgencyAssessment;
use crate::triage::red_flags::RedFlag;
use crate::triage::rules::CandidateDiagnosis;

/// Structured diagnosis extracted from the text-generation backend's JSON
/// response. All fields are optional: the model is not trusted to follow
/// the output contract completely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiDiagnosis {
    pub primary_diagnosis: Option<String>,
    /// Plain-language explanation a nurse can relay to the patient.
    pub explanation: Option<String>,
    pub reasoning: Option<String>,
    /// Normalized to `[0, 1]` from the model's 0-100 scale.
    pub confidence: Option<f32>,
    pub differential_diagnoses: Vec<AiDifferential>,
    pub treatment_plan: Vec<String>,
    pub red_flags: Vec<String>,
    pub follow_up_recommendations: Vec<String>,
}

/// One differential suggestion from the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiDifferential {
    pub condition: String,
    /// Normalized to `[0, 1]`; defaults to 0.5 when the model gives none.
    pub confidence: f32,
}

/// The diagnosis stage's output, handed to the treatment planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisReport {
    pub primary_diagnosis: String,
    /// Plain-language explanation; empty when no backend contributed one.
    pub explanation: String,
    pub reasoning: String,
    /// Ranked differential: rule-based candidates merged with any
    /// AI-suggested conditions.
    pub differential: Vec<CandidateDiagnosis>,
    pub red_flags: Vec<RedFlag>,
    pub emergency_conditions: Vec<String>,
    pub recommended_tests: Vec<String>,
    /// Overall confidence, always in `[0, 1]`.
    pub confidence: f32,
    pub urgency_assessment: UrgencyAssessment,
    /// Weighted symptom severity in `[0, 1]`.
    pub severity_score: f32,
    /// Tiered clinical recommendations.
    pub recommendations: Vec<String>,
    /// The backend's primary diagnosis verbatim, `None` when the backend
    /// was absent, failed, or returned nothing usable.
    pub ai_diagnosis: Option<String>,
}
