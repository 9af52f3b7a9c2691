//! Treatment stage: urgency-tiered action plans, medication suggestions
//! extracted from guideline text, timelines, and test/referral
//! recommendations.

pub mod medications;
pub mod planner;
pub mod types;

pub use planner::TreatmentPlanner;
pub use types::{
    MedicationRecommendation, ReferralRecommendation, TestRecommendation, Timeline,
    TreatmentPlan,
};
