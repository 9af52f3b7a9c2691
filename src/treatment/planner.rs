//! Evidence-based treatment planning: urgency-tiered baseline actions
//! enriched with sentence-level extractions from retrieved guideline text.

use std::sync::LazyLock;

use regex::Regex;

use crate::diagnosis::types::DiagnosisReport;
use crate::models::enums::UrgencyLevel;
use crate::retrieval::types::RetrievalBundle;

use super::medications::{extract_medications, filter_by_allergies};
use super::types::{
    ReferralRecommendation, TestRecommendation, Timeline, TreatmentPlan,
};

// Bounded list sizes for readability.
const MAX_IMMEDIATE: usize = 10;
const MAX_SHORT_TERM: usize = 10;
const MAX_FOLLOW_UP: usize = 8;

/// How many sentences of each guideline chunk are considered.
const SENTENCES_PER_CHUNK: usize = 5;

static IMMEDIATE_WORDS: &[&str] =
    &["immediate", "urgent", "emergency", "critical", "now", "immediately"];
static SHORT_TERM_WORDS: &[&str] =
    &["administer", "give", "provide", "treat", "medication", "drug", "therapy"];
static FOLLOW_UP_WORDS: &[&str] =
    &["monitor", "observe", "follow-up", "reassess", "review", "track"];
static GENERAL_CARE_WORDS: &[&str] = &["treatment", "manage", "care", "intervention"];

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("Invalid sentence boundary pattern"));

/// Split guideline text into trimmed, non-trivial sentences.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| s.len() > 3)
        .map(|s| s.to_string())
        .collect()
}

/// Derives the treatment plan from the diagnosis, the routed urgency tier,
/// and whatever guideline context retrieval produced.
pub struct TreatmentPlanner;

impl TreatmentPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build the complete plan. Every action list and the medication list
    /// come back non-empty regardless of how little context is available.
    pub fn build_plan(
        &self,
        report: &DiagnosisReport,
        urgency: UrgencyLevel,
        bundle: &RetrievalBundle,
        allergies: &[String],
    ) -> TreatmentPlan {
        let (immediate, short_term, follow_up) = action_steps(urgency, bundle);

        let medications = filter_by_allergies(extract_medications(&bundle.chunks), allergies);

        let plan = TreatmentPlan {
            urgency_level: urgency,
            immediate_actions: immediate,
            short_term_actions: short_term,
            follow_up_actions: follow_up,
            timeline: timeline(urgency),
            warnings: warnings(report),
            success_criteria: success_criteria(&report.primary_diagnosis),
            medications,
            diagnostic_tests: diagnostic_tests(&report.primary_diagnosis, urgency),
            specialist_referrals: specialist_referrals(&report.primary_diagnosis, urgency),
            evidence_sources: bundle.sources.clone(),
            knowledge_base_used: bundle.knowledge_base_used,
        };

        tracing::info!(
            urgency = urgency.as_str(),
            immediate = plan.immediate_actions.len(),
            medications = plan.medications.len(),
            sources = plan.evidence_sources.len(),
            "Treatment plan assembled"
        );

        plan
    }
}

impl Default for TreatmentPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Categorize guideline sentences into the three action lists, then layer
/// the urgency-tiered baseline steps on top and backfill any list the
/// guidelines left empty.
fn action_steps(
    urgency: UrgencyLevel,
    bundle: &RetrievalBundle,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut immediate: Vec<String> = Vec::new();
    let mut short_term: Vec<String> = Vec::new();
    let mut follow_up: Vec<String> = Vec::new();

    let escalated = matches!(urgency, UrgencyLevel::Critical | UrgencyLevel::High);

    for chunk in &bundle.chunks {
        for sentence in split_sentences(&chunk.content)
            .into_iter()
            .take(SENTENCES_PER_CHUNK)
        {
            let lower = sentence.to_lowercase();

            if IMMEDIATE_WORDS.iter().any(|w| lower.contains(w)) {
                if escalated && !immediate.contains(&sentence) {
                    immediate.push(sentence);
                }
            } else if SHORT_TERM_WORDS.iter().any(|w| lower.contains(w)) {
                if !short_term.contains(&sentence) {
                    short_term.push(sentence);
                }
            } else if FOLLOW_UP_WORDS.iter().any(|w| lower.contains(w)) {
                if !follow_up.contains(&sentence) {
                    follow_up.push(sentence);
                }
            } else if GENERAL_CARE_WORDS.iter().any(|w| lower.contains(w))
                && !short_term.contains(&sentence)
            {
                short_term.push(sentence);
            }
        }
    }

    // Standard steps by tier, placed ahead of extracted guidance.
    match urgency {
        UrgencyLevel::Critical => {
            let mut baseline = vec![
                "CALL EMERGENCY SERVICES IMMEDIATELY OR GO TO NEAREST EMERGENCY DEPARTMENT"
                    .to_string(),
                "Monitor vital signs continuously (blood pressure, heart rate, breathing)"
                    .to_string(),
                "Keep patient calm and in a comfortable position".to_string(),
            ];
            baseline.append(&mut immediate);
            immediate = baseline;
            if !immediate.iter().any(|a| a.to_lowercase().contains("oxygen")) {
                immediate.push("Prepare to administer oxygen if available".to_string());
            }
        }
        UrgencyLevel::High => {
            let mut baseline =
                vec!["Seek urgent medical evaluation within 2-4 hours".to_string()];
            baseline.append(&mut immediate);
            immediate = baseline;
            immediate.push("Monitor symptoms closely and document any changes".to_string());
            immediate.push("Have patient rest and avoid strenuous activity".to_string());
        }
        UrgencyLevel::Moderate | UrgencyLevel::Low => {
            immediate.push("Schedule medical consultation within 24-48 hours".to_string());
            immediate.push("Monitor symptoms and document progression".to_string());
        }
    }

    if short_term.is_empty() {
        short_term.extend([
            "Follow treatment plan as prescribed by healthcare provider".to_string(),
            "Take all medications as directed (complete full course)".to_string(),
            "Maintain adequate hydration and nutrition".to_string(),
            "Get adequate rest to support recovery".to_string(),
        ]);
    }

    if follow_up.is_empty() {
        follow_up.extend([
            "Schedule follow-up appointment in 3-7 days or as directed".to_string(),
            "Report immediately if symptoms worsen or new symptoms develop".to_string(),
            "Keep a symptom diary to track progress".to_string(),
            "Return to emergency department if condition deteriorates".to_string(),
        ]);
    }

    immediate.truncate(MAX_IMMEDIATE);
    short_term.truncate(MAX_SHORT_TERM);
    follow_up.truncate(MAX_FOLLOW_UP);

    (immediate, short_term, follow_up)
}

/// Fixed deadline descriptions per tier.
fn timeline(urgency: UrgencyLevel) -> Timeline {
    match urgency {
        UrgencyLevel::Critical => Timeline {
            immediate: "NOW - Within 5 minutes".to_string(),
            short_term: "Within 1-2 hours".to_string(),
            follow_up: "24-48 hours after initial treatment".to_string(),
        },
        UrgencyLevel::High => Timeline {
            immediate: "Within 1 hour".to_string(),
            short_term: "Within 2-4 hours".to_string(),
            follow_up: "Within 1 week".to_string(),
        },
        UrgencyLevel::Moderate | UrgencyLevel::Low => Timeline {
            immediate: "Within 24 hours".to_string(),
            short_term: "Within 3-7 days".to_string(),
            follow_up: "Within 2-4 weeks".to_string(),
        },
    }
}

fn warnings(report: &DiagnosisReport) -> Vec<String> {
    let mut warnings = Vec::new();

    if !report.emergency_conditions.is_empty() {
        warnings.push(format!(
            "EMERGENCY CONDITIONS DETECTED: {}",
            report.emergency_conditions.join(", ")
        ));
        warnings.push("CALL EMERGENCY SERVICES IMMEDIATELY".to_string());
    }

    for flag in &report.red_flags {
        warnings.push(format!("Red Flag: {} - {}", flag.flag, flag.action));
    }

    warnings
}

fn success_criteria(primary_diagnosis: &str) -> Vec<String> {
    let mut criteria = vec![
        "Symptom improvement within expected timeframe".to_string(),
        "No worsening of condition".to_string(),
        "Vital signs return to normal range".to_string(),
        "Patient able to perform daily activities".to_string(),
        "Follow-up appointments completed".to_string(),
    ];

    let diagnosis = primary_diagnosis.to_lowercase();
    if diagnosis.contains("fever") || diagnosis.contains("febrile") {
        criteria.push("Temperature returns to normal within 48-72 hours".to_string());
    }
    if diagnosis.contains("pain") {
        criteria.push("Pain reduces to a manageable level".to_string());
    }
    if diagnosis.contains("infection") {
        criteria.push("Signs of infection resolve with treatment".to_string());
    }
    if diagnosis.contains("respiratory") || diagnosis.contains("pneumonia") {
        criteria.push("Breathing returns to baseline without distress".to_string());
    }

    criteria
}

fn test_urgency(urgency: UrgencyLevel) -> &'static str {
    match urgency {
        UrgencyLevel::Critical => "STAT - Immediate",
        UrgencyLevel::High => "Urgent - Within 24 hours",
        UrgencyLevel::Moderate | UrgencyLevel::Low => "Routine - Within 1 week",
    }
}

fn diagnostic_tests(primary_diagnosis: &str, urgency: UrgencyLevel) -> Vec<TestRecommendation> {
    let diagnosis = primary_diagnosis.to_lowercase();
    let mut tests = Vec::new();

    if diagnosis.contains("infection")
        || diagnosis.contains("fever")
        || diagnosis.contains("febrile")
        || diagnosis.contains("malaria")
        || diagnosis.contains("typhoid")
    {
        tests.push(TestRecommendation {
            test: "Complete Blood Count (CBC)".to_string(),
            purpose: "Check for infection or anemia".to_string(),
            urgency: if urgency == UrgencyLevel::Critical {
                "Stat".to_string()
            } else {
                "Routine".to_string()
            },
        });
    }

    if diagnosis.contains("cardiac") || diagnosis.contains("heart") || diagnosis.contains("coronary")
    {
        tests.push(TestRecommendation {
            test: "Electrocardiogram (ECG)".to_string(),
            purpose: "Assess heart rhythm and function".to_string(),
            urgency: "Stat".to_string(),
        });
        tests.push(TestRecommendation {
            test: "Cardiac Enzymes (Troponin)".to_string(),
            purpose: "Rule out heart attack".to_string(),
            urgency: "Stat".to_string(),
        });
    }

    if diagnosis.contains("respiratory")
        || diagnosis.contains("pneumonia")
        || diagnosis.contains("asthma")
        || diagnosis.contains("tuberculosis")
    {
        tests.push(TestRecommendation {
            test: "Chest X-ray".to_string(),
            purpose: "Evaluate lungs for infection or abnormality".to_string(),
            urgency: "Routine".to_string(),
        });
    }

    if tests.is_empty() {
        tests.push(TestRecommendation {
            test: "Basic Metabolic Panel".to_string(),
            purpose: "General health assessment".to_string(),
            urgency: test_urgency(urgency).to_string(),
        });
    }

    tests
}

fn specialist_referrals(
    primary_diagnosis: &str,
    urgency: UrgencyLevel,
) -> Vec<ReferralRecommendation> {
    let diagnosis = primary_diagnosis.to_lowercase();
    let mut referrals = Vec::new();

    if diagnosis.contains("cardiac") || diagnosis.contains("heart") || diagnosis.contains("coronary")
    {
        referrals.push(ReferralRecommendation {
            specialist: "Cardiologist".to_string(),
            reason: "Cardiac evaluation and management".to_string(),
            urgency: if urgency == UrgencyLevel::Critical {
                "Urgent".to_string()
            } else {
                "Routine".to_string()
            },
        });
    }

    if diagnosis.contains("neurological")
        || diagnosis.contains("stroke")
        || diagnosis.contains("seizure")
        || diagnosis.contains("meningitis")
    {
        referrals.push(ReferralRecommendation {
            specialist: "Neurologist".to_string(),
            reason: "Neurological assessment".to_string(),
            urgency: "Urgent".to_string(),
        });
    }

    if diagnosis.contains("asthma") || diagnosis.contains("tuberculosis") {
        referrals.push(ReferralRecommendation {
            specialist: "Pulmonologist".to_string(),
            reason: "Respiratory evaluation and management".to_string(),
            urgency: "Routine".to_string(),
        });
    }

    referrals
}
