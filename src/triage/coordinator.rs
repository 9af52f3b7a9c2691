//! Case routing: urgency scoring, priority assignment, stage selection,
//! and doctor-escalation policy.

use serde::{Deserialize, Serialize};

use crate::models::case::{CaseInput, VitalSigns};
use crate::models::enums::{CasePriority, PipelineStage, UrgencyLevel};

use super::red_flags::{detect_emergency_conditions, detect_red_flags, RedFlag};
use super::severity::score_severity;

// ---------------------------------------------------------------------------
// RoutingDecision
// ---------------------------------------------------------------------------

/// Routing outcome for one case, computed once before the downstream
/// stages run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub priority: CasePriority,
    pub urgency_level: UrgencyLevel,
    pub urgency_score: u32,
    pub required_stages: Vec<PipelineStage>,
    /// True whenever urgency is high/critical, or moderate with a score at
    /// or above the escalation threshold.
    pub needs_escalation: bool,
    pub rationale: String,
    /// Red flags and emergency labels found during routing; handed to the
    /// reasoner so detection runs once per case.
    pub red_flags: Vec<RedFlag>,
    pub emergency_conditions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

static CRITICAL_KEYWORDS: &[&str] = &[
    "chest pain",
    "heart attack",
    "cardiac arrest",
    "stroke",
    "severe bleeding",
    "unconscious",
    "not breathing",
    "seizure",
    "anaphylaxis",
    "severe allergic reaction",
    "difficulty breathing",
    "severe head injury",
    "overdose",
    "poisoning",
];

static URGENT_KEYWORDS: &[&str] = &[
    "severe pain",
    "high fever",
    "vomiting blood",
    "confusion",
    "severe headache",
    "blurred vision",
    "rapid heartbeat",
    "shortness of breath",
    "severe abdominal pain",
];

const CRITICAL_KEYWORD_POINTS: u32 = 30;
const URGENT_KEYWORD_POINTS: u32 = 15;
const VITAL_SCORE_CAP: u32 = 40;

// Tier cutoffs on the accumulated urgency score.
const CRITICAL_CUTOFF: u32 = 80;
const HIGH_CUTOFF: u32 = 50;
const MODERATE_CUTOFF: u32 = 25;

// ---------------------------------------------------------------------------
// TriageCoordinator
// ---------------------------------------------------------------------------

/// State-free scoring over symptoms, vital signs, and the red-flag
/// detector's output.
pub struct TriageCoordinator {
    escalation_score_threshold: u32,
}

impl TriageCoordinator {
    pub fn new(escalation_score_threshold: u32) -> Self {
        Self {
            escalation_score_threshold,
        }
    }

    /// Route a case: score urgency, assign priority, pick downstream
    /// stages, and decide whether a doctor must review.
    pub fn route_case(&self, case: &CaseInput) -> RoutingDecision {
        let urgency_score = self.assess_urgency(&case.symptoms, &case.vital_signs);

        let red_flags = detect_red_flags(&case.symptoms);
        let emergency_conditions =
            detect_emergency_conditions(&case.symptoms, &case.vital_signs);

        let scored_level = score_to_level(urgency_score);
        // Red flags and emergency conditions escalate past the keyword
        // score: an emergency label forces the critical tier, a red flag
        // forces at least high.
        let urgency_level = if !emergency_conditions.is_empty() {
            UrgencyLevel::Critical
        } else if !red_flags.is_empty() {
            scored_level.max(UrgencyLevel::High)
        } else {
            scored_level
        };

        let priority = assign_priority(urgency_level);
        let needs_escalation = self.should_escalate(urgency_level, urgency_score);
        let rationale =
            routing_rationale(urgency_level, urgency_score, &emergency_conditions);

        tracing::info!(
            priority = priority.as_str(),
            urgency = urgency_level.as_str(),
            score = urgency_score,
            escalate = needs_escalation,
            red_flags = red_flags.len(),
            "Case routed"
        );

        RoutingDecision {
            priority,
            urgency_level,
            urgency_score,
            required_stages: required_stages(),
            needs_escalation,
            rationale,
            red_flags,
            emergency_conditions,
        }
    }

    /// Quick pre-screen for callers that only need a tier: maps the
    /// severity score to a level without running full routing.
    pub fn quick_triage(&self, symptoms: &str) -> UrgencyLevel {
        let severity = score_severity(symptoms);
        if severity > 0.8 {
            UrgencyLevel::Critical
        } else if severity > 0.6 {
            UrgencyLevel::High
        } else if severity > 0.4 {
            UrgencyLevel::Moderate
        } else {
            UrgencyLevel::Low
        }
    }

    fn assess_urgency(&self, symptoms: &str, vitals: &VitalSigns) -> u32 {
        let text = symptoms.to_lowercase();

        let critical_hits = CRITICAL_KEYWORDS
            .iter()
            .filter(|kw| text.contains(*kw))
            .count() as u32;
        let urgent_hits = URGENT_KEYWORDS
            .iter()
            .filter(|kw| text.contains(*kw))
            .count() as u32;

        critical_hits * CRITICAL_KEYWORD_POINTS
            + urgent_hits * URGENT_KEYWORD_POINTS
            + analyze_vital_signs(vitals)
    }

    fn should_escalate(&self, level: UrgencyLevel, score: u32) -> bool {
        match level {
            UrgencyLevel::Critical | UrgencyLevel::High => true,
            UrgencyLevel::Moderate => score >= self.escalation_score_threshold,
            UrgencyLevel::Low => false,
        }
    }
}

/// Score vital signs against two threshold bands per measurement.
/// Unparseable values contribute nothing; the total is capped at 40.
fn analyze_vital_signs(vitals: &VitalSigns) -> u32 {
    let mut score = 0u32;

    if let Some(temp) = vitals.get_f64("temperature") {
        if temp >= 103.0 || temp <= 95.0 {
            score += 20;
        } else if temp >= 101.0 || temp <= 96.0 {
            score += 10;
        }
    }

    if let Some(hr) = vitals.get_f64("heart_rate") {
        if hr >= 120.0 || hr <= 50.0 {
            score += 15;
        } else if hr >= 100.0 || hr <= 60.0 {
            score += 8;
        }
    }

    if let Some((systolic, diastolic)) = vitals.blood_pressure() {
        if systolic >= 180 || diastolic >= 120 || systolic <= 90 {
            score += 20;
        } else if systolic >= 140 || diastolic >= 90 || systolic <= 100 {
            score += 10;
        }
    }

    if let Some(spo2) = vitals.get_f64("oxygen_saturation") {
        if spo2 <= 90.0 {
            score += 25;
        } else if spo2 <= 94.0 {
            score += 12;
        }
    }

    if let Some(rr) = vitals.get_f64("respiratory_rate") {
        if rr >= 30.0 || rr <= 10.0 {
            score += 15;
        } else if rr >= 24.0 || rr <= 12.0 {
            score += 8;
        }
    }

    score.min(VITAL_SCORE_CAP)
}

fn score_to_level(score: u32) -> UrgencyLevel {
    if score >= CRITICAL_CUTOFF {
        UrgencyLevel::Critical
    } else if score >= HIGH_CUTOFF {
        UrgencyLevel::High
    } else if score >= MODERATE_CUTOFF {
        UrgencyLevel::Moderate
    } else {
        UrgencyLevel::Low
    }
}

fn assign_priority(level: UrgencyLevel) -> CasePriority {
    match level {
        UrgencyLevel::Critical => CasePriority::Critical,
        UrgencyLevel::High => CasePriority::Urgent,
        UrgencyLevel::Moderate => CasePriority::High,
        UrgencyLevel::Low => CasePriority::Medium,
    }
}

/// Retrieval and diagnosis always run; treatment runs unconditionally for
/// every case (the urgency tier shapes the plan's content, not whether it
/// exists).
fn required_stages() -> Vec<PipelineStage> {
    vec![
        PipelineStage::Retrieval,
        PipelineStage::Diagnosis,
        PipelineStage::Treatment,
    ]
}

fn routing_rationale(level: UrgencyLevel, score: u32, emergencies: &[String]) -> String {
    if !emergencies.is_empty() {
        return format!(
            "CRITICAL urgency: emergency condition detected ({}). Immediate doctor review required.",
            emergencies.join(", ")
        );
    }
    match level {
        UrgencyLevel::Critical => format!(
            "CRITICAL urgency detected (score: {score}). Immediate doctor review required."
        ),
        UrgencyLevel::High => {
            format!("HIGH urgency detected (score: {score}). Doctor review recommended.")
        }
        UrgencyLevel::Moderate => format!(
            "MODERATE urgency detected (score: {score}). Standard workflow with AI assistance."
        ),
        UrgencyLevel::Low => {
            format!("LOW urgency detected (score: {score}). Routine case processing.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> TriageCoordinator {
        TriageCoordinator::new(40)
    }

    #[test]
    fn mild_symptoms_route_low() {
        let case = CaseInput::new("slight runny nose since yesterday");
        let decision = coordinator().route_case(&case);
        assert_eq!(decision.urgency_level, UrgencyLevel::Low);
        assert_eq!(decision.priority, CasePriority::Medium);
        assert!(!decision.needs_escalation);
    }

    /// Cardiac presentation routes CRITICAL with escalation, driven by the
    /// emergency-condition detector rather than the keyword score alone.
    #[test]
    fn cardiac_presentation_routes_critical() {
        let case = CaseInput::new("chest pain, shortness of breath, sweating");
        let decision = coordinator().route_case(&case);
        assert_eq!(decision.priority, CasePriority::Critical);
        assert_eq!(decision.urgency_level, UrgencyLevel::Critical);
        assert!(decision.needs_escalation);
        assert!(decision
            .emergency_conditions
            .contains(&"CARDIAC EMERGENCY".to_string()));
        assert!(decision.red_flags.iter().any(|f| f.category == "cardiac"));
    }

    #[test]
    fn escalation_holds_for_high_and_critical() {
        let coordinator = coordinator();
        for symptoms in [
            "chest pain, shortness of breath, sweating",
            "seizure and confusion, severe headache",
            "high fever, severe pain, vomiting blood, confusion",
        ] {
            let decision = coordinator.route_case(&CaseInput::new(symptoms));
            if decision.urgency_level >= UrgencyLevel::High {
                assert!(
                    decision.needs_escalation,
                    "escalation must hold for {symptoms:?} at {:?}",
                    decision.urgency_level
                );
            }
        }
    }

    #[test]
    fn moderate_with_high_score_escalates() {
        let coordinator = coordinator();
        // Two urgent keywords (30) plus an elevated temperature (10): 40.
        let mut case = CaseInput::new("high fever with blurred vision");
        case.vital_signs.set("temperature", 101.5);
        let decision = coordinator.route_case(&case);
        assert_eq!(decision.urgency_level, UrgencyLevel::Moderate);
        assert_eq!(decision.urgency_score, 40);
        assert!(decision.needs_escalation);
    }

    #[test]
    fn vital_contribution_is_capped() {
        let mut vitals = VitalSigns::new();
        vitals.set("temperature", 104);
        vitals.set("heart_rate", 140);
        vitals.set("blood_pressure", "190/125");
        vitals.set("oxygen_saturation", 82);
        vitals.set("respiratory_rate", 34);
        assert_eq!(analyze_vital_signs(&vitals), 40);
    }

    #[test]
    fn malformed_vitals_are_ignored() {
        let mut vitals = VitalSigns::new();
        vitals.set("temperature", "feverish");
        vitals.set("heart_rate", "fast");
        vitals.set("blood_pressure", "normal-ish");
        assert_eq!(analyze_vital_signs(&vitals), 0);
    }

    #[test]
    fn deranged_vitals_alone_raise_urgency() {
        let mut case = CaseInput::new("feeling generally unwell");
        case.vital_signs.set("heart_rate", 130);
        case.vital_signs.set("respiratory_rate", 32);
        let decision = coordinator().route_case(&case);
        // 15 + 15 = 30: moderate on vitals alone.
        assert_eq!(decision.urgency_level, UrgencyLevel::Moderate);
    }

    #[test]
    fn all_stages_always_required() {
        let decision = coordinator().route_case(&CaseInput::new("sore throat"));
        assert_eq!(
            decision.required_stages,
            vec![
                PipelineStage::Retrieval,
                PipelineStage::Diagnosis,
                PipelineStage::Treatment
            ]
        );
    }

    #[test]
    fn rationale_names_emergency_conditions() {
        let decision = coordinator().route_case(&CaseInput::new("suspected stroke, arm weakness"));
        assert!(decision.rationale.contains("STROKE"));
    }

    #[test]
    fn quick_triage_maps_severity_to_tier() {
        let coordinator = coordinator();
        assert_eq!(coordinator.quick_triage("mild itch"), UrgencyLevel::Low);
        let tier = coordinator.quick_triage(
            "severe crushing chest pain, sudden severe headache, loss of consciousness, \
             difficulty breathing, high fever",
        );
        assert!(tier >= UrgencyLevel::Moderate);
    }

    #[test]
    fn keyword_score_accumulates_per_hit() {
        let coordinator = coordinator();
        let single = coordinator.route_case(&CaseInput::new("severe headache"));
        let double = coordinator.route_case(&CaseInput::new("severe headache and confusion"));
        assert_eq!(single.urgency_score, 15);
        assert_eq!(double.urgency_score, 30);
    }
}
