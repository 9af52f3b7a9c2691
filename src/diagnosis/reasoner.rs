use crate::models::case::CaseInput;
use crate::models::enums::{DiagnosisOrigin, UrgencyAssessment, UrgencyLevel};
use crate::retrieval::types::RetrievalBundle;
use crate::triage::coordinator::RoutingDecision;
use crate::triage::rules::CandidateDiagnosis;
use crate::triage::severity::score_severity;

use super::ollama::TextGenerationBackend;
use super::parser::parse_ai_response;
use super::prompt::build_diagnosis_prompt;
use super::types::{AiDiagnosis, DiagnosisReport};

/// Placeholder primary when neither the rule table nor the backend
/// produced anything usable. The report is never empty.
const UNDETERMINED_DIAGNOSIS: &str = "Unable to determine specific diagnosis";
const UNDETERMINED_CONFIDENCE: f32 = 0.3;
const UNDETERMINED_REASONING: &str =
    "Symptoms do not match clear diagnostic patterns. Further evaluation recommended.";

/// Confidence boost applied when the backend independently names the top
/// rule-based condition, and its cap.
const AGREEMENT_BOOST: f32 = 0.2;
const AGREEMENT_CAP: f32 = 0.98;

/// Red flags add uncertainty to the overall call.
const RED_FLAG_CONFIDENCE_FACTOR: f32 = 0.9;

const MAX_AI_DIFFERENTIALS: usize = 3;
const MAX_RECOMMENDED_TESTS: usize = 5;

/// Fuses rule-engine candidates, red flags, retrieved context, and the
/// optional text-generation backend into one [`DiagnosisReport`].
pub struct DiagnosisReasoner<'a> {
    backend: Option<&'a dyn TextGenerationBackend>,
}

impl<'a> DiagnosisReasoner<'a> {
    pub fn new(backend: Option<&'a dyn TextGenerationBackend>) -> Self {
        Self { backend }
    }

    /// Produce the diagnosis report for one case.
    pub fn analyze(
        &self,
        case: &CaseInput,
        routing: &RoutingDecision,
        candidates: Vec<CandidateDiagnosis>,
        bundle: &RetrievalBundle,
    ) -> DiagnosisReport {
        let severity_score = score_severity(&case.symptoms);
        let ai = self.query_backend(case, bundle);

        let mut differential = candidates;

        // Agreement between the backend and the top rule candidate raises
        // its confidence and marks it confirmed.
        if let Some(primary) = ai.as_ref().and_then(|ai| ai.primary_diagnosis.as_deref()) {
            if let Some(top) = differential.first_mut() {
                if primary.to_lowercase().contains(&top.condition.to_lowercase()) {
                    top.confidence = (top.confidence + AGREEMENT_BOOST).min(AGREEMENT_CAP);
                    top.ai_confirmed = true;
                }
            }
        }

        // Merge AI-suggested differentials the rule table did not already
        // surface.
        if let Some(ai) = &ai {
            for suggestion in ai.differential_diagnoses.iter().take(MAX_AI_DIFFERENTIALS) {
                let already_listed = differential
                    .iter()
                    .any(|c| c.condition.eq_ignore_ascii_case(&suggestion.condition));
                if !already_listed {
                    differential.push(CandidateDiagnosis {
                        condition: suggestion.condition.clone(),
                        confidence: suggestion.confidence.clamp(0.0, 1.0),
                        urgency: UrgencyLevel::Moderate,
                        supporting_symptoms_matched: 0,
                        risk_factors_matched: 0,
                        origin: DiagnosisOrigin::AiSuggested,
                        ai_confirmed: false,
                    });
                }
            }
        }

        differential.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let (primary_diagnosis, explanation, reasoning, base_confidence, ai_diagnosis) =
            primary_from(&ai, &differential, bundle);

        let confidence = if routing.red_flags.is_empty() {
            base_confidence
        } else {
            base_confidence * RED_FLAG_CONFIDENCE_FACTOR
        }
        .clamp(0.0, 1.0);

        let urgency_assessment = assess_urgency(routing);

        let report = DiagnosisReport {
            recommended_tests: recommend_tests(&differential),
            recommendations: clinical_recommendations(
                routing.urgency_level,
                &primary_diagnosis,
            ),
            primary_diagnosis,
            explanation,
            reasoning,
            differential,
            red_flags: routing.red_flags.clone(),
            emergency_conditions: routing.emergency_conditions.clone(),
            confidence,
            urgency_assessment,
            severity_score,
            ai_diagnosis,
        };

        tracing::info!(
            primary = %report.primary_diagnosis,
            confidence = report.confidence,
            urgency = report.urgency_assessment.as_str(),
            differential = report.differential.len(),
            ai_used = report.ai_diagnosis.is_some(),
            "Diagnosis analysis complete"
        );

        report
    }

    /// Call the backend if one is configured; any failure degrades to no
    /// AI contribution.
    fn query_backend(&self, case: &CaseInput, bundle: &RetrievalBundle) -> Option<AiDiagnosis> {
        let backend = self.backend?;
        let prompt = build_diagnosis_prompt(case, &bundle.chunks);

        let response = match backend.generate(&prompt) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "Text generation failed, continuing without AI diagnosis");
                return None;
            }
        };

        match parse_ai_response(&response) {
            Ok(ai) => Some(ai),
            Err(err) => {
                tracing::warn!(error = %err, "Unparseable AI response, continuing without AI diagnosis");
                None
            }
        }
    }
}

/// Pick the primary diagnosis: AI first, then top rule candidate, then the
/// explicit placeholder.
fn primary_from(
    ai: &Option<AiDiagnosis>,
    differential: &[CandidateDiagnosis],
    bundle: &RetrievalBundle,
) -> (String, String, String, f32, Option<String>) {
    if let Some(ai) = ai {
        if let Some(primary) = &ai.primary_diagnosis {
            let reasoning = ai
                .reasoning
                .clone()
                .unwrap_or_else(|| "AI diagnosis generated from symptom analysis.".to_string());
            return (
                primary.clone(),
                ai.explanation.clone().unwrap_or_default(),
                reasoning,
                ai.confidence.unwrap_or(0.6),
                Some(primary.clone()),
            );
        }
    }

    if let Some(top) = differential
        .iter()
        .find(|c| c.origin == DiagnosisOrigin::RuleBased)
    {
        let reasoning = format!(
            "Based on symptom analysis and medical guidelines. Analysis used {} medical references.",
            bundle.total_found
        );
        return (
            top.condition.clone(),
            String::new(),
            reasoning,
            top.confidence,
            None,
        );
    }

    (
        UNDETERMINED_DIAGNOSIS.to_string(),
        String::new(),
        UNDETERMINED_REASONING.to_string(),
        UNDETERMINED_CONFIDENCE,
        None,
    )
}

/// Final urgency call: emergency conditions dominate, then red flags.
fn assess_urgency(routing: &RoutingDecision) -> UrgencyAssessment {
    if !routing.emergency_conditions.is_empty() {
        UrgencyAssessment::Critical
    } else if !routing.red_flags.is_empty() {
        UrgencyAssessment::High
    } else {
        UrgencyAssessment::Routine
    }
}

/// Keyword categories mapping differential names to diagnostic tests.
static TEST_CATEGORIES: &[(&[&str], &[&str])] = &[
    (
        &["infection", "fever", "malaria", "typhoid", "sepsis"],
        &["Complete Blood Count (CBC)", "Blood Culture"],
    ),
    (
        &["cardiac", "heart", "coronary", "hypertensive"],
        &["Electrocardiogram (ECG)", "Cardiac Enzymes (Troponin)", "Chest X-ray"],
    ),
    (
        &["respiratory", "pneumonia", "asthma", "bronchitis", "tuberculosis"],
        &["Chest X-ray", "Pulse Oximetry"],
    ),
    (
        &["gastro", "diarrhea", "ulcer", "appendicitis"],
        &["Stool Analysis", "Electrolyte Panel"],
    ),
    (
        &["stroke", "meningitis", "seizure", "neurological"],
        &["CT Head", "Neurological Examination"],
    ),
    (
        &["urinary", "kidney", "cystitis"],
        &["Urinalysis", "Urine Culture"],
    ),
];

/// Derive test recommendations from the top three differential names.
fn recommend_tests(differential: &[CandidateDiagnosis]) -> Vec<String> {
    let mut tests = Vec::new();

    for candidate in differential.iter().take(3) {
        let name = candidate.condition.to_lowercase();
        for (keywords, category_tests) in TEST_CATEGORIES {
            if keywords.iter().any(|kw| name.contains(kw)) {
                for test in *category_tests {
                    if !tests.contains(&test.to_string()) {
                        tests.push(test.to_string());
                    }
                }
            }
        }
    }

    tests.truncate(MAX_RECOMMENDED_TESTS);
    tests
}

/// Tiered clinical recommendations plus diagnosis-specific additions.
fn clinical_recommendations(urgency: UrgencyLevel, primary: &str) -> Vec<String> {
    let mut recommendations: Vec<String> = match urgency {
        UrgencyLevel::Critical => vec![
            "Seek immediate emergency medical attention".into(),
            "Consider calling emergency services or visiting emergency department".into(),
            "Monitor vital signs closely".into(),
        ],
        UrgencyLevel::High => vec![
            "Schedule urgent appointment with healthcare provider".into(),
            "Monitor symptoms closely for any worsening".into(),
            "Consider same-day medical evaluation".into(),
        ],
        UrgencyLevel::Moderate => vec![
            "Schedule appointment with primary care provider within 24-48 hours".into(),
            "Monitor symptoms and document any changes".into(),
            "Consider symptomatic treatment as appropriate".into(),
        ],
        UrgencyLevel::Low => vec![
            "Monitor symptoms and consider routine medical follow-up".into(),
            "Maintain symptom diary".into(),
            "Schedule routine appointment if symptoms persist".into(),
        ],
    };

    let primary_lower = primary.to_lowercase();
    if primary_lower.contains("cardiac") || primary_lower.contains("heart") {
        recommendations.push("Consider ECG and cardiac enzymes".into());
    } else if primary_lower.contains("respiratory") || primary_lower.contains("pneumonia") {
        recommendations.push("Consider chest X-ray and oxygen saturation monitoring".into());
    } else if primary_lower.contains("infection") {
        recommendations.push("Consider complete blood count and cultures".into());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::ollama::MockGenerationBackend;
    use crate::models::case::VitalSigns;
    use crate::triage::coordinator::TriageCoordinator;
    use crate::triage::rules::ConditionRuleEngine;

    fn empty_bundle() -> RetrievalBundle {
        RetrievalBundle {
            query: "test".into(),
            chunks: Vec::new(),
            total_found: 0,
            sources: Vec::new(),
            knowledge_base_used: true,
            cardiac_protocol: None,
            error: None,
        }
    }

    fn analyze_case(
        symptoms: &str,
        vitals: VitalSigns,
        backend: Option<&dyn TextGenerationBackend>,
    ) -> DiagnosisReport {
        let mut case = CaseInput::new(symptoms);
        case.vital_signs = vitals;
        let routing = TriageCoordinator::new(40).route_case(&case);
        let candidates = ConditionRuleEngine::with_builtin_rules(0.4, 3).match_conditions(
            &case.symptoms,
            &case.history_text(),
            case.age(),
        );
        DiagnosisReasoner::new(backend).analyze(&case, &routing, candidates, &empty_bundle())
    }

    #[test]
    fn falls_back_to_rules_without_backend() {
        let report = analyze_case("high fever, chills and headache", VitalSigns::new(), None);
        assert_ne!(report.primary_diagnosis, UNDETERMINED_DIAGNOSIS);
        assert!(report.ai_diagnosis.is_none());
        assert!(report.confidence > 0.0);
    }

    #[test]
    fn falls_back_to_placeholder_when_nothing_matches() {
        let report = analyze_case("strange tingling in left earlobe", VitalSigns::new(), None);
        assert_eq!(report.primary_diagnosis, UNDETERMINED_DIAGNOSIS);
        assert!((report.confidence - UNDETERMINED_CONFIDENCE).abs() < 1e-6);
        assert_eq!(report.urgency_assessment, UrgencyAssessment::Routine);
    }

    #[test]
    fn backend_failure_degrades_to_rule_diagnosis() {
        let backend = MockGenerationBackend::failing("connection refused");
        let report = analyze_case(
            "high fever, chills and headache",
            VitalSigns::new(),
            Some(&backend),
        );
        assert!(report.ai_diagnosis.is_none());
        assert_ne!(report.primary_diagnosis, UNDETERMINED_DIAGNOSIS);
    }

    #[test]
    fn ai_primary_adopted_when_backend_succeeds() {
        let backend = MockGenerationBackend::with_response(
            r#"{"primary_diagnosis": "Dengue Fever",
                "diagnosis_explanation": "A mosquito-borne viral infection.",
                "confidence_score": 80,
                "reasoning": "Fever pattern with endemic exposure."}"#,
        );
        let report = analyze_case("high fever and chills", VitalSigns::new(), Some(&backend));
        assert_eq!(report.primary_diagnosis, "Dengue Fever");
        assert_eq!(report.ai_diagnosis.as_deref(), Some("Dengue Fever"));
        assert!((report.confidence - 0.8).abs() < 1e-6);
        assert_eq!(report.explanation, "A mosquito-borne viral infection.");
    }

    #[test]
    fn agreement_boosts_and_confirms_top_candidate() {
        let backend = MockGenerationBackend::with_response(
            r#"{"primary_diagnosis": "Malaria (Plasmodium falciparum)", "confidence_score": 90}"#,
        );
        let report = analyze_case("high fever and chills", VitalSigns::new(), Some(&backend));

        let malaria = report
            .differential
            .iter()
            .find(|c| c.condition == "Malaria")
            .expect("rule-based malaria candidate");
        assert!(malaria.ai_confirmed);
        // 0.65 rule score + 0.2 agreement boost.
        assert!((malaria.confidence - 0.85).abs() < 1e-3);
    }

    #[test]
    fn agreement_boost_caps_at_098() {
        let backend = MockGenerationBackend::with_response(
            r#"{"primary_diagnosis": "Acute Coronary Syndrome", "confidence_score": 95}"#,
        );
        let report = analyze_case(
            "crushing chest pain radiating pain, sweating, nausea, shortness of breath",
            VitalSigns::new(),
            Some(&backend),
        );
        let acs = report
            .differential
            .iter()
            .find(|c| c.condition == "Acute Coronary Syndrome")
            .unwrap();
        assert!(acs.ai_confirmed);
        assert!(acs.confidence <= AGREEMENT_CAP + 1e-6);
    }

    #[test]
    fn ai_differentials_merged_and_tagged() {
        let backend = MockGenerationBackend::with_response(
            r#"{"primary_diagnosis": "Malaria",
                "differential_diagnoses": ["Dengue Fever", "Malaria", "Typhoid Fever"],
                "confidence_score": 70}"#,
        );
        let report = analyze_case("high fever and chills", VitalSigns::new(), Some(&backend));

        let dengue = report
            .differential
            .iter()
            .find(|c| c.condition == "Dengue Fever")
            .expect("AI-suggested differential merged");
        assert_eq!(dengue.origin, DiagnosisOrigin::AiSuggested);
        // "Malaria" already present from the rule table: not duplicated.
        let malaria_count = report
            .differential
            .iter()
            .filter(|c| c.condition.eq_ignore_ascii_case("malaria"))
            .count();
        assert_eq!(malaria_count, 1);
    }

    #[test]
    fn emergency_conditions_force_critical_assessment() {
        let mut vitals = VitalSigns::new();
        vitals.set("oxygen_saturation", 85);
        let report = analyze_case("feeling a bit dizzy", vitals, None);
        assert!(report
            .emergency_conditions
            .contains(&"HYPOXEMIA".to_string()));
        assert_eq!(report.urgency_assessment, UrgencyAssessment::Critical);
    }

    #[test]
    fn red_flags_without_emergency_assess_high() {
        let report = analyze_case(
            "rigid abdomen with severe abdominal pain",
            VitalSigns::new(),
            None,
        );
        assert!(!report.red_flags.is_empty());
        assert!(report.emergency_conditions.is_empty());
        assert_eq!(report.urgency_assessment, UrgencyAssessment::High);
    }

    #[test]
    fn red_flags_reduce_confidence() {
        let calm = analyze_case("high fever, chills and headache", VitalSigns::new(), None);
        let flagged = analyze_case(
            "high fever, chills, headache and severe headache",
            VitalSigns::new(),
            None,
        );
        assert!(!flagged.red_flags.is_empty());
        assert!(flagged.confidence <= calm.confidence);
    }

    #[test]
    fn tests_derived_from_differential_keywords() {
        let report = analyze_case("high fever and chills", VitalSigns::new(), None);
        assert!(report
            .recommended_tests
            .contains(&"Complete Blood Count (CBC)".to_string()));
        assert!(report.recommended_tests.len() <= MAX_RECOMMENDED_TESTS);
    }

    #[test]
    fn report_serializes_and_round_trips() {
        let report = analyze_case("high fever, chills and headache", VitalSigns::new(), None);
        let json = serde_json::to_string(&report).unwrap();
        let parsed: DiagnosisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
