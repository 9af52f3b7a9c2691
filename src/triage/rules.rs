use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::{DiagnosisOrigin, UrgencyLevel};

// ---------------------------------------------------------------------------
// ConditionRule & ConditionTable
// ---------------------------------------------------------------------------

/// Diagnostic criteria for one named condition. Read-only reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRule {
    pub condition: String,
    /// At least one required phrase must match (word-level OR) for the
    /// rule to be considered at all.
    pub required_symptoms: Vec<String>,
    pub supporting_symptoms: Vec<String>,
    pub risk_factors: Vec<String>,
    pub urgency: UrgencyLevel,
    /// Additive prior reflecting clinical prevalence/specificity.
    pub confidence_boost: f32,
}

/// Loaded condition reference table.
pub struct ConditionTable {
    pub rules: Vec<ConditionRule>,
}

#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("Rule table load failed ({0}): {1}")]
    Load(String, String),

    #[error("Rule table parse failed ({0}): {1}")]
    Parse(String, String),
}

impl ConditionTable {
    /// Load a condition table from a JSON file (array of rules).
    pub fn load(path: &std::path::Path) -> Result<Self, RuleTableError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RuleTableError::Load(path.display().to_string(), e.to_string()))?;
        let rules: Vec<ConditionRule> = serde_json::from_str(&json)
            .map_err(|e| RuleTableError::Parse(path.display().to_string(), e.to_string()))?;
        Ok(Self { rules })
    }

    /// The bundled clinical rule set covering cardiovascular, infectious,
    /// respiratory, gastrointestinal, pediatric, metabolic, neurological,
    /// and other common presentations.
    pub fn builtin() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }
}

fn rule(
    condition: &str,
    required: &[&str],
    supporting: &[&str],
    risks: &[&str],
    urgency: UrgencyLevel,
    boost: f32,
) -> ConditionRule {
    ConditionRule {
        condition: condition.to_string(),
        required_symptoms: required.iter().map(|s| s.to_string()).collect(),
        supporting_symptoms: supporting.iter().map(|s| s.to_string()).collect(),
        risk_factors: risks.iter().map(|s| s.to_string()).collect(),
        urgency,
        confidence_boost: boost,
    }
}

fn builtin_rules() -> Vec<ConditionRule> {
    use UrgencyLevel::{Critical, High, Low, Moderate};

    vec![
        // Cardiovascular
        rule(
            "Acute Coronary Syndrome",
            &["chest pain"],
            &["shortness of breath", "sweating", "nausea", "radiating pain"],
            &["diabetes", "hypertension", "smoking", "family history"],
            Critical,
            0.3,
        ),
        rule(
            "Hypertensive Crisis",
            &["headache", "high blood pressure"],
            &["dizziness", "chest pain", "shortness of breath", "blurred vision"],
            &["hypertension", "medication non-compliance"],
            Critical,
            0.25,
        ),
        // Infectious diseases common in Sub-Saharan Africa
        rule(
            "Malaria",
            &["fever", "chills"],
            &["headache", "body aches", "sweating", "nausea", "vomiting", "fatigue"],
            &["endemic area", "travel", "no prophylaxis", "mosquito exposure"],
            High,
            0.25,
        ),
        rule(
            "Typhoid Fever",
            &["fever", "headache"],
            &["abdominal pain", "weakness", "loss of appetite", "constipation", "diarrhea"],
            &["poor sanitation", "contaminated food", "contaminated water"],
            High,
            0.2,
        ),
        rule(
            "Tuberculosis",
            &["cough", "fever"],
            &["night sweats", "weight loss", "fatigue", "chest pain", "blood in sputum"],
            &["hiv", "immunocompromised", "contact with tb", "crowded living"],
            High,
            0.2,
        ),
        rule(
            "HIV-Related Illness",
            &["fever", "weight loss"],
            &["diarrhea", "cough", "fatigue", "night sweats", "enlarged lymph nodes"],
            &["hiv positive", "immunosuppressed", "opportunistic infections"],
            High,
            0.2,
        ),
        rule(
            "Acute Febrile Illness",
            &["fever"],
            &["headache", "body aches", "fatigue", "chills", "weakness", "sweating"],
            &["recent infection", "exposure", "travel", "season"],
            Moderate,
            0.2,
        ),
        // Respiratory
        rule(
            "Pneumonia",
            &["cough", "fever"],
            &["shortness of breath", "chest pain", "sputum", "difficulty breathing"],
            &["age > 65", "immunocompromised", "chronic disease", "smoking"],
            High,
            0.2,
        ),
        rule(
            "Upper Respiratory Infection",
            &["cough"],
            &["fever", "sore throat", "runny nose", "congestion", "fatigue", "headache"],
            &["recent exposure", "season", "school", "daycare"],
            Low,
            0.15,
        ),
        rule(
            "Bronchitis",
            &["cough"],
            &["sputum", "chest discomfort", "fever", "fatigue", "shortness of breath"],
            &["smoking", "recent infection", "season"],
            Moderate,
            0.15,
        ),
        rule(
            "Asthma Exacerbation",
            &["shortness of breath", "wheezing"],
            &["cough", "chest tightness", "difficulty breathing", "anxiety"],
            &["asthma history", "allergies", "triggers", "season"],
            High,
            0.2,
        ),
        // Gastrointestinal
        rule(
            "Gastroenteritis",
            &["diarrhea"],
            &["nausea", "vomiting", "abdominal pain", "fever", "dehydration"],
            &["recent travel", "food poisoning", "contact", "contaminated water"],
            Moderate,
            0.15,
        ),
        rule(
            "Appendicitis",
            &["abdominal pain"],
            &["nausea", "vomiting", "fever", "loss of appetite", "right lower quadrant pain"],
            &["age > 65", "sudden onset"],
            Critical,
            0.2,
        ),
        rule(
            "Peptic Ulcer",
            &["abdominal pain"],
            &["nausea", "vomiting", "bloating", "heartburn", "blood in stool"],
            &["h pylori", "nsaid use", "stress", "smoking"],
            Moderate,
            0.15,
        ),
        // Pediatric
        rule(
            "Measles",
            &["fever", "rash"],
            &["cough", "runny nose", "red eyes", "white spots in mouth"],
            &["unvaccinated", "exposure", "outbreak"],
            High,
            0.2,
        ),
        rule(
            "Chickenpox",
            &["rash", "fever"],
            &["itching", "blisters", "fatigue", "loss of appetite"],
            &["unvaccinated", "exposure", "school age"],
            Moderate,
            0.2,
        ),
        rule(
            "Acute Diarrheal Disease",
            &["diarrhea"],
            &["vomiting", "fever", "abdominal cramps", "dehydration"],
            &["children", "contaminated water", "poor sanitation"],
            Moderate,
            0.15,
        ),
        rule(
            "Malnutrition",
            &["weight loss", "weakness"],
            &["fatigue", "edema", "hair loss", "skin changes", "irritability"],
            &["poverty", "food insecurity", "chronic disease"],
            High,
            0.15,
        ),
        // Metabolic / endocrine
        rule(
            "Diabetes Mellitus",
            &["excessive thirst", "frequent urination"],
            &["weight loss", "fatigue", "blurred vision", "hunger"],
            &["family history", "obesity", "sedentary lifestyle"],
            Moderate,
            0.2,
        ),
        rule(
            "Diabetic Ketoacidosis",
            &["nausea", "vomiting", "abdominal pain"],
            &["confusion", "rapid breathing", "fruity breath", "excessive thirst"],
            &["diabetes", "infection", "medication non-compliance"],
            Critical,
            0.25,
        ),
        // Neurological
        rule(
            "Migraine",
            &["headache"],
            &["nausea", "light sensitivity", "sound sensitivity", "visual disturbances"],
            &["family history", "stress", "hormonal changes", "triggers"],
            Low,
            0.1,
        ),
        rule(
            "Meningitis",
            &["severe headache", "fever", "neck stiffness"],
            &["confusion", "sensitivity to light", "nausea", "vomiting"],
            &["recent infection", "immunocompromised", "close contact"],
            Critical,
            0.3,
        ),
        rule(
            "Stroke",
            &["weakness", "confusion"],
            &["slurred speech", "facial drooping", "numbness", "vision changes"],
            &["hypertension", "diabetes", "smoking", "age > 65"],
            Critical,
            0.3,
        ),
        rule(
            "Seizure Disorder",
            &["seizure"],
            &["loss of consciousness", "confusion", "muscle spasms", "headache"],
            &["epilepsy", "head injury", "fever", "medication"],
            High,
            0.2,
        ),
        // Other common conditions
        rule(
            "Anemia",
            &["fatigue", "weakness"],
            &["pale skin", "dizziness", "shortness of breath", "cold hands"],
            &["poor nutrition", "bleeding", "chronic disease", "pregnancy"],
            Moderate,
            0.15,
        ),
        rule(
            "Urinary Tract Infection",
            &["frequent urination", "burning sensation"],
            &["cloudy urine", "blood in urine", "pelvic pain", "fever"],
            &["female", "sexual activity", "poor hygiene"],
            Moderate,
            0.15,
        ),
        rule(
            "Coeliac Disease",
            &["abdominal pain", "diarrhea"],
            &["bloating", "weight loss", "fatigue", "nausea", "constipation"],
            &["family history", "gluten exposure", "autoimmune"],
            Low,
            0.15,
        ),
        rule(
            "Dehydration",
            &["thirst", "dry mouth"],
            &["dizziness", "weakness", "dark urine", "fatigue", "confusion"],
            &["diarrhea", "vomiting", "fever", "excessive sweating"],
            Moderate,
            0.15,
        ),
    ]
}

// ---------------------------------------------------------------------------
// CandidateDiagnosis
// ---------------------------------------------------------------------------

/// One ranked entry in the differential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateDiagnosis {
    pub condition: String,
    /// Always in `[0, 1]`.
    pub confidence: f32,
    pub urgency: UrgencyLevel,
    pub supporting_symptoms_matched: usize,
    pub risk_factors_matched: usize,
    pub origin: DiagnosisOrigin,
    /// Set when the text-generation backend independently named this
    /// condition as its primary diagnosis.
    pub ai_confirmed: bool,
}

// ---------------------------------------------------------------------------
// ConditionRuleEngine
// ---------------------------------------------------------------------------

/// Matches free-text symptoms and patient history against the condition
/// table and scores candidates.
pub struct ConditionRuleEngine {
    table: ConditionTable,
    confidence_threshold: f32,
    max_diagnoses: usize,
}

/// Confidence weights: required symptoms carry the most signal, then
/// supporting symptoms, then risk factors.
const REQUIRED_WEIGHT: f32 = 0.4;
const SUPPORTING_WEIGHT: f32 = 0.3;
const RISK_WEIGHT: f32 = 0.2;

impl ConditionRuleEngine {
    pub fn new(table: ConditionTable, confidence_threshold: f32, max_diagnoses: usize) -> Self {
        Self {
            table,
            confidence_threshold,
            max_diagnoses,
        }
    }

    pub fn with_builtin_rules(confidence_threshold: f32, max_diagnoses: usize) -> Self {
        Self::new(ConditionTable::builtin(), confidence_threshold, max_diagnoses)
    }

    /// Match conditions against symptom text and history.
    ///
    /// Required phrases use word-level OR matching: "high fever" in the
    /// text satisfies a required phrase "fever". Candidates below the
    /// confidence threshold are dropped; survivors are ranked descending
    /// by confidence with ties kept in table order, capped at
    /// `max_diagnoses`.
    pub fn match_conditions(
        &self,
        symptoms: &str,
        history_text: &str,
        age: Option<u32>,
    ) -> Vec<CandidateDiagnosis> {
        let text = symptoms.to_lowercase();
        let mut matched = Vec::new();

        for rule in &self.table.rules {
            let required_count = rule
                .required_symptoms
                .iter()
                .filter(|phrase| phrase_words_match(phrase, &text))
                .count();
            if required_count == 0 {
                continue;
            }

            let supporting_count = rule
                .supporting_symptoms
                .iter()
                .filter(|phrase| phrase_words_match(phrase, &text))
                .count();

            let risk_count = rule
                .risk_factors
                .iter()
                .filter(|factor| risk_factor_present(factor, history_text, age))
                .count();

            let required_ratio = required_count as f32 / rule.required_symptoms.len() as f32;
            let supporting_ratio = if rule.supporting_symptoms.is_empty() {
                0.0
            } else {
                supporting_count as f32 / rule.supporting_symptoms.len() as f32
            };
            let risk_ratio = if rule.risk_factors.is_empty() {
                0.0
            } else {
                risk_count as f32 / rule.risk_factors.len() as f32
            };

            let confidence = (REQUIRED_WEIGHT * required_ratio
                + SUPPORTING_WEIGHT * supporting_ratio
                + RISK_WEIGHT * risk_ratio
                + rule.confidence_boost)
                .clamp(0.0, 1.0);

            if confidence >= self.confidence_threshold {
                matched.push(CandidateDiagnosis {
                    condition: rule.condition.clone(),
                    confidence,
                    urgency: rule.urgency,
                    supporting_symptoms_matched: supporting_count,
                    risk_factors_matched: risk_count,
                    origin: DiagnosisOrigin::RuleBased,
                    ai_confirmed: false,
                });
            }
        }

        // Stable sort keeps table order for equal confidences.
        matched.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matched.truncate(self.max_diagnoses);
        matched
    }
}

/// Word-level OR match: does any constituent word of the phrase appear in
/// the lowercased text?
fn phrase_words_match(phrase: &str, text: &str) -> bool {
    phrase
        .to_lowercase()
        .split_whitespace()
        .any(|word| text.contains(word))
}

/// Keyword expansions for risk factors that appear under several spellings
/// in history text.
static RISK_KEYWORD_MAP: &[(&str, &[&str])] = &[
    ("diabetes", &["diabetes", "diabetic"]),
    ("hypertension", &["hypertension", "high blood pressure"]),
    ("smoking", &["smoking", "smoker", "tobacco"]),
    ("family history", &["family history", "hereditary"]),
    ("immunocompromised", &["immunocompromised", "immune deficiency"]),
    ("chronic disease", &["chronic", "long-term condition"]),
];

/// Check one risk-factor phrase against the serialized history text.
/// `age > 65` is the single numeric rule, checked against demographics;
/// factors outside the fixed mapping never match.
fn risk_factor_present(factor: &str, history_text: &str, age: Option<u32>) -> bool {
    if factor == "age > 65" {
        return age.is_some_and(|a| a > 65);
    }
    for (key, keywords) in RISK_KEYWORD_MAP {
        if *key == factor {
            return keywords.iter().any(|kw| history_text.contains(kw));
        }
    }
    false
}
