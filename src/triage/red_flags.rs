//! Red-flag and emergency-condition detection.
//!
//! Runs on raw symptom text (plus vital thresholds), independent of the
//! rule engine: a presentation the rule table scores low can still carry a
//! red flag. Both outputs feed urgency escalation in the coordinator and
//! the reasoner's final urgency assessment.

use serde::{Deserialize, Serialize};

use crate::models::case::VitalSigns;

/// A symptom phrase associated with a medical emergency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedFlag {
    pub category: String,
    pub flag: String,
    pub severity: String,
    pub action: String,
}

/// Severity tag carried by every detected flag.
const FLAG_SEVERITY: &str = "HIGH";
const FLAG_ACTION: &str = "IMMEDIATE MEDICAL ATTENTION REQUIRED";

/// Vital-sign thresholds that add emergency labels on their own.
const HYPOXEMIA_SPO2_BELOW: f64 = 90.0;
const HYPERTHERMIA_TEMP_ABOVE_F: f64 = 103.0;

static RED_FLAG_TABLES: &[(&str, &[&str])] = &[
    (
        "cardiac",
        &["chest pain", "chest pressure", "crushing pain", "radiating pain to arm"],
    ),
    (
        "neurological",
        &[
            "severe headache",
            "confusion",
            "loss of consciousness",
            "slurred speech",
            "weakness one side",
        ],
    ),
    (
        "respiratory",
        &["severe difficulty breathing", "unable to speak", "blue lips", "gasping"],
    ),
    (
        "abdominal",
        &["severe abdominal pain", "rigid abdomen", "vomiting blood", "blood in stool"],
    ),
    (
        "trauma",
        &["severe bleeding", "compound fracture", "head injury with confusion"],
    ),
    (
        "allergic",
        &[
            "severe allergic reaction",
            "swelling throat",
            "difficulty swallowing",
            "hives with breathing difficulty",
        ],
    ),
];

/// Indicator phrase sets mapped to named emergency conditions.
static EMERGENCY_TABLES: &[(&str, &[&str])] = &[
    (
        "CARDIAC EMERGENCY",
        &["chest pain", "heart attack", "cardiac arrest", "crushing chest pain"],
    ),
    (
        "STROKE",
        &["stroke", "facial drooping", "arm weakness", "speech difficulty"],
    ),
    (
        "RESPIRATORY DISTRESS",
        &["cannot breathe", "severe breathing difficulty", "turning blue"],
    ),
    (
        "SEVERE HEMORRHAGE",
        &["severe bleeding", "uncontrolled bleeding"],
    ),
    (
        "ANAPHYLAXIS",
        &["anaphylaxis", "severe allergic reaction", "throat swelling"],
    ),
];

/// Scan symptom text for category-tagged red-flag phrases.
/// Texts containing none of the fixed phrases return an empty list.
pub fn detect_red_flags(symptoms: &str) -> Vec<RedFlag> {
    let text = symptoms.to_lowercase();
    let mut flags = Vec::new();

    for (category, phrases) in RED_FLAG_TABLES {
        for phrase in *phrases {
            if text.contains(phrase) {
                flags.push(RedFlag {
                    category: category.to_string(),
                    flag: phrase.to_string(),
                    severity: FLAG_SEVERITY.to_string(),
                    action: FLAG_ACTION.to_string(),
                });
            }
        }
    }

    flags
}

/// Detect named emergency conditions from symptom text and vital signs.
pub fn detect_emergency_conditions(symptoms: &str, vitals: &VitalSigns) -> Vec<String> {
    let text = symptoms.to_lowercase();
    let mut emergencies = Vec::new();

    for (label, indicators) in EMERGENCY_TABLES {
        if indicators.iter().any(|phrase| text.contains(phrase)) {
            emergencies.push(label.to_string());
        }
    }

    if let Some(spo2) = vitals.get_f64("oxygen_saturation") {
        if spo2 < HYPOXEMIA_SPO2_BELOW {
            emergencies.push("HYPOXEMIA".to_string());
        }
    }
    if let Some(temp) = vitals.get_f64("temperature") {
        if temp > HYPERTHERMIA_TEMP_ABOVE_F {
            emergencies.push("HYPERTHERMIA".to_string());
        }
    }

    emergencies
}
