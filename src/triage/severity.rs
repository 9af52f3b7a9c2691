//! Symptom severity scoring over weighted clinical keyword categories.
//!
//! Pure function of the symptom text: the same input always produces the
//! same score, and the score is always in `[0, 1]`.

/// One clinical category with its keyword vocabulary and weight.
struct SymptomPattern {
    keywords: &'static [&'static str],
    severity_indicators: &'static [&'static str],
    weight: f32,
}

/// Points per matched keyword / severity indicator.
const KEYWORD_POINTS: f32 = 0.2;
const INDICATOR_POINTS: f32 = 0.3;

static SYMPTOM_PATTERNS: &[SymptomPattern] = &[
    // cardiac
    SymptomPattern {
        keywords: &[
            "chest pain",
            "shortness of breath",
            "palpitations",
            "fatigue",
            "dizziness",
            "sweating",
        ],
        severity_indicators: &["severe", "crushing", "radiating", "sudden onset"],
        weight: 0.8,
    },
    // respiratory
    SymptomPattern {
        keywords: &[
            "cough",
            "shortness of breath",
            "wheezing",
            "chest tightness",
            "sputum",
        ],
        severity_indicators: &["blood", "persistent", "worsening", "fever"],
        weight: 0.7,
    },
    // gastrointestinal
    SymptomPattern {
        keywords: &[
            "nausea",
            "vomiting",
            "diarrhea",
            "abdominal pain",
            "constipation",
            "bloating",
        ],
        severity_indicators: &["blood", "severe", "persistent", "dehydration"],
        weight: 0.6,
    },
    // neurological
    SymptomPattern {
        keywords: &[
            "headache",
            "dizziness",
            "confusion",
            "numbness",
            "weakness",
            "seizure",
        ],
        severity_indicators: &["sudden", "severe", "persistent", "loss of consciousness"],
        weight: 0.8,
    },
    // infectious
    SymptomPattern {
        keywords: &[
            "fever",
            "chills",
            "fatigue",
            "body aches",
            "sore throat",
            "cough",
        ],
        severity_indicators: &[
            "high fever",
            "persistent",
            "worsening",
            "difficulty breathing",
        ],
        weight: 0.5,
    },
];

/// Score overall symptom severity from free text.
///
/// Each category contributes `(0.2 × keyword hits + 0.3 × indicator hits) ×
/// weight`; the weighted sum is normalized by the total weight of the
/// categories that contributed (floored at 1.0 to avoid division by zero)
/// and clamped to `[0, 1]`.
pub fn score_severity(symptoms: &str) -> f32 {
    let text = symptoms.to_lowercase();
    let mut severity = 0.0_f32;
    let mut total_weight = 0.0_f32;

    for pattern in SYMPTOM_PATTERNS {
        let mut category_score = 0.0_f32;

        for keyword in pattern.keywords {
            if text.contains(keyword) {
                category_score += KEYWORD_POINTS;
            }
        }
        for indicator in pattern.severity_indicators {
            if text.contains(indicator) {
                category_score += INDICATOR_POINTS;
            }
        }

        if category_score > 0.0 {
            severity += category_score * pattern.weight;
            total_weight += pattern.weight;
        }
    }

    (severity / total_weight.max(1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(score_severity(""), 0.0);
    }

    #[test]
    fn benign_text_scores_zero() {
        assert_eq!(score_severity("mild itch on left elbow"), 0.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let text = "severe chest pain with shortness of breath and sweating";
        let a = score_severity(text);
        let b = score_severity(text);
        assert_eq!(a, b);
    }

    #[test]
    fn score_is_bounded() {
        // Pile on every keyword and indicator from every category.
        let text = "severe crushing radiating sudden onset chest pain, shortness of breath, \
                    palpitations, fatigue, dizziness, sweating, persistent worsening cough with \
                    blood and sputum, wheezing, chest tightness, nausea, vomiting, diarrhea, \
                    severe abdominal pain, dehydration, sudden severe headache, confusion, \
                    numbness, weakness, seizure, loss of consciousness, high fever, chills, \
                    body aches, sore throat, difficulty breathing";
        let score = score_severity(text);
        assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
    }

    #[test]
    fn severity_indicators_raise_score() {
        let plain = score_severity("chest pain");
        let severe = score_severity("severe crushing chest pain");
        assert!(severe > plain);
    }

    #[test]
    fn single_category_normalizes_by_own_weight() {
        // One cardiac keyword: 0.2 * 0.8 / 1.0 (floor) = 0.16
        let score = score_severity("chest pain");
        assert!((score - 0.16).abs() < 1e-6, "got {score}");
    }
}
