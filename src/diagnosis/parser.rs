use serde::Deserialize;
use serde_json::Value;

use super::types::{AiDiagnosis, AiDifferential};
use super::GenerationError;

/// Default confidence for AI differentials that arrive without one.
const DEFAULT_DIFFERENTIAL_CONFIDENCE: f32 = 0.5;

/// Parse the backend's response into a structured [`AiDiagnosis`].
///
/// The model is asked for JSON but not trusted to deliver it cleanly:
/// fenced code blocks are unwrapped, unknown shapes inside list fields are
/// skipped rather than failing the whole response, and the 0-100
/// confidence scale is normalized to `[0, 1]`.
pub fn parse_ai_response(response: &str) -> Result<AiDiagnosis, GenerationError> {
    let json_str = extract_json(response)?;

    #[derive(Deserialize)]
    struct RawResponse {
        primary_diagnosis: Option<String>,
        diagnosis_explanation: Option<String>,
        reasoning: Option<String>,
        confidence_score: Option<Value>,
        differential_diagnoses: Option<Value>,
        treatment_plan: Option<Value>,
        red_flags: Option<Value>,
        follow_up_recommendations: Option<Value>,
    }

    let raw: RawResponse = serde_json::from_str(&json_str)
        .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

    Ok(AiDiagnosis {
        primary_diagnosis: raw.primary_diagnosis.filter(|s| !s.trim().is_empty()),
        explanation: raw.diagnosis_explanation.filter(|s| !s.trim().is_empty()),
        reasoning: raw.reasoning.filter(|s| !s.trim().is_empty()),
        confidence: raw.confidence_score.as_ref().and_then(normalize_confidence),
        differential_diagnoses: parse_differentials(raw.differential_diagnoses.as_ref()),
        treatment_plan: parse_string_list(raw.treatment_plan.as_ref()),
        red_flags: parse_string_list(raw.red_flags.as_ref()),
        follow_up_recommendations: parse_string_list(raw.follow_up_recommendations.as_ref()),
    })
}

/// Accept either a bare JSON object or one wrapped in a ```json fence.
fn extract_json(response: &str) -> Result<String, GenerationError> {
    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    let fence_start = trimmed
        .find("```json")
        .map(|idx| idx + 7)
        .or_else(|| trimmed.find("```").map(|idx| idx + 3))
        .ok_or_else(|| GenerationError::ResponseParsing("No JSON found in response".into()))?;

    let fence_end = trimmed[fence_start..]
        .find("```")
        .ok_or_else(|| GenerationError::ResponseParsing("Unclosed JSON block".into()))?;

    Ok(trimmed[fence_start..fence_start + fence_end].trim().to_string())
}

/// Normalize a 0-100 confidence (number or numeric string) to `[0, 1]`.
/// Values already at or below 1.0 are taken as-is.
fn normalize_confidence(value: &Value) -> Option<f32> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    let normalized = if score > 1.0 { score / 100.0 } else { score };
    Some(normalized.clamp(0.0, 1.0) as f32)
}

/// Differentials may arrive as strings or as objects with a condition and
/// an optional confidence; anything else is skipped.
fn parse_differentials(value: Option<&Value>) -> Vec<AiDifferential> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(condition) if !condition.trim().is_empty() => Some(AiDifferential {
                condition: condition.trim().to_string(),
                confidence: DEFAULT_DIFFERENTIAL_CONFIDENCE,
            }),
            Value::Object(map) => {
                let condition = map
                    .get("condition")
                    .or_else(|| map.get("name"))
                    .and_then(|v| v.as_str())?
                    .trim()
                    .to_string();
                if condition.is_empty() {
                    return None;
                }
                let confidence = map
                    .get("confidence")
                    .and_then(normalize_confidence)
                    .unwrap_or(DEFAULT_DIFFERENTIAL_CONFIDENCE);
                Some(AiDifferential {
                    condition,
                    confidence,
                })
            }
            _ => None,
        })
        .collect()
}

/// A list field may arrive as a single string or an array of strings.
fn parse_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
