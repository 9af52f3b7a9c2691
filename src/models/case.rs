use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured vital-sign readings keyed by measurement name
/// (`temperature`, `heart_rate`, `blood_pressure`, `oxygen_saturation`,
/// `respiratory_rate`). Values arrive as JSON numbers or strings; readings
/// that cannot be coerced to the expected shape score as "no contribution"
/// rather than failing the case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VitalSigns(pub BTreeMap<String, serde_json::Value>);

impl VitalSigns {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, name: &str, value: impl Into<serde_json::Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a vital as f64, coercing numeric strings ("98.6").
    /// Missing or malformed values return `None`.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Parse a `"systolic/diastolic"` blood-pressure string (e.g. "120/80").
    pub fn blood_pressure(&self) -> Option<(u32, u32)> {
        let raw = self.0.get("blood_pressure")?;
        let text = raw.as_str()?;
        let (sys, dia) = text.split_once('/')?;
        Some((
            sys.trim().parse::<u32>().ok()?,
            dia.trim().parse::<u32>().ok()?,
        ))
    }

    /// Render readings as "name: value" pairs for prompts and context blocks.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Basic patient demographics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Demographics {
    pub age: Option<u32>,
    pub sex: Option<String>,
}

/// Immutable input for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseInput {
    /// Free-text symptom description. Required, non-empty.
    pub symptoms: String,
    #[serde(default)]
    pub vital_signs: VitalSigns,
    #[serde(default)]
    pub demographics: Option<Demographics>,
    /// Prior medical history, free text.
    #[serde(default)]
    pub history: Option<String>,
    /// Patient-stated allergies, used to filter medication suggestions.
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CaseValidationError {
    #[error("symptom description is required and must be non-empty")]
    EmptySymptoms,
}

impl CaseInput {
    pub fn new(symptoms: impl Into<String>) -> Self {
        Self {
            symptoms: symptoms.into(),
            vital_signs: VitalSigns::new(),
            demographics: None,
            history: None,
            allergies: Vec::new(),
        }
    }

    /// Reject empty input before any stage runs.
    pub fn validate(&self) -> Result<(), CaseValidationError> {
        if self.symptoms.trim().is_empty() {
            return Err(CaseValidationError::EmptySymptoms);
        }
        Ok(())
    }

    /// Comma/semicolon-split symptom phrases, trimmed and non-empty.
    pub fn symptom_list(&self) -> Vec<String> {
        self.symptoms
            .split([',', ';'])
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Serialized history view the rule engine checks risk factors against:
    /// prior-history text plus stated allergies, lowercased.
    pub fn history_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(history) = &self.history {
            parts.push(history.clone());
        }
        if !self.allergies.is_empty() {
            parts.push(format!("allergies: {}", self.allergies.join(", ")));
        }
        parts.join("\n").to_lowercase()
    }

    pub fn age(&self) -> Option<u32> {
        self.demographics.as_ref().and_then(|d| d.age)
    }
}
