use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UrgencyLevel
// ---------------------------------------------------------------------------

/// Clinical urgency tier of a case. Governs escalation and how aggressive
/// the treatment timeline is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CasePriority
// ---------------------------------------------------------------------------

/// Queue priority assigned to a routed case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CasePriority {
    Low,
    Medium,
    High,
    Urgent,
    Critical,
}

impl CasePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
            Self::Critical => "CRITICAL",
        }
    }
}

// ---------------------------------------------------------------------------
// UrgencyAssessment
// ---------------------------------------------------------------------------

/// Post-diagnosis urgency call made by the reasoner: driven by emergency
/// conditions and red flags, not by the rule engine's confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyAssessment {
    Critical,
    High,
    Routine,
}

impl UrgencyAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Routine => "ROUTINE",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineStage
// ---------------------------------------------------------------------------

/// Downstream stages a routing decision can require.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Retrieval,
    Diagnosis,
    Treatment,
}

// ---------------------------------------------------------------------------
// DiagnosisOrigin
// ---------------------------------------------------------------------------

/// Where a differential entry came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisOrigin {
    /// Matched by the condition rule table.
    RuleBased,
    /// Suggested by the text-generation backend.
    AiSuggested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_level_ordering() {
        assert!(UrgencyLevel::Low < UrgencyLevel::Moderate);
        assert!(UrgencyLevel::Moderate < UrgencyLevel::High);
        assert!(UrgencyLevel::High < UrgencyLevel::Critical);
    }

    #[test]
    fn urgency_level_serializes_snake_case() {
        let json = serde_json::to_string(&UrgencyLevel::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }

    #[test]
    fn case_priority_serializes_screaming() {
        let json = serde_json::to_string(&CasePriority::Urgent).unwrap();
        assert_eq!(json, "\"URGENT\"");
    }

    #[test]
    fn urgency_assessment_round_trip() {
        let parsed: UrgencyAssessment = serde_json::from_str("\"ROUTINE\"").unwrap();
        assert_eq!(parsed, UrgencyAssessment::Routine);
    }
}
