/// Application-level constants
pub const APP_NAME: &str = "Alera";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter for the demo binary.
pub fn default_log_filter() -> String {
    "info,alera=debug".to_string()
}

/// Tunables for one pipeline instance. Constructed once and injected;
/// nothing in the crate holds mutable global state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum rule-engine confidence for a condition to enter the
    /// differential. Deployments have run this anywhere between 0.4 and
    /// 0.6; 0.4 is the sensitivity-oriented default.
    pub confidence_threshold: f32,
    /// Cap on the rule-based differential size.
    pub max_diagnoses: usize,
    /// How many knowledge chunks to request per retrieval query.
    pub retrieval_top_k: usize,
    /// Timeout for the text-generation call, in seconds.
    pub generation_timeout_secs: u64,
    /// Moderate-tier cases escalate to doctor review at or above this
    /// urgency score.
    pub escalation_score_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            max_diagnoses: 3,
            retrieval_top_k: 5,
            generation_timeout_secs: 120,
            escalation_score_threshold: 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_sensitivity_oriented() {
        let config = PipelineConfig::default();
        assert!((config.confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.max_diagnoses, 3);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
