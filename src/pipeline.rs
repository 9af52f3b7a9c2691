//! Pipeline orchestration: Coordinator → Retrieval → Diagnosis →
//! Treatment, assembled into one JSON-serializable case report.
//!
//! The pipeline always returns a well-formed report past input
//! validation: collaborator failures degrade stage-by-stage, and anything
//! that panics during reasoning is caught once here and converted into a
//! degraded report with the failure detail retained.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::diagnosis::ollama::TextGenerationBackend;
use crate::diagnosis::reasoner::DiagnosisReasoner;
use crate::diagnosis::types::DiagnosisReport;
use crate::models::case::{CaseInput, CaseValidationError};
use crate::models::enums::UrgencyAssessment;
use crate::retrieval::stage::RetrievalStage;
use crate::retrieval::types::{CardiacProtocol, KnowledgeStore, RetrievalBundle};
use crate::triage::coordinator::{RoutingDecision, TriageCoordinator};
use crate::triage::rules::{ConditionRuleEngine, ConditionTable};
use crate::treatment::planner::TreatmentPlanner;
use crate::treatment::types::TreatmentPlan;

// ---------------------------------------------------------------------------
// CaseReport
// ---------------------------------------------------------------------------

/// Retrieval metadata carried on the final report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalMetadata {
    pub query: String,
    pub sources: Vec<String>,
    pub chunk_count: usize,
    pub knowledge_base_used: bool,
    #[serde(default)]
    pub cardiac_protocol: Option<CardiacProtocol>,
}

impl RetrievalMetadata {
    fn from_bundle(bundle: &RetrievalBundle) -> Self {
        Self {
            query: bundle.query.clone(),
            sources: bundle.sources.clone(),
            chunk_count: bundle.total_found,
            knowledge_base_used: bundle.knowledge_base_used,
            cardiac_protocol: bundle.cardiac_protocol.clone(),
        }
    }
}

/// The single structured result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseReport {
    pub case_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub routing: RoutingDecision,
    pub retrieval: RetrievalMetadata,
    pub diagnosis: DiagnosisReport,
    pub treatment: TreatmentPlan,
    /// Failure detail when the run degraded; `None` for clean runs.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] CaseValidationError),
}

// ---------------------------------------------------------------------------
// TriagePipeline
// ---------------------------------------------------------------------------

/// The clinical decision pipeline. Constructed once with its collaborators
/// and injected wherever cases are processed; holds no mutable state, so
/// concurrent runs for different cases need no locking.
pub struct TriagePipeline {
    config: PipelineConfig,
    coordinator: TriageCoordinator,
    rule_engine: ConditionRuleEngine,
    planner: TreatmentPlanner,
    store: Arc<dyn KnowledgeStore>,
    backend: Option<Arc<dyn TextGenerationBackend>>,
}

impl TriagePipeline {
    pub fn new(
        config: PipelineConfig,
        table: ConditionTable,
        store: Arc<dyn KnowledgeStore>,
        backend: Option<Arc<dyn TextGenerationBackend>>,
    ) -> Self {
        let coordinator = TriageCoordinator::new(config.escalation_score_threshold);
        let rule_engine =
            ConditionRuleEngine::new(table, config.confidence_threshold, config.max_diagnoses);
        Self {
            config,
            coordinator,
            rule_engine,
            planner: TreatmentPlanner::new(),
            store,
            backend,
        }
    }

    /// Pipeline over the bundled condition table.
    pub fn with_builtin_rules(
        config: PipelineConfig,
        store: Arc<dyn KnowledgeStore>,
        backend: Option<Arc<dyn TextGenerationBackend>>,
    ) -> Self {
        Self::new(config, ConditionTable::builtin(), store, backend)
    }

    /// Run the full pipeline for one case.
    ///
    /// Empty symptom text is the only hard error; every other failure mode
    /// degrades into the returned report.
    pub fn run(&self, case: &CaseInput) -> Result<CaseReport, PipelineError> {
        case.validate()?;

        let case_id = Uuid::new_v4();
        let created_at = Utc::now();

        tracing::info!(case_id = %case_id, "Pipeline run started");

        let routing = self.coordinator.route_case(case);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.run_stages(case, &routing)
        }));

        let report = match outcome {
            Ok((retrieval, diagnosis, treatment)) => CaseReport {
                case_id,
                created_at,
                routing,
                retrieval,
                diagnosis,
                treatment,
                error: None,
            },
            Err(panic) => {
                let detail = panic_detail(panic);
                tracing::error!(case_id = %case_id, error = %detail, "Pipeline degraded after stage failure");
                self.degraded_report(case_id, created_at, routing, detail)
            }
        };

        tracing::info!(
            case_id = %case_id,
            primary = %report.diagnosis.primary_diagnosis,
            priority = report.routing.priority.as_str(),
            degraded = report.error.is_some(),
            "Pipeline run complete"
        );

        Ok(report)
    }

    fn run_stages(
        &self,
        case: &CaseInput,
        routing: &RoutingDecision,
    ) -> (RetrievalMetadata, DiagnosisReport, TreatmentPlan) {
        let retrieval_stage = RetrievalStage::new(self.store.as_ref(), self.config.retrieval_top_k);
        let bundle = retrieval_stage.retrieve(case);

        let candidates =
            self.rule_engine
                .match_conditions(&case.symptoms, &case.history_text(), case.age());

        let reasoner = DiagnosisReasoner::new(self.backend.as_deref());
        let diagnosis = reasoner.analyze(case, routing, candidates, &bundle);

        let treatment =
            self.planner
                .build_plan(&diagnosis, routing.urgency_level, &bundle, &case.allergies);

        (RetrievalMetadata::from_bundle(&bundle), diagnosis, treatment)
    }

    /// Well-formed fallback report: routing survives, diagnosis carries
    /// zero confidence and the consult-a-clinician recommendation, and the
    /// treatment plan is rebuilt from baselines alone.
    fn degraded_report(
        &self,
        case_id: Uuid,
        created_at: DateTime<Utc>,
        routing: RoutingDecision,
        error: String,
    ) -> CaseReport {
        let urgency_assessment = if !routing.emergency_conditions.is_empty() {
            UrgencyAssessment::Critical
        } else if !routing.red_flags.is_empty() {
            UrgencyAssessment::High
        } else {
            UrgencyAssessment::Routine
        };

        let diagnosis = DiagnosisReport {
            primary_diagnosis: "Unable to complete automated analysis".to_string(),
            explanation: String::new(),
            reasoning: format!("Diagnostic analysis failed: {error}"),
            differential: Vec::new(),
            red_flags: routing.red_flags.clone(),
            emergency_conditions: routing.emergency_conditions.clone(),
            recommended_tests: Vec::new(),
            confidence: 0.0,
            urgency_assessment,
            severity_score: 0.0,
            recommendations: vec!["Consult with healthcare provider immediately".to_string()],
            ai_diagnosis: None,
        };

        let empty_bundle = RetrievalBundle::degraded("", error.clone());
        let treatment = self.planner.build_plan(
            &diagnosis,
            routing.urgency_level,
            &empty_bundle,
            &[],
        );

        CaseReport {
            case_id,
            created_at,
            routing,
            retrieval: RetrievalMetadata::from_bundle(&empty_bundle),
            diagnosis,
            treatment,
            error: Some(error),
        }
    }
}

fn panic_detail(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown pipeline failure".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::Demographics;
    use crate::retrieval::stage::InMemoryKnowledgeStore;
    use crate::retrieval::types::{KnowledgeError, RetrievedChunk};

    struct FailingStore;

    impl KnowledgeStore for FailingStore {
        fn search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> Result<Vec<RetrievedChunk>, KnowledgeError> {
            Err(KnowledgeError::Unavailable("connection refused".into()))
        }
    }

    struct PanickingStore;

    impl KnowledgeStore for PanickingStore {
        fn search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> Result<Vec<RetrievedChunk>, KnowledgeError> {
            panic!("index corrupted");
        }
    }

    fn seeded_store() -> Arc<InMemoryKnowledgeStore> {
        let mut store = InMemoryKnowledgeStore::new();
        store.add(
            "Malaria presents with fever and chills. Administer artemether-lumefantrine \
             per national guidelines. Monitor for anemia.",
            "WHO Malaria Guidelines",
            Some("guideline"),
        );
        store.add(
            "Acute coronary syndrome requires immediate aspirin and urgent ECG.",
            "Cardiac Emergency Handbook",
            Some("protocol"),
        );
        Arc::new(store)
    }

    fn pipeline_with(store: Arc<dyn KnowledgeStore>) -> TriagePipeline {
        TriagePipeline::with_builtin_rules(PipelineConfig::default(), store, None)
    }

    #[test]
    fn empty_symptoms_rejected_before_any_stage() {
        let pipeline = pipeline_with(seeded_store());
        let result = pipeline.run(&CaseInput::new(""));
        assert_eq!(
            result.unwrap_err(),
            PipelineError::Validation(CaseValidationError::EmptySymptoms)
        );
    }

    #[test]
    fn full_run_produces_complete_report() {
        let pipeline = pipeline_with(seeded_store());
        let mut case = CaseInput::new("High fever, severe headache, body aches, fatigue, chills");
        case.demographics = Some(Demographics {
            age: Some(31),
            sex: Some("female".into()),
        });

        let report = pipeline.run(&case).unwrap();

        assert!(report.error.is_none());
        assert!(report.retrieval.knowledge_base_used);
        assert!(!report.diagnosis.differential.is_empty());
        assert!(report.diagnosis.confidence > 0.0);
        assert!(!report.treatment.immediate_actions.is_empty());
        assert!(!report.treatment.medications.is_empty());
    }

    #[test]
    fn cardiac_case_routes_critical_end_to_end() {
        let pipeline = pipeline_with(seeded_store());
        let report = pipeline
            .run(&CaseInput::new("chest pain, shortness of breath, sweating"))
            .unwrap();

        assert_eq!(
            report.routing.priority,
            crate::models::enums::CasePriority::Critical
        );
        assert!(report.routing.needs_escalation);
        assert!(report
            .diagnosis
            .red_flags
            .iter()
            .any(|f| f.category == "cardiac"));
        assert!(report.retrieval.cardiac_protocol.is_some());
        assert_eq!(
            report.diagnosis.urgency_assessment,
            UrgencyAssessment::Critical
        );
    }

    #[test]
    fn knowledge_store_failure_still_yields_full_report() {
        let pipeline = pipeline_with(Arc::new(FailingStore));
        let report = pipeline
            .run(&CaseInput::new("high fever and chills"))
            .unwrap();

        assert!(!report.retrieval.knowledge_base_used);
        assert_eq!(report.retrieval.chunk_count, 0);
        // Retrieval degradation is not a pipeline failure.
        assert!(report.error.is_none());
        assert!(!report.diagnosis.primary_diagnosis.is_empty());
        assert!(!report.treatment.medications.is_empty());
    }

    #[test]
    fn hypoxemia_vitals_escalate_to_critical() {
        let pipeline = pipeline_with(seeded_store());
        let mut case = CaseInput::new("mild tiredness for a week");
        case.vital_signs.set("oxygen_saturation", 85);

        let report = pipeline.run(&case).unwrap();

        assert!(report
            .diagnosis
            .emergency_conditions
            .contains(&"HYPOXEMIA".to_string()));
        assert_eq!(
            report.diagnosis.urgency_assessment,
            UrgencyAssessment::Critical
        );
        assert_eq!(report.routing.urgency_level, crate::UrgencyLevel::Critical);
    }

    #[test]
    fn stage_panic_degrades_to_well_formed_report() {
        let pipeline = pipeline_with(Arc::new(PanickingStore));
        let report = pipeline
            .run(&CaseInput::new("high fever and chills"))
            .unwrap();

        assert!(report.error.as_deref().unwrap().contains("index corrupted"));
        assert_eq!(report.diagnosis.confidence, 0.0);
        assert!(report
            .diagnosis
            .recommendations
            .contains(&"Consult with healthcare provider immediately".to_string()));
        // Degraded reports still satisfy the non-empty plan invariants.
        assert!(!report.treatment.immediate_actions.is_empty());
        assert!(!report.treatment.medications.is_empty());
    }

    #[test]
    fn report_round_trips_through_json() {
        let pipeline = pipeline_with(seeded_store());
        let mut case = CaseInput::new("High fever, severe headache, body aches, fatigue, chills");
        case.vital_signs.set("temperature", 102.1);
        case.history = Some("no chronic conditions".into());

        let report = pipeline.run(&case).unwrap();
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: CaseReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, report);
    }

    #[test]
    fn allergies_filter_into_treatment_plan() {
        let pipeline = pipeline_with(seeded_store());
        let mut case = CaseInput::new("high fever and chills");
        case.allergies = vec!["artemether".to_string()];

        let report = pipeline.run(&case).unwrap();
        assert!(report
            .treatment
            .medications
            .iter()
            .all(|m| !m.name.eq_ignore_ascii_case("artemether")));
        assert!(!report.treatment.medications.is_empty());
    }
}
