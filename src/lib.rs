//! Alera clinical decision core.
//!
//! A multi-stage pipeline for frontline triage: free-text symptoms and
//! vital signs go in; a routing decision, a ranked differential diagnosis,
//! an urgency classification, and an evidence-referenced treatment plan
//! come out, as one JSON-serializable report.
//!
//! Stages run strictly in sequence ([`triage::TriageCoordinator`], then
//! [`retrieval::RetrievalStage`], [`diagnosis::DiagnosisReasoner`], and
//! [`treatment::TreatmentPlanner`]), orchestrated by
//! [`pipeline::TriagePipeline`]. The knowledge base and the LLM are
//! injected collaborators ([`retrieval::KnowledgeStore`],
//! [`diagnosis::TextGenerationBackend`]); both are best-effort, and their
//! failure degrades the report instead of failing the run.

pub mod config;
pub mod diagnosis;
pub mod models;
pub mod pipeline;
pub mod retrieval;
pub mod treatment;
pub mod triage;

pub use config::PipelineConfig;
pub use models::case::{CaseInput, Demographics, VitalSigns};
pub use models::enums::{CasePriority, UrgencyAssessment, UrgencyLevel};
pub use pipeline::{CaseReport, PipelineError, TriagePipeline};
