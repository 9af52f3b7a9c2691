use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ranked passage returned by the knowledge store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub relevance_score: f32,
    #[serde(default)]
    pub document_type: Option<String>,
}

/// Errors a knowledge store can surface. Callers distinguish "no data"
/// (an empty result list) from "the collaborator failed" (these).
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Knowledge store unavailable: {0}")]
    Unavailable(String),

    #[error("Knowledge store returned malformed data: {0}")]
    Malformed(String),
}

/// Semantic search over the medical-guideline corpus. The embedding and
/// index machinery behind it is owned elsewhere; the pipeline only
/// consumes ranked chunks.
pub trait KnowledgeStore: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, KnowledgeError>;
}

/// Fixed cardiac emergency protocol merged into the bundle when the
/// symptom text shows a cardiac pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardiacProtocol {
    pub protocol_type: String,
    pub immediate_actions: Vec<String>,
    pub cpr_steps: Vec<String>,
    pub warning_signs: Vec<String>,
}

impl CardiacProtocol {
    pub fn standard() -> Self {
        Self {
            protocol_type: "Cardiac Emergency".to_string(),
            immediate_actions: vec![
                "Call emergency services (911/ambulance) immediately".to_string(),
                "Check patient responsiveness and breathing".to_string(),
                "Begin CPR if patient is unresponsive and not breathing normally".to_string(),
                "Use AED (Automated External Defibrillator) if available".to_string(),
                "Continue CPR until emergency services arrive".to_string(),
            ],
            cpr_steps: vec![
                "Place patient on firm, flat surface".to_string(),
                "Position hands on center of chest".to_string(),
                "Compress chest at least 2 inches deep".to_string(),
                "Perform 30 chest compressions at rate of 100-120/min".to_string(),
                "Give 2 rescue breaths".to_string(),
                "Continue 30:2 cycle until help arrives".to_string(),
            ],
            warning_signs: vec![
                "Chest pain or discomfort".to_string(),
                "Shortness of breath".to_string(),
                "Pain in arms, back, neck, jaw, or stomach".to_string(),
                "Cold sweat, nausea, or lightheadedness".to_string(),
            ],
        }
    }
}

/// Everything the retrieval stage hands downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalBundle {
    pub query: String,
    pub chunks: Vec<RetrievedChunk>,
    pub total_found: usize,
    /// Deduplicated source identifiers; present (possibly empty) even when
    /// zero chunks came back.
    pub sources: Vec<String>,
    pub knowledge_base_used: bool,
    #[serde(default)]
    pub cardiac_protocol: Option<CardiacProtocol>,
    /// Collaborator failure detail, kept for diagnostics only.
    #[serde(default)]
    pub error: Option<String>,
}

impl RetrievalBundle {
    /// Empty degraded bundle used when the store is unreachable.
    pub fn degraded(query: &str, error: String) -> Self {
        Self {
            query: query.to_string(),
            chunks: Vec::new(),
            total_found: 0,
            sources: Vec::new(),
            knowledge_base_used: false,
            cardiac_protocol: None,
            error: Some(error),
        }
    }
}
