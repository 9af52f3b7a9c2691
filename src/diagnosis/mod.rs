//! Diagnosis stage: fuses the rule engine's candidates, red-flag
//! detection, retrieved guideline context, and an optional local LLM into
//! a single ranked differential with an urgency assessment.

pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod reasoner;
pub mod types;

use thiserror::Error;

pub use ollama::{MockGenerationBackend, OllamaClient, TextGenerationBackend};
pub use reasoner::DiagnosisReasoner;
pub use types::{AiDiagnosis, AiDifferential, DiagnosisReport};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation backend connection failed: {0}")]
    Connection(String),

    #[error("Generation request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
