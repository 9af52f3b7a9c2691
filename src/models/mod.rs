pub mod case;
pub mod enums;

pub use case::{CaseInput, CaseValidationError, Demographics, VitalSigns};
pub use enums::{CasePriority, DiagnosisOrigin, PipelineStage, UrgencyAssessment, UrgencyLevel};
