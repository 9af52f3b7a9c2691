use crate::models::case::CaseInput;
use crate::retrieval::types::RetrievedChunk;

/// How many retrieved excerpts the prompt carries, and how much of each.
const MAX_CONTEXT_CHUNKS: usize = 5;
const MAX_EXCERPT_CHARS: usize = 300;

pub const DIAGNOSIS_SYSTEM_PROMPT: &str = r#"You are an experienced medical AI assistant helping frontline healthcare workers.

Based on the patient information and medical knowledge provided, please:
1. Provide a differential diagnosis with the most likely conditions
2. Suggest appropriate treatment recommendations
3. Indicate any red flags that require immediate attention
4. Recommend follow-up care or referral if necessary
5. Provide a confidence score (0-100) for your assessment
6. Explain the diagnosis in simple language that a nurse can understand and explain to the patient

Format your response as structured JSON with the following fields:
- primary_diagnosis: The most likely condition (medical term)
- diagnosis_explanation: A clear, simple explanation of what this condition means, what causes it, and why you think the patient has it. Write this in plain language, avoiding medical jargon.
- differential_diagnoses: List of other possible conditions
- treatment_plan: Recommended treatments and medications
- red_flags: Any warning signs requiring immediate attention
- follow_up_recommendations: Next steps and follow-up care
- confidence_score: Your confidence in this assessment (0-100)
- reasoning: Brief explanation of your diagnostic reasoning"#;

/// Build the generation prompt: patient block, then the top retrieved
/// guideline excerpts with source attribution, each bounded in length.
pub fn build_diagnosis_prompt(case: &CaseInput, chunks: &[RetrievedChunk]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Patient Information:\n");
    if let Some(demographics) = &case.demographics {
        prompt.push_str(&format!(
            "- Age: {}\n",
            demographics
                .age
                .map(|a| a.to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        ));
        prompt.push_str(&format!(
            "- Sex: {}\n",
            demographics.sex.as_deref().unwrap_or("Unknown")
        ));
    }
    prompt.push_str(&format!("- Symptoms: {}\n", case.symptoms));
    if !case.vital_signs.is_empty() {
        prompt.push_str(&format!("- Vital Signs: {}\n", case.vital_signs.summary()));
    }
    if let Some(history) = &case.history {
        prompt.push_str(&format!("- Medical History: {history}\n"));
    }
    if !case.allergies.is_empty() {
        prompt.push_str(&format!("- Allergies: {}\n", case.allergies.join(", ")));
    }

    prompt.push_str("\nRelevant Medical Knowledge:\n");
    if chunks.is_empty() {
        prompt.push_str("(no guideline passages retrieved)\n");
    }
    for (idx, chunk) in chunks.iter().take(MAX_CONTEXT_CHUNKS).enumerate() {
        let excerpt: String = chunk.content.chars().take(MAX_EXCERPT_CHARS).collect();
        prompt.push_str(&format!(
            "[Reference {} from {}]:\n{}\n",
            idx + 1,
            chunk.source,
            excerpt
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::Demographics;

    fn chunk(content: &str, source: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            source: source.to_string(),
            relevance_score: 0.9,
            document_type: None,
        }
    }

    #[test]
    fn system_prompt_requests_structured_json() {
        assert!(DIAGNOSIS_SYSTEM_PROMPT.contains("structured JSON"));
        assert!(DIAGNOSIS_SYSTEM_PROMPT.contains("confidence_score"));
        assert!(DIAGNOSIS_SYSTEM_PROMPT.contains("diagnosis_explanation"));
    }

    #[test]
    fn prompt_contains_patient_block_and_references() {
        let mut case = CaseInput::new("fever and chills");
        case.demographics = Some(Demographics {
            age: Some(29),
            sex: Some("male".into()),
        });
        case.history = Some("no prior conditions".into());

        let chunks = vec![chunk("Malaria guidance text", "WHO Malaria Guidelines")];
        let prompt = build_diagnosis_prompt(&case, &chunks);

        assert!(prompt.contains("- Age: 29"));
        assert!(prompt.contains("- Symptoms: fever and chills"));
        assert!(prompt.contains("[Reference 1 from WHO Malaria Guidelines]"));
    }

    #[test]
    fn prompt_bounds_excerpt_length() {
        let long_content = "x".repeat(2_000);
        let chunks = vec![chunk(&long_content, "Long Doc")];
        let prompt = build_diagnosis_prompt(&CaseInput::new("cough"), &chunks);

        // 300-char excerpt plus surrounding scaffolding, far below the raw chunk.
        assert!(prompt.len() < 1_000);
    }

    #[test]
    fn prompt_caps_reference_count() {
        let chunks: Vec<_> = (0..8)
            .map(|i| chunk("content", &format!("Source {i}")))
            .collect();
        let prompt = build_diagnosis_prompt(&CaseInput::new("cough"), &chunks);
        assert!(prompt.contains("[Reference 5 from"));
        assert!(!prompt.contains("[Reference 6 from"));
    }

    #[test]
    fn prompt_notes_missing_context() {
        let prompt = build_diagnosis_prompt(&CaseInput::new("cough"), &[]);
        assert!(prompt.contains("no guideline passages retrieved"));
    }
}
