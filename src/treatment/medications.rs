//! Medication extraction from retrieved guideline text.

use crate::retrieval::types::RetrievedChunk;

use super::planner::split_sentences;
use super::types::MedicationRecommendation;

/// Medication vocabulary scanned for in guideline text. Essential-medicines
/// flavored; matching is case-insensitive substring on the sentence.
static MEDICATION_VOCABULARY: &[&str] = &[
    "paracetamol",
    "acetaminophen",
    "ibuprofen",
    "aspirin",
    "amoxicillin",
    "ampicillin",
    "penicillin",
    "metronidazole",
    "ciprofloxacin",
    "doxycycline",
    "azithromycin",
    "ceftriaxone",
    "gentamicin",
    "cotrimoxazole",
    "artemether",
    "lumefantrine",
    "artesunate",
    "quinine",
    "oral rehydration",
    "zinc",
    "salbutamol",
    "prednisolone",
    "insulin",
    "metformin",
    "omeprazole",
    "nitroglycerin",
    "ferrous sulfate",
    "folic acid",
    "albendazole",
];

const MAX_MEDICATIONS: usize = 5;

/// Scan retrieved content for known medication names. Each hit carries the
/// sentence it appeared in and the source document. When nothing is found
/// the consult-provider placeholder keeps the list non-empty.
pub fn extract_medications(chunks: &[RetrievedChunk]) -> Vec<MedicationRecommendation> {
    let mut medications: Vec<MedicationRecommendation> = Vec::new();

    for chunk in chunks {
        for sentence in split_sentences(&chunk.content) {
            let sentence_lower = sentence.to_lowercase();
            for name in MEDICATION_VOCABULARY {
                if !sentence_lower.contains(name) {
                    continue;
                }
                let already_listed = medications
                    .iter()
                    .any(|m| m.name.eq_ignore_ascii_case(name));
                if already_listed {
                    continue;
                }
                medications.push(MedicationRecommendation {
                    name: capitalize(name),
                    dosage: "As specified in medical guidelines".to_string(),
                    duration: "Per treatment protocol".to_string(),
                    instructions: sentence.clone(),
                    source: chunk.source.clone(),
                });
            }
        }
    }

    medications.truncate(MAX_MEDICATIONS);

    if medications.is_empty() {
        return vec![consult_provider_placeholder()];
    }
    medications
}

/// Drop medications whose name substring-matches a stated allergy. A plan
/// emptied by the filter falls back to the placeholder so the list is
/// never empty.
pub fn filter_by_allergies(
    medications: Vec<MedicationRecommendation>,
    allergies: &[String],
) -> Vec<MedicationRecommendation> {
    if allergies.is_empty() {
        return medications;
    }

    let allergies_lower: Vec<String> = allergies.iter().map(|a| a.to_lowercase()).collect();
    let filtered: Vec<MedicationRecommendation> = medications
        .into_iter()
        .filter(|med| {
            let name_lower = med.name.to_lowercase();
            let conflicted = allergies_lower
                .iter()
                .any(|allergy| name_lower.contains(allergy.as_str()));
            if conflicted {
                tracing::warn!(medication = %med.name, "Filtered medication due to stated allergy");
            }
            !conflicted
        })
        .collect();

    if filtered.is_empty() {
        return vec![consult_provider_placeholder()];
    }
    filtered
}

fn consult_provider_placeholder() -> MedicationRecommendation {
    MedicationRecommendation {
        name: "Consult healthcare provider for medication recommendations".to_string(),
        dosage: "Per clinical guidelines".to_string(),
        duration: "As prescribed by healthcare provider".to_string(),
        instructions: "Consult full medical guidelines for specific medication protocols, \
                       dosages, and contraindications based on patient condition and history."
            .to_string(),
        source: "WHO Essential Medicines List and Treatment Guidelines".to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, source: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            source: source.to_string(),
            relevance_score: 0.8,
            document_type: None,
        }
    }

    #[test]
    fn extracts_known_medications_with_sentence_and_source() {
        let chunks = vec![chunk(
            "For uncomplicated malaria administer artemether-lumefantrine twice daily. \
             Give paracetamol for fever control.",
            "WHO Malaria Guidelines",
        )];
        let meds = extract_medications(&chunks);

        let names: Vec<_> = meds.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"Artemether"));
        assert!(names.contains(&"Paracetamol"));
        let paracetamol = meds.iter().find(|m| m.name == "Paracetamol").unwrap();
        assert!(paracetamol.instructions.contains("fever control"));
        assert_eq!(paracetamol.source, "WHO Malaria Guidelines");
    }

    #[test]
    fn no_medications_yields_placeholder() {
        let chunks = vec![chunk("Rest and plenty of fluids are advised.", "Notes")];
        let meds = extract_medications(&chunks);
        assert_eq!(meds.len(), 1);
        assert!(meds[0].name.contains("Consult healthcare provider"));
    }

    #[test]
    fn empty_chunks_yield_placeholder() {
        let meds = extract_medications(&[]);
        assert_eq!(meds.len(), 1);
        assert!(meds[0].name.contains("Consult"));
    }

    #[test]
    fn medication_names_deduplicated() {
        let chunks = vec![
            chunk("Amoxicillin 500mg three times daily.", "Guide A"),
            chunk("Amoxicillin is first-line for otitis media.", "Guide B"),
        ];
        let meds = extract_medications(&chunks);
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].source, "Guide A");
    }

    #[test]
    fn allergy_filter_removes_matching_names() {
        let chunks = vec![chunk(
            "Treat with amoxicillin. Paracetamol for pain relief.",
            "Guide",
        )];
        let meds = extract_medications(&chunks);
        let filtered = filter_by_allergies(meds, &["amoxicillin".to_string()]);
        assert!(filtered.iter().all(|m| m.name != "Amoxicillin"));
        assert!(filtered.iter().any(|m| m.name == "Paracetamol"));
    }

    #[test]
    fn allergy_filter_never_leaves_empty_list() {
        let chunks = vec![chunk("Give aspirin immediately.", "Guide")];
        let meds = extract_medications(&chunks);
        let filtered = filter_by_allergies(meds, &["aspirin".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].name.contains("Consult"));
    }

    #[test]
    fn extraction_caps_list_size() {
        let chunks = vec![chunk(
            "Consider paracetamol. Or ibuprofen. Or aspirin. Or amoxicillin. \
             Or metronidazole. Or ciprofloxacin. Or doxycycline.",
            "Everything Guide",
        )];
        let meds = extract_medications(&chunks);
        assert_eq!(meds.len(), MAX_MEDICATIONS);
    }
}
