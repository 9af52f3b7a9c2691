use std::collections::BTreeSet;

use crate::models::case::CaseInput;

use super::types::{
    CardiacProtocol, KnowledgeError, KnowledgeStore, RetrievalBundle, RetrievedChunk,
};

/// Fixed query issued when a cardiac pattern is present in the text.
const CARDIAC_PROTOCOL_QUERY: &str =
    "cardiac arrest heart attack emergency CPR defibrillation immediate treatment protocol";

/// Phrases that mark a cardiac pattern and trigger the protocol query.
static CARDIAC_PATTERNS: &[&str] = &[
    "chest pain",
    "chest pressure",
    "heart attack",
    "cardiac arrest",
    "palpitations",
];

/// Builds the retrieval query, calls the knowledge store, and assembles
/// the context bundle for the reasoner and planner.
pub struct RetrievalStage<'a> {
    store: &'a dyn KnowledgeStore,
    top_k: usize,
}

impl<'a> RetrievalStage<'a> {
    pub fn new(store: &'a dyn KnowledgeStore, top_k: usize) -> Self {
        Self { store, top_k }
    }

    /// Retrieve guideline context for a case. Store failures degrade to an
    /// empty bundle; they are never propagated.
    pub fn retrieve(&self, case: &CaseInput) -> RetrievalBundle {
        let query = build_query(case);

        let mut chunks = match self.store.search(&query, self.top_k) {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(error = %err, "Knowledge store search failed, degrading to empty context");
                return RetrievalBundle::degraded(&query, err.to_string());
            }
        };

        let mut cardiac_protocol = None;
        if has_cardiac_pattern(&case.symptoms) {
            cardiac_protocol = Some(CardiacProtocol::standard());
            match self.store.search(CARDIAC_PROTOCOL_QUERY, self.top_k) {
                Ok(protocol_chunks) => chunks.extend(protocol_chunks),
                Err(err) => {
                    // The structured protocol still ships; only the extra
                    // guideline passages are lost.
                    tracing::warn!(error = %err, "Cardiac protocol query failed");
                }
            }
        }

        let sources: BTreeSet<String> = chunks.iter().map(|c| c.source.clone()).collect();

        tracing::info!(
            chunks = chunks.len(),
            sources = sources.len(),
            cardiac = cardiac_protocol.is_some(),
            "Knowledge retrieval complete"
        );

        RetrievalBundle {
            query,
            total_found: chunks.len(),
            sources: sources.into_iter().collect(),
            knowledge_base_used: true,
            cardiac_protocol,
            chunks,
            error: None,
        }
    }
}

/// Compose the search query from free text, the split symptom list, and
/// demographic hints.
fn build_query(case: &CaseInput) -> String {
    let mut query = case.symptoms.trim().to_string();

    let symptom_list = case.symptom_list();
    if symptom_list.len() > 1 {
        query.push_str(&format!(". Symptoms: {}", symptom_list.join(", ")));
    }

    if let Some(demographics) = &case.demographics {
        match (demographics.age, demographics.sex.as_deref()) {
            (Some(age), Some(sex)) => query.push_str(&format!(". Patient: {age} year old {sex}")),
            (Some(age), None) => query.push_str(&format!(". Patient age: {age}")),
            (None, Some(sex)) => query.push_str(&format!(". Patient sex: {sex}")),
            (None, None) => {}
        }
    }

    query
}

fn has_cardiac_pattern(symptoms: &str) -> bool {
    let text = symptoms.to_lowercase();
    CARDIAC_PATTERNS.iter().any(|p| text.contains(p))
}

// ---------------------------------------------------------------------------
// InMemoryKnowledgeStore — keyword-overlap store for tests and demos
// ---------------------------------------------------------------------------

/// In-memory knowledge store scoring documents by keyword overlap with the
/// query. Stands in for the real vector index in tests and the demo binary.
pub struct InMemoryKnowledgeStore {
    entries: Vec<StoredDocument>,
}

struct StoredDocument {
    content: String,
    source: String,
    document_type: Option<String>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, content: &str, source: &str, document_type: Option<&str>) {
        self.entries.push(StoredDocument {
            content: content.to_string(),
            source: source.to_string(),
            document_type: document_type.map(|s| s.to_string()),
        });
    }
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, KnowledgeError> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| w.len() > 2)
            .collect();

        let mut scored: Vec<(f32, &StoredDocument)> = self
            .entries
            .iter()
            .map(|doc| {
                let content = doc.content.to_lowercase();
                let hits = query_words
                    .iter()
                    .filter(|w| content.contains(w.as_str()))
                    .count();
                let score = if query_words.is_empty() {
                    0.0
                } else {
                    hits as f32 / query_words.len() as f32
                };
                (score, doc)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, doc)| RetrievedChunk {
                content: doc.content.clone(),
                source: doc.source.clone(),
                relevance_score: score,
                document_type: doc.document_type.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::Demographics;

    /// Store that always fails, for degradation tests.
    struct FailingKnowledgeStore;

    impl KnowledgeStore for FailingKnowledgeStore {
        fn search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> Result<Vec<RetrievedChunk>, KnowledgeError> {
            Err(KnowledgeError::Unavailable("connection refused".into()))
        }
    }

    fn seeded_store() -> InMemoryKnowledgeStore {
        let mut store = InMemoryKnowledgeStore::new();
        store.add(
            "Malaria presents with fever, chills and headache. Administer \
             artemether-lumefantrine per national guidelines.",
            "WHO Malaria Guidelines",
            Some("guideline"),
        );
        store.add(
            "Community acquired pneumonia: cough, fever, shortness of breath. \
             Amoxicillin is first-line for non-severe cases.",
            "WHO Pneumonia Protocol",
            Some("guideline"),
        );
        store.add(
            "Acute coronary syndrome protocol: aspirin, oxygen if hypoxic, \
             urgent ECG. Monitor vital signs continuously.",
            "Cardiac Emergency Handbook",
            Some("protocol"),
        );
        store
    }

    #[test]
    fn retrieve_returns_relevant_chunks_and_sources() {
        let store = seeded_store();
        let stage = RetrievalStage::new(&store, 5);
        let bundle = stage.retrieve(&CaseInput::new("fever and chills with headache"));

        assert!(bundle.knowledge_base_used);
        assert!(bundle.total_found >= 1);
        assert!(bundle
            .sources
            .contains(&"WHO Malaria Guidelines".to_string()));
        assert!(bundle.error.is_none());
    }

    #[test]
    fn failing_store_degrades_without_propagating() {
        let store = FailingKnowledgeStore;
        let stage = RetrievalStage::new(&store, 5);
        let bundle = stage.retrieve(&CaseInput::new("fever and chills"));

        assert!(!bundle.knowledge_base_used);
        assert!(bundle.chunks.is_empty());
        assert!(bundle.sources.is_empty());
        assert!(bundle.error.is_some());
    }

    #[test]
    fn sources_present_even_with_zero_results() {
        let store = InMemoryKnowledgeStore::new();
        let stage = RetrievalStage::new(&store, 5);
        let bundle = stage.retrieve(&CaseInput::new("entirely unmatched complaint"));

        assert!(bundle.knowledge_base_used);
        assert_eq!(bundle.total_found, 0);
        assert!(bundle.sources.is_empty());
    }

    #[test]
    fn cardiac_pattern_attaches_protocol() {
        let store = seeded_store();
        let stage = RetrievalStage::new(&store, 5);
        let bundle = stage.retrieve(&CaseInput::new("crushing chest pain and sweating"));

        let protocol = bundle.cardiac_protocol.expect("cardiac protocol expected");
        assert_eq!(protocol.protocol_type, "Cardiac Emergency");
        assert!(!protocol.cpr_steps.is_empty());
    }

    #[test]
    fn non_cardiac_case_has_no_protocol() {
        let store = seeded_store();
        let stage = RetrievalStage::new(&store, 5);
        let bundle = stage.retrieve(&CaseInput::new("diarrhea and vomiting"));
        assert!(bundle.cardiac_protocol.is_none());
    }

    #[test]
    fn sources_are_deduplicated() {
        let mut store = InMemoryKnowledgeStore::new();
        store.add("fever management part one", "WHO Fever Guide", None);
        store.add("fever management part two", "WHO Fever Guide", None);
        let stage = RetrievalStage::new(&store, 5);
        let bundle = stage.retrieve(&CaseInput::new("fever management"));

        assert_eq!(bundle.total_found, 2);
        assert_eq!(bundle.sources, vec!["WHO Fever Guide".to_string()]);
    }

    #[test]
    fn query_includes_symptom_list_and_demographics() {
        let mut case = CaseInput::new("fever, cough, fatigue");
        case.demographics = Some(Demographics {
            age: Some(34),
            sex: Some("female".into()),
        });
        let query = build_query(&case);
        assert!(query.contains("Symptoms: fever, cough, fatigue"));
        assert!(query.contains("34 year old female"));
    }

    #[test]
    fn in_memory_store_ranks_by_overlap() {
        let store = seeded_store();
        let chunks = store.search("pneumonia cough amoxicillin", 3).unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].source, "WHO Pneumonia Protocol");
    }
}
