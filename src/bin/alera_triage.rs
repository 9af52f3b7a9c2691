//! Quick triage from the command line: runs the full pipeline against a
//! small bundled guideline set (and Ollama when reachable) and prints the
//! case report as JSON.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use alera::config::{default_log_filter, PipelineConfig, APP_NAME, APP_VERSION};
use alera::diagnosis::ollama::OllamaClient;
use alera::models::case::{CaseInput, Demographics};
use alera::retrieval::stage::InMemoryKnowledgeStore;
use alera::TriagePipeline;

#[derive(Parser)]
#[command(name = "alera-triage", version, about = "Run the Alera triage pipeline on one case")]
struct Args {
    /// Free-text symptom description.
    symptoms: String,

    /// Patient age in years.
    #[arg(long)]
    age: Option<u32>,

    /// Patient sex.
    #[arg(long)]
    sex: Option<String>,

    /// Prior medical history text.
    #[arg(long)]
    history: Option<String>,

    /// Vital sign as name=value (repeatable), e.g. --vital temperature=101.5
    #[arg(long = "vital", value_name = "NAME=VALUE")]
    vitals: Vec<String>,

    /// Stated allergy (repeatable).
    #[arg(long = "allergy")]
    allergies: Vec<String>,

    /// Ollama base URL; AI augmentation is skipped when not set.
    #[arg(long)]
    ollama_url: Option<String>,

    /// Ollama model name.
    #[arg(long, default_value = "llama3.2")]
    ollama_model: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .init();

    tracing::info!("{} triage starting v{}", APP_NAME, APP_VERSION);

    let args = Args::parse();

    let mut case = CaseInput::new(&args.symptoms);
    case.demographics = Some(Demographics {
        age: args.age,
        sex: args.sex.clone(),
    });
    case.history = args.history.clone();
    case.allergies = args.allergies.clone();
    for vital in &args.vitals {
        match vital.split_once('=') {
            Some((name, value)) => case
                .vital_signs
                .set(name.trim(), value.trim().to_string()),
            None => eprintln!("Ignoring malformed --vital {vital:?} (expected NAME=VALUE)"),
        }
    }

    let config = PipelineConfig::default();
    let backend: Option<Arc<dyn alera::diagnosis::TextGenerationBackend>> =
        args.ollama_url.as_deref().map(|url| {
            Arc::new(OllamaClient::new(
                url,
                &args.ollama_model,
                config.generation_timeout_secs,
            )) as Arc<dyn alera::diagnosis::TextGenerationBackend>
        });

    let pipeline =
        TriagePipeline::with_builtin_rules(config, Arc::new(sample_knowledge_store()), backend);

    match pipeline.run(&case) {
        Ok(report) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).expect("report serializes")
            );
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

/// A handful of guideline excerpts so the demo exercises retrieval,
/// medication extraction, and evidence attribution without a real index.
fn sample_knowledge_store() -> InMemoryKnowledgeStore {
    let mut store = InMemoryKnowledgeStore::new();
    store.add(
        "Uncomplicated malaria presents with fever, chills, headache and body aches. \
         Administer artemether-lumefantrine by weight band. Give paracetamol for fever. \
         Monitor for signs of severe malaria such as altered consciousness.",
        "WHO Malaria Treatment Guidelines",
        Some("guideline"),
    );
    store.add(
        "Community acquired pneumonia: cough, fever, shortness of breath. Amoxicillin is \
         first-line treatment for non-severe pneumonia. Reassess within 48 hours.",
        "WHO Pneumonia Protocol",
        Some("guideline"),
    );
    store.add(
        "Suspected acute coronary syndrome requires immediate aspirin unless \
         contraindicated, continuous vital sign monitoring and urgent ECG.",
        "Cardiac Emergency Handbook",
        Some("protocol"),
    );
    store.add(
        "Acute watery diarrhea in children: give oral rehydration solution after each \
         loose stool and zinc for 10-14 days. Monitor hydration status and urine output.",
        "WHO Diarrhoeal Disease Guidelines",
        Some("guideline"),
    );
    store
}
