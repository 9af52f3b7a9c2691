//! Knowledge retrieval stage.
//!
//! Retrieval is best-effort context for the downstream stages, never a
//! hard dependency: a failing or unreachable [`KnowledgeStore`] degrades
//! to an empty bundle with `knowledge_base_used = false`.

pub mod stage;
pub mod types;

pub use stage::{InMemoryKnowledgeStore, RetrievalStage};
pub use types::{
    CardiacProtocol, KnowledgeError, KnowledgeStore, RetrievalBundle, RetrievedChunk,
};
