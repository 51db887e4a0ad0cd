//! Parlo - English speech correction flashcards
//!
//! Record or type an English utterance, transcribe it, ask a language model
//! for sentence-level corrections, and keep the results as spaced-repetition
//! flashcards backed by an external store. Auth, durable storage, and the
//! models themselves are external collaborators; this crate owns the
//! response parsing, the persistence contract, and the review cycle.

pub mod error;
pub mod markup;
pub mod parser;
pub mod providers;
pub mod review;
pub mod session;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main components for convenience
pub use parser::{ParsedCorrection, parse_analysis};
pub use providers::{AnalysisProvider, TranscriptionProvider};
pub use review::{Advance, FlashcardEngine};
pub use session::{SavedAnalysis, StudySession};
pub use store::{CorrectionStore, MemoryStore, RestStore};
