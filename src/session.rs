//! High-level study pipeline over injected providers and store
//!
//! One awaited step at a time: transcribe, analyze, parse, persist, review.
//! Nothing here runs concurrently with another mutation of the same record;
//! callers disable duplicate triggers while a step is in flight.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::parser::{ParsedCorrection, parse_analysis};
use crate::providers::{
    AnalysisProvider, AnalysisRequest, TranscriptionProvider, TranscriptionRequest,
};
use crate::review::FlashcardEngine;
use crate::store::CorrectionStore;
use crate::types::{
    AudioData, Correction, Situation, SituationDraft, SituationKind, today_iso_date,
};

/// The persisted outcome of saving one analysis
#[derive(Debug, Clone)]
pub struct SavedAnalysis {
    pub situation: Situation,
    pub corrections: Vec<Correction>,
}

/// Explicitly constructed handle over the external collaborators
///
/// All dependencies are injected so the flow runs unchanged against fakes.
pub struct StudySession {
    transcription: Arc<dyn TranscriptionProvider>,
    analysis: Arc<dyn AnalysisProvider>,
    store: Arc<dyn CorrectionStore>,
}

impl StudySession {
    pub fn new(
        transcription: Arc<dyn TranscriptionProvider>,
        analysis: Arc<dyn AnalysisProvider>,
        store: Arc<dyn CorrectionStore>,
    ) -> Self {
        Self {
            transcription,
            analysis,
            store,
        }
    }

    /// Turn recorded audio into text
    pub async fn transcribe(&self, audio: AudioData, sample_rate: u32) -> Result<String> {
        let response = self
            .transcription
            .transcribe(TranscriptionRequest::new(audio, sample_rate))
            .await?;
        debug!("transcribed {}ms of audio", response.duration_ms);
        Ok(response.text)
    }

    /// Ask the tutor model about an utterance and parse the completion
    ///
    /// Zero recovered records is a valid outcome, not an error; the caller
    /// decides how to surface it.
    pub async fn analyze(&self, utterance: &str) -> Result<Vec<ParsedCorrection>> {
        let response = self
            .analysis
            .analyze(AnalysisRequest::new(utterance))
            .await?;
        Ok(parse_analysis(&response.content))
    }

    /// Persist one analysis: a situation for the session, then its
    /// correction batch
    pub async fn save_analysis(
        &self,
        transcript: &str,
        kind: SituationKind,
        cards: &[ParsedCorrection],
    ) -> Result<SavedAnalysis> {
        let situation = self
            .store
            .create_situation(
                SituationDraft::new(session_title(kind), kind)
                    .with_description(transcript)
                    .with_date(today_iso_date()),
            )
            .await?;

        let drafts = cards.iter().map(ParsedCorrection::to_draft).collect();
        let corrections = self.store.create_corrections(situation.id, drafts).await?;

        debug!(
            "saved situation {} with {} corrections",
            situation.id,
            corrections.len()
        );
        Ok(SavedAnalysis {
            situation,
            corrections,
        })
    }

    /// Load everything currently stored into a review deck
    pub async fn load_deck(&self) -> Result<FlashcardEngine> {
        FlashcardEngine::load(self.store.as_ref()).await
    }

    /// The store handle, for driving a loaded deck
    pub fn store(&self) -> &dyn CorrectionStore {
        self.store.as_ref()
    }
}

fn session_title(kind: SituationKind) -> &'static str {
    match kind {
        SituationKind::Speech => "Speech practice",
        SituationKind::Conversation => "Conversation practice",
    }
}
