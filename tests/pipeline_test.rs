//! End-to-end pipeline tests
//!
//! These tests run the complete flow with fake providers: audio →
//! transcription → analysis → parsing → persistence → review. The fakes
//! return canned payloads shaped like real service responses, including the
//! malformed tail records a live completion can carry.

use std::sync::Arc;

use async_trait::async_trait;
use parlo::error::{Error, Result};
use parlo::providers::{
    AnalysisProvider, AnalysisRequest, AnalysisResponse, TranscriptionProvider,
    TranscriptionRequest, TranscriptionResponse,
};
use parlo::review::Advance;
use parlo::session::StudySession;
use parlo::store::MemoryStore;
use parlo::types::SituationKind;

struct FakeTranscription {
    text: &'static str,
}

#[async_trait]
impl TranscriptionProvider for FakeTranscription {
    fn name(&self) -> &'static str {
        "fake transcription"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse> {
        assert!(!request.audio.is_empty());
        Ok(TranscriptionResponse {
            text: self.text.to_string(),
            language: Some("en".to_string()),
            duration_ms: 1500,
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

struct FakeAnalysis {
    completion: &'static str,
}

#[async_trait]
impl AnalysisProvider for FakeAnalysis {
    fn name(&self) -> &'static str {
        "fake analysis"
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        assert!(!request.utterance.is_empty());
        Ok(AnalysisResponse {
            content: self.completion.to_string(),
            model: Some("fake-model".to_string()),
            usage: None,
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

struct FailingAnalysis;

#[async_trait]
impl AnalysisProvider for FailingAnalysis {
    fn name(&self) -> &'static str {
        "failing analysis"
    }

    async fn analyze(&self, _request: AnalysisRequest) -> Result<AnalysisResponse> {
        Err(Error::Analysis("model unavailable".to_string()))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

// a completion with two good records and one truncated tail record that is
// recoverable by the object scan
const COMPLETION: &str = r#"```json
[
    {
        "title": "학교에 갔어요",
        "before_versa_after_sentence": "I go to school / I went to school",
        "before_sentence": "I %%go%% to school yesterday",
        "before_intent": "You wanted to describe yesterday's trip",
        "after_sentence": "I %%went%% to school yesterday",
        "after_detail": "past tense needed / 문법: 시제 일치"
    },
    {
        "title": "그녀는 좋아하지 않아요",
        "before_sentence": "She %%don't%% like it",
        "before_intent": "You meant she dislikes it",
        "after_sentence": "She %%doesn't%% like it",
        "after_detail": "subject-verb agreement / 표현: 부정문"
    },
    {"title": "잘린 카드", "before_sentence": "b", "after_sentence": "a", "after_detail": "d"
```"#;

fn session(completion: &'static str) -> (StudySession, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = StudySession::new(
        Arc::new(FakeTranscription {
            text: "I go to school yesterday. She don't like it.",
        }),
        Arc::new(FakeAnalysis { completion }),
        store.clone(),
    );
    (session, store)
}

// ============ Full study flow ============

#[tokio::test]
async fn test_record_analyze_save_and_review() {
    let (session, store) = session(COMPLETION);

    // transcription
    let transcript = session.transcribe(vec![0u8; 3200], 16000).await.unwrap();
    assert_eq!(transcript, "I go to school yesterday. She don't like it.");

    // analysis + parsing: the truncated third record is recovered too
    let cards = session.analyze(&transcript).await.unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0].grammar.as_deref(), Some("문법: 시제 일치"));
    assert_eq!(cards[1].expression.as_deref(), Some("표현: 부정문"));
    assert_eq!(cards[2].title, "잘린 카드");

    // persistence: one situation, one correction batch
    let saved = session
        .save_analysis(&transcript, SituationKind::Speech, &cards)
        .await
        .unwrap();
    assert_eq!(saved.situation.kind, SituationKind::Speech);
    assert_eq!(saved.situation.description.as_deref(), Some(transcript.as_str()));
    assert_eq!(saved.situation.numdate, 1);
    assert_eq!(saved.corrections.len(), 3);
    assert!(saved.corrections.iter().all(|c| c.score == 0));
    assert!(saved
        .corrections
        .iter()
        .all(|c| c.situation_id == saved.situation.id));
    assert_eq!(store.correction_count(), 3);

    // review: walk the deck and complete the pass
    let mut deck = session.load_deck().await.unwrap();
    assert_eq!(deck.len(), 3);
    assert!(deck
        .current()
        .unwrap()
        .situation
        .as_ref()
        .is_some_and(|s| s.title == "Speech practice"));

    deck.flip();
    assert!(deck.is_flipped());
    assert_eq!(deck.next(session.store()).await.unwrap(), Advance::Moved);
    assert_eq!(deck.next(session.store()).await.unwrap(), Advance::Moved);
    let last_id = deck.current().unwrap().id;
    assert_eq!(
        deck.next(session.store()).await.unwrap(),
        Advance::Completed
    );
    assert_eq!(deck.position(), Some(0));

    // exactly the last-viewed card gained a date and a point
    let listed = session.store().list_with_answers().await.unwrap();
    for card in &listed {
        if card.id == last_id {
            assert_eq!(card.score, 1);
            assert_eq!(card.datelist.len(), 2);
        } else {
            assert_eq!(card.score, 0);
            assert_eq!(card.datelist.len(), 1);
        }
    }
}

#[tokio::test]
async fn test_analysis_with_no_recoverable_records_is_not_an_error() {
    let (session, store) = session("Sorry, I cannot help with that.");

    let cards = session.analyze("hello").await.unwrap();
    assert!(cards.is_empty());

    // saving an empty batch still records the situation
    let saved = session
        .save_analysis("hello", SituationKind::Speech, &cards)
        .await
        .unwrap();
    assert!(saved.corrections.is_empty());
    assert_eq!(store.correction_count(), 0);

    let deck = session.load_deck().await.unwrap();
    assert!(deck.is_empty());
    assert!(deck.current().is_none());
}

#[tokio::test]
async fn test_failed_analysis_surfaces_once_and_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let session = StudySession::new(
        Arc::new(FakeTranscription { text: "hi" }),
        Arc::new(FailingAnalysis),
        store.clone(),
    );

    let result = session.analyze("hi").await;
    assert!(matches!(result, Err(Error::Analysis(_))));
    assert_eq!(store.correction_count(), 0);
}
