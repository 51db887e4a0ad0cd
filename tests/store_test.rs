//! Integration tests for the storage contract
//!
//! These tests exercise the in-memory implementation against the documented
//! contract: batch semantics, join resolution, ordering, and the round-trip
//! guarantee between create and the review listing.

use parlo::error::Error;
use parlo::store::{CorrectionStore, MemoryStore};
use parlo::types::{CorrectionDraft, SituationDraft, SituationKind};
use uuid::Uuid;

fn draft(title: &str, detail: &str) -> CorrectionDraft {
    CorrectionDraft {
        title: title.to_string(),
        before_sentence: "She %%don't%% like it".to_string(),
        before_intention: "You meant she dislikes it".to_string(),
        after_sentence: "She %%doesn't%% like it".to_string(),
        after_detail: detail.to_string(),
        meaning: Some(title.to_string()),
        grammar: None,
        expression: None,
        datelist: vec!["2026-08-07".to_string()],
        score: 0,
    }
}

// ============ Situations ============

#[tokio::test]
async fn test_situation_counters_derive_from_draft() {
    let store = MemoryStore::new();

    let situation = store
        .create_situation(
            SituationDraft::new("Conversation practice", SituationKind::Conversation)
                .with_description("talked about the weekend")
                .with_date("2026-08-06")
                .with_date("2026-08-07"),
        )
        .await
        .unwrap();

    assert_eq!(situation.kind, SituationKind::Conversation);
    assert_eq!(situation.numdate, 2);
    assert_eq!(situation.studyrate, 0);
    assert_eq!(situation.datelist.len(), 2);
    assert_eq!(
        situation.description.as_deref(),
        Some("talked about the weekend")
    );
}

// ============ Corrections ============

#[tokio::test]
async fn test_round_trip_preserves_sentence_fields() {
    let store = MemoryStore::new();
    let situation = store
        .create_situation(SituationDraft::new("Speech practice", SituationKind::Speech))
        .await
        .unwrap();

    let created = store
        .create_corrections(
            situation.id,
            vec![draft("card", "agreement / 문법: 수 일치 / 표현: 구어체")],
        )
        .await
        .unwrap();

    let listed = store.list_with_answers().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created[0].id);
    assert_eq!(listed[0].before_sentence, created[0].before_sentence);
    assert_eq!(listed[0].after_sentence, created[0].after_sentence);
    assert_eq!(listed[0].after_detail, created[0].after_detail);
    assert_eq!(listed[0].datelist, created[0].datelist);
}

#[tokio::test]
async fn test_listing_resolves_owning_situation() {
    let store = MemoryStore::new();
    let first = store
        .create_situation(SituationDraft::new("first session", SituationKind::Speech))
        .await
        .unwrap();
    let second = store
        .create_situation(SituationDraft::new(
            "second session",
            SituationKind::Conversation,
        ))
        .await
        .unwrap();

    store
        .create_corrections(first.id, vec![draft("from first", "a / b")])
        .await
        .unwrap();
    store
        .create_corrections(second.id, vec![draft("from second", "a / b")])
        .await
        .unwrap();

    let listed = store.list_with_answers().await.unwrap();
    assert_eq!(listed.len(), 2);

    // newest first, each resolving to exactly its own situation
    assert_eq!(listed[0].title, "from second");
    assert_eq!(listed[0].situation.as_ref().unwrap().title, "second session");
    assert_eq!(
        listed[0].situation.as_ref().unwrap().kind,
        SituationKind::Conversation
    );
    assert_eq!(listed[1].situation.as_ref().unwrap().title, "first session");
}

#[tokio::test]
async fn test_batch_create_is_all_or_nothing() {
    let store = MemoryStore::new();
    let situation = store
        .create_situation(SituationDraft::new("Speech practice", SituationKind::Speech))
        .await
        .unwrap();

    let result = store
        .create_corrections(
            situation.id,
            vec![
                draft("fine", "a / b"),
                draft("empty rationale", "  /  "),
            ],
        )
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(store.list_with_answers().await.unwrap().is_empty());
}

// ============ Review updates ============

#[tokio::test]
async fn test_update_review_replaces_history_and_score() {
    let store = MemoryStore::new();
    let situation = store
        .create_situation(SituationDraft::new("Speech practice", SituationKind::Speech))
        .await
        .unwrap();
    let created = store
        .create_corrections(situation.id, vec![draft("card", "a / b")])
        .await
        .unwrap();

    let mut datelist = created[0].datelist.clone();
    datelist.push("2026-08-08".to_string());

    let updated = store
        .update_review(created[0].id, datelist.clone(), 1)
        .await
        .unwrap();
    assert_eq!(updated.datelist, datelist);
    assert_eq!(updated.score, 1);

    // the listing reflects the update
    let listed = store.list_with_answers().await.unwrap();
    assert_eq!(listed[0].score, 1);
    assert_eq!(listed[0].datelist.len(), 2);
}

#[tokio::test]
async fn test_update_review_missing_id_surfaces_not_found() {
    let store = MemoryStore::new();

    let result = store
        .update_review(Uuid::new_v4(), vec!["2026-08-08".to_string()], 1)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
