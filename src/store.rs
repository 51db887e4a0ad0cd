//! Persistence contract for situations and corrections
//!
//! Durable storage lives in an external managed relational store; this
//! module only defines the contract plus two implementations of it: a REST
//! client for the managed store and an in-memory store for tests and
//! offline runs. The client handle is constructed explicitly and passed in
//! wherever storage is needed, so core logic never touches a global.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{
    Correction, CorrectionDraft, CorrectionId, CorrectionWithContext, Situation, SituationDraft,
    SituationId, SituationRef, rationale_entries,
};

/// Storage contract for the correction flow
///
/// Batch writes are all-or-nothing from the caller's perspective; a failed
/// call leaves no partial state the caller has to reason about.
#[async_trait]
pub trait CorrectionStore: Send + Sync {
    /// Insert one situation, returning it with generated id, derived
    /// counters, and timestamps
    async fn create_situation(&self, draft: SituationDraft) -> Result<Situation>;

    /// Insert a batch of corrections tied to a situation
    async fn create_corrections(
        &self,
        situation_id: SituationId,
        drafts: Vec<CorrectionDraft>,
    ) -> Result<Vec<Correction>>;

    /// Corrections joined with answer fields and situation metadata,
    /// newest first
    async fn list_with_answers(&self) -> Result<Vec<CorrectionWithContext>>;

    /// Replace a correction's review history and score
    ///
    /// The caller appends exactly one date per completed review pass.
    async fn update_review(
        &self,
        id: CorrectionId,
        datelist: Vec<String>,
        score: u32,
    ) -> Result<Correction>;
}

/// REST client against the managed store's PostgREST surface
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CorrectionRow<'a> {
    situation_id: SituationId,
    #[serde(flatten)]
    draft: &'a CorrectionDraft,
}

#[derive(Serialize)]
struct ReviewPatch {
    datelist: Vec<String>,
    score: u32,
}

const LIST_QUERY: &str = "select=id,title,before_sentence,before_intention,after_sentence,\
after_detail,datelist,score,answer_first,answer_full,situations(id,title,type)\
&order=created_at.desc";

impl RestStore {
    /// Create a client (API key loaded from environment if not provided)
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("SUPABASE_ANON_KEY").ok());

        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: key,
        }
    }

    /// Create a client from `SUPABASE_URL` and `SUPABASE_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::ProviderNotConfigured("SUPABASE_URL not set".to_string()))?;
        Ok(Self::new(base_url, None))
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("store API key not set".to_string()))
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: String,
    ) -> Result<reqwest::RequestBuilder> {
        let key = self.api_key()?;
        Ok(self
            .client
            .request(method, url)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
            .header("Prefer", "return=representation"))
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("store error during {context}: {status} - {body}");
        Err(Error::Storage(format!("{context}: {status} - {body}")))
    }
}

#[async_trait]
impl CorrectionStore for RestStore {
    async fn create_situation(&self, draft: SituationDraft) -> Result<Situation> {
        debug!("inserting situation \"{}\"", draft.title);

        let response = self
            .request(reqwest::Method::POST, self.endpoint("situations"))?
            .json(&[&draft])
            .send()
            .await?;
        let response = Self::check(response, "situation insert").await?;

        let rows: Vec<Situation> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Storage("situation insert returned no rows".to_string()))
    }

    async fn create_corrections(
        &self,
        situation_id: SituationId,
        drafts: Vec<CorrectionDraft>,
    ) -> Result<Vec<Correction>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        for draft in &drafts {
            draft.validate()?;
        }

        let rows: Vec<CorrectionRow<'_>> = drafts
            .iter()
            .map(|draft| CorrectionRow {
                situation_id,
                draft,
            })
            .collect();

        debug!(
            "inserting {} corrections for situation {situation_id}",
            rows.len()
        );

        // one statement, so the batch lands atomically
        let response = self
            .request(reqwest::Method::POST, self.endpoint("corrections"))?
            .json(&rows)
            .send()
            .await?;
        let response = Self::check(response, "correction insert").await?;

        Ok(response.json().await?)
    }

    async fn list_with_answers(&self) -> Result<Vec<CorrectionWithContext>> {
        let url = format!("{}?{}", self.endpoint("corrections_with_answers"), LIST_QUERY);

        let response = self
            .request(reqwest::Method::GET, url)?
            .send()
            .await?;
        let response = Self::check(response, "correction listing").await?;

        Ok(response.json().await?)
    }

    async fn update_review(
        &self,
        id: CorrectionId,
        datelist: Vec<String>,
        score: u32,
    ) -> Result<Correction> {
        debug!("recording review for correction {id}");

        let url = format!("{}?id=eq.{id}", self.endpoint("corrections"));
        let response = self
            .request(reqwest::Method::PATCH, url)?
            .json(&ReviewPatch { datelist, score })
            .send()
            .await?;
        let response = Self::check(response, "review update").await?;

        let rows: Vec<Correction> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

/// In-memory store with the same contract
///
/// Backs tests and offline runs; derives the answer fields the managed
/// store's listing view would.
#[derive(Default)]
pub struct MemoryStore {
    situations: RwLock<Vec<Situation>>,
    corrections: RwLock<Vec<Correction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored corrections
    pub fn correction_count(&self) -> usize {
        self.corrections.read().len()
    }
}

/// Back-face text composed from the before/after sentences
fn compose_answer_full(correction: &Correction) -> String {
    format!(
        "<Before>{}<After>{}",
        correction.before_sentence, correction.after_sentence
    )
}

#[async_trait]
impl CorrectionStore for MemoryStore {
    async fn create_situation(&self, draft: SituationDraft) -> Result<Situation> {
        let now = Utc::now();
        let situation = Situation {
            id: Uuid::new_v4(),
            numdate: draft.datelist.len() as u32,
            studyrate: 0,
            title: draft.title,
            kind: draft.kind,
            description: draft.description,
            datelist: draft.datelist,
            created_at: now,
            updated_at: now,
        };
        self.situations.write().push(situation.clone());
        Ok(situation)
    }

    async fn create_corrections(
        &self,
        situation_id: SituationId,
        drafts: Vec<CorrectionDraft>,
    ) -> Result<Vec<Correction>> {
        // validate the whole batch before touching storage: all-or-nothing
        for draft in &drafts {
            draft.validate()?;
        }

        let now = Utc::now();
        let created: Vec<Correction> = drafts
            .into_iter()
            .map(|draft| Correction {
                id: Uuid::new_v4(),
                situation_id,
                title: draft.title,
                before_sentence: draft.before_sentence,
                before_intention: draft.before_intention,
                after_sentence: draft.after_sentence,
                after_detail: draft.after_detail,
                meaning: draft.meaning,
                grammar: draft.grammar,
                expression: draft.expression,
                datelist: draft.datelist,
                score: draft.score,
                created_at: now,
                updated_at: now,
            })
            .collect();

        self.corrections.write().extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_with_answers(&self) -> Result<Vec<CorrectionWithContext>> {
        let situations = self.situations.read();
        let corrections = self.corrections.read();

        // inserts are chronological, so reverse order is newest first
        Ok(corrections
            .iter()
            .rev()
            .map(|correction| CorrectionWithContext {
                id: correction.id,
                title: correction.title.clone(),
                before_sentence: correction.before_sentence.clone(),
                before_intention: correction.before_intention.clone(),
                after_sentence: correction.after_sentence.clone(),
                after_detail: correction.after_detail.clone(),
                datelist: correction.datelist.clone(),
                score: correction.score,
                answer_first: rationale_entries(&correction.after_detail)
                    .next()
                    .map(str::to_string),
                answer_full: Some(compose_answer_full(correction)),
                situation: situations
                    .iter()
                    .find(|situation| situation.id == correction.situation_id)
                    .map(|situation| SituationRef {
                        id: situation.id,
                        title: situation.title.clone(),
                        kind: situation.kind,
                    }),
            })
            .collect())
    }

    async fn update_review(
        &self,
        id: CorrectionId,
        datelist: Vec<String>,
        score: u32,
    ) -> Result<Correction> {
        let mut corrections = self.corrections.write();
        let correction = corrections
            .iter_mut()
            .find(|correction| correction.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        correction.datelist = datelist;
        correction.score = score;
        correction.updated_at = Utc::now();
        Ok(correction.clone())
    }
}
