//! Turns raw analysis completions into validated correction records
//!
//! The analysis model is asked for a flat JSON array, but real completions
//! arrive with code fences, wrapper objects, trailing garbage, or truncated
//! tails. Parsing is therefore lossy-tolerant: whatever cannot be recovered
//! is dropped, never surfaced as an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::markup;
use crate::types::{CorrectionDraft, rationale_entries, today_iso_date};

/// Rationale segments containing one of these markers feed the `grammar`
/// annotation; the second pair feeds `expression`.
const GRAMMAR_MARKERS: [&str; 2] = ["grammar", "문법"];
const EXPRESSION_MARKERS: [&str; 2] = ["expression", "표현"];

/// One validated sentence analysis recovered from a completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCorrection {
    /// Native-language gloss of the sentence
    pub title: String,
    /// "original / corrected" summary line; informational, not persisted
    pub before_versa_after_sentence: Option<String>,
    pub before_sentence: String,
    pub before_intent: String,
    pub after_sentence: String,
    pub after_detail: String,
    /// Defaults to the title gloss
    pub meaning: Option<String>,
    /// Grammar-flagged rationale segments, rejoined with " / "
    pub grammar: Option<String>,
    /// Expression-flagged rationale segments, rejoined with " / "
    pub expression: Option<String>,
    /// Alias of `before_intent` under the persisted column name
    pub before_intention: String,
}

impl ParsedCorrection {
    /// Insert payload for this record, with a fresh review history
    pub fn to_draft(&self) -> CorrectionDraft {
        CorrectionDraft {
            title: self.title.clone(),
            before_sentence: self.before_sentence.clone(),
            before_intention: self.before_intention.clone(),
            after_sentence: self.after_sentence.clone(),
            after_detail: self.after_detail.clone(),
            meaning: self.meaning.clone(),
            grammar: self.grammar.clone(),
            expression: self.expression.clone(),
            datelist: vec![today_iso_date()],
            score: 0,
        }
    }
}

/// How the completion text resolved into candidate objects
///
/// Tried in a fixed order: a strict array parse, then unwrapping a
/// `content` wrapper, then scanning for balanced objects.
#[derive(Debug)]
enum ResponseShape {
    Array(Vec<Value>),
    Wrapped(Vec<Value>),
    Scanned(Vec<Value>),
}

impl ResponseShape {
    fn label(&self) -> &'static str {
        match self {
            Self::Array(_) => "array",
            Self::Wrapped(_) => "wrapped",
            Self::Scanned(_) => "scanned",
        }
    }

    fn into_candidates(self) -> Vec<Value> {
        match self {
            Self::Array(items) | Self::Wrapped(items) | Self::Scanned(items) => items,
        }
    }
}

/// Parse an analysis completion into correction records
///
/// Never fails: malformed or partial input reduces the result set, possibly
/// to empty, and the caller decides how to surface "no results". Output
/// order follows input order, and every returned record satisfies the
/// correction invariants.
pub fn parse_analysis(raw: &str) -> Vec<ParsedCorrection> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let shape = classify(&cleaned);
    let label = shape.label();
    let candidates = shape.into_candidates();
    let total = candidates.len();

    let records: Vec<ParsedCorrection> = candidates
        .into_iter()
        .filter_map(|candidate| match validate(candidate) {
            Some(raw_record) => Some(enrich(raw_record)),
            None => {
                warn!("dropping malformed analysis candidate");
                None
            }
        })
        .collect();

    debug!(
        "parsed {}/{} correction records from {} response",
        records.len(),
        total,
        label
    );
    records
}

/// Remove enclosing code-fence markers and surrounding whitespace
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn classify(cleaned: &str) -> ResponseShape {
    if let Ok(Value::Array(items)) = serde_json::from_str(cleaned) {
        return ResponseShape::Array(items);
    }
    if let Some(items) = unwrap_content(cleaned) {
        return ResponseShape::Wrapped(items);
    }
    ResponseShape::Scanned(scan_objects(cleaned))
}

/// Unwrap `{ "content": ... }` where content is a JSON-array string or an
/// in-place array
fn unwrap_content(cleaned: &str) -> Option<Vec<Value>> {
    let value: Value = serde_json::from_str(cleaned).ok()?;
    match value.get("content")? {
        Value::String(inner) => match serde_json::from_str(inner).ok()? {
            Value::Array(items) => Some(items),
            _ => None,
        },
        Value::Array(items) => Some(items.clone()),
        _ => None,
    }
}

/// Collect every top-level balanced `{...}` object from free-form text
///
/// String-aware so quoted braces don't end an object. The analysis model is
/// told never to nest braces inside a record, so depth only guards against
/// stray markup. A final object left open by truncation is repaired by
/// closing its string and braces at end of input.
fn scan_objects(text: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0
                        && let Some(s) = start.take()
                        && let Ok(value) = serde_json::from_str(&text[s..=i])
                    {
                        objects.push(value);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        if let Some(value) = repair_truncated(&text[s..], in_string, depth) {
            debug!("recovered truncated trailing object");
            objects.push(value);
        }
    }

    objects
}

fn repair_truncated(tail: &str, in_string: bool, depth: usize) -> Option<Value> {
    let mut candidate = tail.trim_end().to_string();
    if in_string {
        candidate.push('"');
    } else if candidate.ends_with(',') {
        candidate.pop();
    }
    for _ in 0..depth {
        candidate.push('}');
    }
    serde_json::from_str(&candidate).ok()
}

/// The raw field set a candidate object must carry
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    title: String,
    #[serde(default)]
    before_versa_after_sentence: Option<String>,
    #[serde(default)]
    before_sentence: String,
    #[serde(default, alias = "before_intention")]
    before_intent: String,
    #[serde(default)]
    after_sentence: String,
    #[serde(default, alias = "after_details")]
    after_detail: String,
}

/// Candidate validation: required fields non-empty, at most one marked span
/// per sentence, at least one rationale entry. Anything else is dropped.
fn validate(candidate: Value) -> Option<RawAnalysis> {
    let raw: RawAnalysis = serde_json::from_value(candidate).ok()?;

    let required = [
        &raw.title,
        &raw.before_sentence,
        &raw.after_sentence,
        &raw.after_detail,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return None;
    }

    if markup::marked_span_count(&raw.before_sentence) > 1
        || markup::marked_span_count(&raw.after_sentence) > 1
    {
        return None;
    }

    if rationale_entries(&raw.after_detail).next().is_none() {
        return None;
    }

    Some(raw)
}

fn enrich(raw: RawAnalysis) -> ParsedCorrection {
    let grammar = extract_points(&raw.after_detail, &GRAMMAR_MARKERS);
    let expression = extract_points(&raw.after_detail, &EXPRESSION_MARKERS);

    ParsedCorrection {
        meaning: Some(raw.title.clone()),
        grammar,
        expression,
        before_intention: raw.before_intent.clone(),
        title: raw.title,
        before_versa_after_sentence: raw.before_versa_after_sentence,
        before_sentence: raw.before_sentence,
        before_intent: raw.before_intent,
        after_sentence: raw.after_sentence,
        after_detail: raw.after_detail,
    }
}

/// Rationale segments carrying one of the markers, rejoined with " / "
fn extract_points(after_detail: &str, markers: &[&str]) -> Option<String> {
    let matched: Vec<&str> = rationale_entries(after_detail)
        .filter(|entry| markers.iter().any(|marker| entry.contains(marker)))
        .collect();

    if matched.is_empty() {
        None
    } else {
        Some(matched.join(" / "))
    }
}
