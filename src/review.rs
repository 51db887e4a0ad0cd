//! Flashcard sequencing, flip state, and spaced-repetition bookkeeping
//!
//! The deck is the in-memory list loaded for the current review session;
//! the store stays the source of truth and is only written when a pass
//! completes.

use tracing::debug;

use crate::error::Result;
use crate::store::CorrectionStore;
use crate::types::{CorrectionWithContext, today_iso_date};

/// Outcome of a navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Nothing changed: empty deck, or already at the first card
    Stayed,
    /// Moved to an adjacent card
    Moved,
    /// The last card's review was persisted and the deck wrapped to the start
    Completed,
}

/// Review state over a loaded set of corrections
pub struct FlashcardEngine {
    cards: Vec<CorrectionWithContext>,
    current: usize,
    flipped: bool,
}

impl FlashcardEngine {
    pub fn new(cards: Vec<CorrectionWithContext>) -> Self {
        Self {
            cards,
            current: 0,
            flipped: false,
        }
    }

    /// Build a deck from everything the store currently holds
    pub async fn load(store: &dyn CorrectionStore) -> Result<Self> {
        let cards = store.list_with_answers().await?;
        debug!("loaded review deck with {} cards", cards.len());
        Ok(Self::new(cards))
    }

    /// An empty deck is the "nothing to study" state: no current card,
    /// navigation is a no-op
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// The card being shown, if any
    pub fn current(&self) -> Option<&CorrectionWithContext> {
        self.cards.get(self.current)
    }

    /// Zero-based position within the deck
    pub fn position(&self) -> Option<usize> {
        if self.cards.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Toggle between front and back; the index never changes
    pub fn flip(&mut self) {
        if !self.cards.is_empty() {
            self.flipped = !self.flipped;
        }
    }

    /// Step back one card; a no-op at the first card
    pub fn prev(&mut self) -> Advance {
        if self.current == 0 || self.cards.is_empty() {
            return Advance::Stayed;
        }
        self.flipped = false;
        self.current -= 1;
        Advance::Moved
    }

    /// Step forward one card, or complete the pass at the last card
    ///
    /// Completion records today's review for the card being shown (one
    /// appended date, score raised by one) and wraps the deck to the start.
    /// The store write happens before any state change, so a rejected
    /// update leaves the deck exactly where it was and the review is not
    /// silently lost.
    pub async fn next(&mut self, store: &dyn CorrectionStore) -> Result<Advance> {
        if self.cards.is_empty() {
            return Ok(Advance::Stayed);
        }

        if self.current + 1 < self.cards.len() {
            self.flipped = false;
            self.current += 1;
            return Ok(Advance::Moved);
        }

        let card = &self.cards[self.current];
        let mut datelist = card.datelist.clone();
        datelist.push(today_iso_date());
        let updated = store
            .update_review(card.id, datelist, card.score + 1)
            .await?;

        let slot = &mut self.cards[self.current];
        slot.datelist = updated.datelist;
        slot.score = updated.score;
        self.flipped = false;
        self.current = 0;
        debug!("review pass complete, deck wrapped to start");
        Ok(Advance::Completed)
    }
}
