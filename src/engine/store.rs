use chrono::{DateTime, Utc};

use super::error::EngineResult;
use super::scheduler::SchedulerState;
use super::types::{
    Card, CardId, CardKey, Deck, DeckId, ExampleSentence, Mark, MweId, Occurrence,
    ReviewLogEntry, SentenceId, UserId, UserSettings,
};

/// Durable storage the engine reads and writes through.
///
/// Implementations report their own failures as
/// [`EngineError::StoreUnavailable`](super::error::EngineError::StoreUnavailable).
/// Engine operations wrap their reads and writes in [`Store::atomically`];
/// callers are expected to hold the per-user lock around each operation.
pub trait Store {
    /// Runs `f` as one unit: if it returns an error nothing it wrote is kept.
    fn atomically<T, F>(&mut self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Self) -> EngineResult<T>;

    /// Fails with `NotFound` when the user does not exist.
    fn user_settings(&mut self, user: UserId) -> EngineResult<UserSettings>;
    fn save_user_settings(&mut self, user: UserId, settings: &UserSettings) -> EngineResult<()>;

    fn insert_deck(
        &mut self,
        user: UserId,
        title: &str,
        lang: &str,
        created_at: DateTime<Utc>,
    ) -> EngineResult<DeckId>;
    fn deck(&mut self, deck: DeckId) -> EngineResult<Option<Deck>>;
    /// Newest first.
    fn decks(&mut self, user: UserId) -> EngineResult<Vec<Deck>>;
    /// Removes the deck with its sentences and occurrences.
    fn remove_deck(&mut self, deck: DeckId) -> EngineResult<()>;

    fn insert_sentence(&mut self, deck: DeckId, text: &str, token_count: i32) -> EngineResult<SentenceId>;
    /// Stable id for a multi-word expression, created on first use.
    fn intern_mwe(&mut self, lemma: &str, pos: &str) -> EngineResult<MweId>;
    /// Returns false when an occurrence already exists at that sentence position.
    fn insert_occurrence(&mut self, occurrence: &Occurrence) -> EngineResult<bool>;
    fn deck_occurrences(&mut self, deck: DeckId) -> EngineResult<Vec<Occurrence>>;
    /// Every sentence in the user's decks containing `key`, one entry per token position.
    fn evidence(&mut self, user: UserId, key: &CardKey) -> EngineResult<Vec<ExampleSentence>>;
    /// Every occurrence in the user's decks with its sentence, in one read.
    fn user_evidence(&mut self, user: UserId) -> EngineResult<Vec<(CardKey, ExampleSentence)>>;

    fn lemma_mark(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<Option<Mark>>;
    /// Replaces any existing mark for the key.
    fn set_lemma_mark(
        &mut self,
        user: UserId,
        lemma: &str,
        pos: &str,
        mark: Mark,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;
    /// Returns whether a mark was removed.
    fn clear_lemma_mark(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<bool>;
    fn count_marks(&mut self, user: UserId, mark: Mark) -> EngineResult<usize>;
    /// (lemma, pos) of every known or ignored mark.
    fn marked_lemmas(&mut self, user: UserId) -> EngineResult<Vec<(String, String)>>;

    fn card(&mut self, card: CardId) -> EngineResult<Option<Card>>;
    fn find_card(&mut self, user: UserId, key: &CardKey) -> EngineResult<Option<Card>>;
    /// Cards of any group whose key carries this lemma and part of speech.
    fn cards_for_lemma(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<Vec<Card>>;
    fn insert_card(
        &mut self,
        user: UserId,
        key: &CardKey,
        state: &SchedulerState,
        created_at: DateTime<Utc>,
    ) -> EngineResult<CardId>;
    fn set_card_retired(&mut self, card: CardId, retired_at: Option<DateTime<Utc>>) -> EngineResult<()>;
    fn set_card_introduced(&mut self, card: CardId, at: DateTime<Utc>) -> EngineResult<()>;
    fn save_state(&mut self, card: CardId, state: &SchedulerState) -> EngineResult<()>;
    /// Active, already-reviewed cards due at or before `as_of`, earliest due
    /// first, ties by card id.
    fn due_cards(&mut self, user: UserId, as_of: DateTime<Utc>) -> EngineResult<Vec<Card>>;
    /// Active cards still in the new stage, by card id.
    fn new_cards(&mut self, user: UserId) -> EngineResult<Vec<Card>>;
    /// Keys of cards that have been graded at least once, retired or not.
    fn started_keys(&mut self, user: UserId) -> EngineResult<Vec<CardKey>>;
    /// Cards whose `introduced_at` lies in `[from, to)`.
    fn count_introduced(
        &mut self,
        user: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<usize>;

    fn append_review(&mut self, entry: &ReviewLogEntry) -> EngineResult<()>;
    fn reviews(&mut self, card: CardId) -> EngineResult<Vec<ReviewLogEntry>>;
}
