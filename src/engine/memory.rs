//! In-memory [`Store`] for tests and ephemeral hosts.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use super::error::{EngineError, EngineResult, Entity};
use super::scheduler::{SchedulerState, Stage};
use super::store::Store;
use super::types::{
    Card, CardId, CardKey, Deck, DeckId, ExampleSentence, Mark, MweId, Occurrence,
    ReviewLogEntry, SentenceId, UserId, UserSettings,
};

#[derive(Debug, Clone)]
struct SentenceRecord {
    deck_id: DeckId,
    text: String,
    token_count: i32,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, UserSettings>,
    decks: BTreeMap<DeckId, Deck>,
    sentences: BTreeMap<SentenceId, SentenceRecord>,
    mwe_groups: BTreeMap<(String, String), MweId>,
    occurrences: BTreeMap<(SentenceId, i32), Occurrence>,
    marks: HashMap<(UserId, String, String), Mark>,
    cards: BTreeMap<CardId, Card>,
    reviews: Vec<ReviewLogEntry>,
    next_id: i32,
}

impl Tables {
    fn allocate(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Transactions snapshot the tables and restore them when the closure fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    fail_after_writes: Option<usize>,
    lookups: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, settings: UserSettings) -> UserId {
        let id = self.tables.allocate();
        self.tables.users.insert(id, settings);
        id
    }

    /// Makes the write after `writes` more successful writes fail with
    /// `StoreUnavailable`.
    pub fn fail_after_writes(&mut self, writes: usize) {
        self.fail_after_writes = Some(writes);
    }

    /// Single-key reads served so far (`evidence`, `lemma_mark`, `find_card`).
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn card_count(&self, user: UserId) -> usize {
        self.tables.cards.values().filter(|c| c.user_id == user).count()
    }

    fn write(&mut self) -> EngineResult<()> {
        match self.fail_after_writes {
            Some(0) => {
                self.fail_after_writes = None;
                Err(EngineError::StoreUnavailable("injected write failure".to_string()))
            }
            Some(n) => {
                self.fail_after_writes = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn user_decks(&self, user: UserId) -> BTreeSet<DeckId> {
        self.tables
            .decks
            .values()
            .filter(|d| d.user_id == user)
            .map(|d| d.id)
            .collect()
    }

    fn card_mut(&mut self, card: CardId) -> EngineResult<&mut Card> {
        self.tables
            .cards
            .get_mut(&card)
            .ok_or(EngineError::NotFound(Entity::Card(card)))
    }
}

impl Store for MemoryStore {
    fn atomically<T, F>(&mut self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Self) -> EngineResult<T>,
    {
        let snapshot = self.tables.clone();
        let result = f(self);
        if result.is_err() {
            self.tables = snapshot;
        }
        result
    }

    fn user_settings(&mut self, user: UserId) -> EngineResult<UserSettings> {
        self.tables
            .users
            .get(&user)
            .cloned()
            .ok_or(EngineError::NotFound(Entity::User(user)))
    }

    fn save_user_settings(&mut self, user: UserId, settings: &UserSettings) -> EngineResult<()> {
        self.write()?;
        match self.tables.users.get_mut(&user) {
            Some(existing) => {
                *existing = settings.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound(Entity::User(user))),
        }
    }

    fn insert_deck(
        &mut self,
        user: UserId,
        title: &str,
        lang: &str,
        created_at: DateTime<Utc>,
    ) -> EngineResult<DeckId> {
        self.write()?;
        let id = self.tables.allocate();
        self.tables.decks.insert(
            id,
            Deck {
                id,
                user_id: user,
                title: title.to_string(),
                lang: lang.to_string(),
                created_at,
            },
        );
        Ok(id)
    }

    fn deck(&mut self, deck: DeckId) -> EngineResult<Option<Deck>> {
        Ok(self.tables.decks.get(&deck).cloned())
    }

    fn decks(&mut self, user: UserId) -> EngineResult<Vec<Deck>> {
        let mut decks: Vec<Deck> = self
            .tables
            .decks
            .values()
            .filter(|d| d.user_id == user)
            .cloned()
            .collect();
        decks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(decks)
    }

    fn remove_deck(&mut self, deck: DeckId) -> EngineResult<()> {
        self.write()?;
        self.tables.decks.remove(&deck);
        self.tables.sentences.retain(|_, s| s.deck_id != deck);
        self.tables.occurrences.retain(|_, o| o.deck_id != deck);
        Ok(())
    }

    fn insert_sentence(&mut self, deck: DeckId, text: &str, token_count: i32) -> EngineResult<SentenceId> {
        self.write()?;
        let id = self.tables.allocate();
        self.tables.sentences.insert(
            id,
            SentenceRecord {
                deck_id: deck,
                text: text.to_string(),
                token_count,
            },
        );
        Ok(id)
    }

    fn intern_mwe(&mut self, lemma: &str, pos: &str) -> EngineResult<MweId> {
        let key = (lemma.to_string(), pos.to_string());
        if let Some(id) = self.tables.mwe_groups.get(&key) {
            return Ok(*id);
        }
        self.write()?;
        let id = self.tables.allocate();
        self.tables.mwe_groups.insert(key, id);
        Ok(id)
    }

    fn insert_occurrence(&mut self, occurrence: &Occurrence) -> EngineResult<bool> {
        let position = (occurrence.sentence_id, occurrence.token_index);
        if self.tables.occurrences.contains_key(&position) {
            return Ok(false);
        }
        self.write()?;
        self.tables.occurrences.insert(position, occurrence.clone());
        Ok(true)
    }

    fn deck_occurrences(&mut self, deck: DeckId) -> EngineResult<Vec<Occurrence>> {
        Ok(self
            .tables
            .occurrences
            .values()
            .filter(|o| o.deck_id == deck)
            .cloned()
            .collect())
    }

    fn evidence(&mut self, user: UserId, key: &CardKey) -> EngineResult<Vec<ExampleSentence>> {
        self.lookups += 1;
        Ok(self
            .user_evidence(user)?
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, example)| example)
            .collect())
    }

    fn user_evidence(&mut self, user: UserId) -> EngineResult<Vec<(CardKey, ExampleSentence)>> {
        let decks = self.user_decks(user);
        let tables = &self.tables;
        Ok(tables
            .occurrences
            .values()
            .filter(|o| decks.contains(&o.deck_id))
            .filter_map(|o| {
                let sentence = tables.sentences.get(&o.sentence_id)?;
                let deck = tables.decks.get(&o.deck_id)?;
                let example = ExampleSentence {
                    deck_id: o.deck_id,
                    sentence_id: o.sentence_id,
                    token_index: o.token_index,
                    form: o.form.clone(),
                    grammar_label: o.grammar_label.clone(),
                    text: sentence.text.clone(),
                    token_count: sentence.token_count,
                    deck_title: deck.title.clone(),
                };
                Some((o.key.clone(), example))
            })
            .collect())
    }

    fn lemma_mark(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<Option<Mark>> {
        self.lookups += 1;
        Ok(self
            .tables
            .marks
            .get(&(user, lemma.to_string(), pos.to_string()))
            .copied())
    }

    fn set_lemma_mark(
        &mut self,
        user: UserId,
        lemma: &str,
        pos: &str,
        mark: Mark,
        _at: DateTime<Utc>,
    ) -> EngineResult<()> {
        self.write()?;
        self.tables
            .marks
            .insert((user, lemma.to_string(), pos.to_string()), mark);
        Ok(())
    }

    fn clear_lemma_mark(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<bool> {
        self.write()?;
        Ok(self
            .tables
            .marks
            .remove(&(user, lemma.to_string(), pos.to_string()))
            .is_some())
    }

    fn count_marks(&mut self, user: UserId, mark: Mark) -> EngineResult<usize> {
        Ok(self
            .tables
            .marks
            .iter()
            .filter(|((u, _, _), m)| *u == user && **m == mark)
            .count())
    }

    fn marked_lemmas(&mut self, user: UserId) -> EngineResult<Vec<(String, String)>> {
        Ok(self
            .tables
            .marks
            .keys()
            .filter(|(u, _, _)| *u == user)
            .map(|(_, lemma, pos)| (lemma.clone(), pos.clone()))
            .collect())
    }

    fn card(&mut self, card: CardId) -> EngineResult<Option<Card>> {
        Ok(self.tables.cards.get(&card).cloned())
    }

    fn find_card(&mut self, user: UserId, key: &CardKey) -> EngineResult<Option<Card>> {
        self.lookups += 1;
        Ok(self
            .tables
            .cards
            .values()
            .find(|c| c.user_id == user && &c.key == key)
            .cloned())
    }

    fn cards_for_lemma(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<Vec<Card>> {
        Ok(self
            .tables
            .cards
            .values()
            .filter(|c| c.user_id == user && c.key.lemma == lemma && c.key.pos == pos)
            .cloned()
            .collect())
    }

    fn insert_card(
        &mut self,
        user: UserId,
        key: &CardKey,
        state: &SchedulerState,
        created_at: DateTime<Utc>,
    ) -> EngineResult<CardId> {
        if self.find_card(user, key)?.is_some() {
            return Err(EngineError::StoreUnavailable(format!(
                "card {}/{} already exists for user {}",
                key.lemma, key.pos, user
            )));
        }
        self.write()?;
        let id = self.tables.allocate();
        self.tables.cards.insert(
            id,
            Card {
                id,
                user_id: user,
                key: key.clone(),
                created_at,
                introduced_at: None,
                retired_at: None,
                state: state.clone(),
            },
        );
        Ok(id)
    }

    fn set_card_retired(&mut self, card: CardId, retired_at: Option<DateTime<Utc>>) -> EngineResult<()> {
        self.write()?;
        self.card_mut(card)?.retired_at = retired_at;
        Ok(())
    }

    fn set_card_introduced(&mut self, card: CardId, at: DateTime<Utc>) -> EngineResult<()> {
        self.write()?;
        self.card_mut(card)?.introduced_at = Some(at);
        Ok(())
    }

    fn save_state(&mut self, card: CardId, state: &SchedulerState) -> EngineResult<()> {
        self.write()?;
        self.card_mut(card)?.state = state.clone();
        Ok(())
    }

    fn due_cards(&mut self, user: UserId, as_of: DateTime<Utc>) -> EngineResult<Vec<Card>> {
        let mut due: Vec<Card> = self
            .tables
            .cards
            .values()
            .filter(|c| c.user_id == user && !c.is_retired() && c.state.is_due(as_of))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.state.due.cmp(&b.state.due).then(a.id.cmp(&b.id)));
        Ok(due)
    }

    fn new_cards(&mut self, user: UserId) -> EngineResult<Vec<Card>> {
        Ok(self
            .tables
            .cards
            .values()
            .filter(|c| c.user_id == user && !c.is_retired() && c.state.stage == Stage::New)
            .cloned()
            .collect())
    }

    fn started_keys(&mut self, user: UserId) -> EngineResult<Vec<CardKey>> {
        Ok(self
            .tables
            .cards
            .values()
            .filter(|c| c.user_id == user && c.state.stage != Stage::New)
            .map(|c| c.key.clone())
            .collect())
    }

    fn count_introduced(
        &mut self,
        user: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<usize> {
        Ok(self
            .tables
            .cards
            .values()
            .filter(|c| c.user_id == user)
            .filter(|c| c.introduced_at.is_some_and(|at| at >= from && at < to))
            .count())
    }

    fn append_review(&mut self, entry: &ReviewLogEntry) -> EngineResult<()> {
        self.write()?;
        self.tables.reviews.push(entry.clone());
        Ok(())
    }

    fn reviews(&mut self, card: CardId) -> EngineResult<Vec<ReviewLogEntry>> {
        Ok(self
            .tables
            .reviews
            .iter()
            .filter(|r| r.card_id == card)
            .cloned()
            .collect())
    }
}
