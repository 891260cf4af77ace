use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::prelude::*;
use diesel::sql_types::Integer;

use crate::data::models::{CardRow, CardStateRow, DeckRow, OccurrenceRow, ReviewLogRow};
use crate::engine::scheduler::{Grade, SchedulerState, Stage};
use crate::engine::{
    Card, CardId, CardKey, Deck, DeckId, EngineError, EngineResult, Entity, ExampleSentence, Mark,
    MweId, Occurrence, ReviewLogEntry, SentenceId, Store, UserId, UserSettings,
};
use crate::schema::{card_states, cards, decks, lemma_marks, mwe_groups, occurrences, review_log, sentences, users};

/// [`Store`] over one SQLite connection. Each `atomically` call is a
/// transaction; nested calls become savepoints.
pub struct SqliteStore<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        Self { conn }
    }

    fn last_insert_rowid(&mut self) -> EngineResult<i32> {
        Ok(diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()")).get_result::<i32>(self.conn)?)
    }
}

fn naive(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc()
}

fn utc(at: NaiveDateTime) -> DateTime<Utc> {
    at.and_utc()
}

fn parse_stage(value: &str) -> EngineResult<Stage> {
    Stage::parse(value).ok_or_else(|| EngineError::StoreUnavailable(format!("unknown stage '{}' in database", value)))
}

fn key_of(lemma: String, pos: String, mwe_id: Option<i32>) -> CardKey {
    CardKey { lemma, pos, mwe_id }
}

fn state_from_row(row: CardStateRow) -> EngineResult<SchedulerState> {
    Ok(SchedulerState {
        stage: parse_stage(&row.stage)?,
        stability: row.stability,
        difficulty: row.difficulty,
        due: row.due.map(utc),
        last_reviewed: row.last_reviewed.map(utc),
        reps: row.reps,
        lapses: row.lapses,
    })
}

fn card_from_rows((card, state): (CardRow, CardStateRow)) -> EngineResult<Card> {
    Ok(Card {
        id: card.card_id,
        user_id: card.user_id,
        key: key_of(card.lemma, card.pos, card.mwe_id),
        created_at: utc(card.created_at),
        introduced_at: card.introduced_at.map(utc),
        retired_at: card.retired_at.map(utc),
        state: state_from_row(state)?,
    })
}

fn deck_from_row(row: DeckRow) -> Deck {
    Deck {
        id: row.deck_id,
        user_id: row.user_id,
        title: row.title,
        lang: row.lang,
        created_at: utc(row.created_at),
    }
}

fn review_from_row(row: ReviewLogRow) -> EngineResult<ReviewLogEntry> {
    let grade = Grade::try_from(row.grade)
        .map_err(|_| EngineError::StoreUnavailable(format!("invalid grade {} in review log", row.grade)))?;
    Ok(ReviewLogEntry {
        card_id: row.card_id,
        user_id: row.user_id,
        grade,
        stage_before: parse_stage(&row.stage_before)?,
        state_after: SchedulerState {
            stage: parse_stage(&row.stage_after)?,
            stability: row.stability,
            difficulty: row.difficulty,
            due: row.due.map(utc),
            last_reviewed: row.last_reviewed.map(utc),
            reps: row.reps,
            lapses: row.lapses,
        },
        reviewed_at: utc(row.reviewed_at),
    })
}

type EvidenceRow = (OccurrenceRow, String, i32, String);

fn example_from_row((occurrence, text, token_count, deck_title): EvidenceRow) -> (CardKey, ExampleSentence) {
    let example = ExampleSentence {
        deck_id: occurrence.deck_id,
        sentence_id: occurrence.sentence_id,
        token_index: occurrence.token_index,
        form: occurrence.form,
        grammar_label: occurrence.grammar_label,
        text,
        token_count,
        deck_title,
    };
    (key_of(occurrence.lemma, occurrence.pos, occurrence.mwe_id), example)
}

fn require_updated(rows: usize, missing: Entity) -> EngineResult<()> {
    if rows == 0 {
        return Err(EngineError::NotFound(missing));
    }
    Ok(())
}

impl Store for SqliteStore<'_> {
    fn atomically<T, F>(&mut self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Self) -> EngineResult<T>,
    {
        AnsiTransactionManager::begin_transaction(&mut *self.conn)?;
        match f(self) {
            Ok(value) => {
                AnsiTransactionManager::commit_transaction(&mut *self.conn)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = AnsiTransactionManager::rollback_transaction(&mut *self.conn) {
                    log::error!("rollback failed after '{}': {}", e, rollback);
                }
                Err(e)
            }
        }
    }

    fn user_settings(&mut self, user: UserId) -> EngineResult<UserSettings> {
        let json = users::table
            .find(user)
            .select(users::settings_json)
            .first::<String>(self.conn)
            .optional()?
            .ok_or(EngineError::NotFound(Entity::User(user)))?;
        match serde_json::from_str::<UserSettings>(&json) {
            Ok(settings) => Ok(settings.sanitized()),
            Err(e) => {
                log::warn!("user {} has unreadable settings, using defaults: {}", user, e);
                Ok(UserSettings::default())
            }
        }
    }

    fn save_user_settings(&mut self, user: UserId, settings: &UserSettings) -> EngineResult<()> {
        let json = serde_json::to_string(settings).map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;
        let rows = diesel::update(users::table.find(user))
            .set(users::settings_json.eq(json))
            .execute(self.conn)?;
        require_updated(rows, Entity::User(user))
    }

    fn insert_deck(
        &mut self,
        user: UserId,
        title: &str,
        lang: &str,
        created_at: DateTime<Utc>,
    ) -> EngineResult<DeckId> {
        diesel::insert_into(decks::table)
            .values((
                decks::user_id.eq(user),
                decks::title.eq(title),
                decks::lang.eq(lang),
                decks::created_at.eq(naive(created_at)),
            ))
            .execute(self.conn)?;
        self.last_insert_rowid()
    }

    fn deck(&mut self, deck: DeckId) -> EngineResult<Option<Deck>> {
        let row = decks::table
            .find(deck)
            .select(DeckRow::as_select())
            .first::<DeckRow>(self.conn)
            .optional()?;
        Ok(row.map(deck_from_row))
    }

    fn decks(&mut self, user: UserId) -> EngineResult<Vec<Deck>> {
        let rows = decks::table
            .filter(decks::user_id.eq(user))
            .order((decks::created_at.desc(), decks::deck_id.desc()))
            .select(DeckRow::as_select())
            .load::<DeckRow>(self.conn)?;
        Ok(rows.into_iter().map(deck_from_row).collect())
    }

    fn remove_deck(&mut self, deck: DeckId) -> EngineResult<()> {
        diesel::delete(occurrences::table.filter(occurrences::deck_id.eq(deck))).execute(self.conn)?;
        diesel::delete(sentences::table.filter(sentences::deck_id.eq(deck))).execute(self.conn)?;
        diesel::delete(decks::table.find(deck)).execute(self.conn)?;
        Ok(())
    }

    fn insert_sentence(&mut self, deck: DeckId, text: &str, token_count: i32) -> EngineResult<SentenceId> {
        diesel::insert_into(sentences::table)
            .values((
                sentences::deck_id.eq(deck),
                sentences::text.eq(text),
                sentences::token_count.eq(token_count),
            ))
            .execute(self.conn)?;
        self.last_insert_rowid()
    }

    fn intern_mwe(&mut self, lemma: &str, pos: &str) -> EngineResult<MweId> {
        let existing = mwe_groups::table
            .filter(mwe_groups::lemma.eq(lemma))
            .filter(mwe_groups::pos.eq(pos))
            .select(mwe_groups::mwe_id)
            .first::<i32>(self.conn)
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        diesel::insert_into(mwe_groups::table)
            .values((mwe_groups::lemma.eq(lemma), mwe_groups::pos.eq(pos)))
            .execute(self.conn)?;
        self.last_insert_rowid()
    }

    fn insert_occurrence(&mut self, occurrence: &Occurrence) -> EngineResult<bool> {
        let rows = diesel::insert_into(occurrences::table)
            .values((
                occurrences::sentence_id.eq(occurrence.sentence_id),
                occurrences::token_index.eq(occurrence.token_index),
                occurrences::deck_id.eq(occurrence.deck_id),
                occurrences::form.eq(&occurrence.form),
                occurrences::lemma.eq(&occurrence.key.lemma),
                occurrences::pos.eq(&occurrence.key.pos),
                occurrences::mwe_id.eq(occurrence.key.mwe_id),
                occurrences::grammar_label.eq(occurrence.grammar_label.as_deref()),
            ))
            .on_conflict((occurrences::sentence_id, occurrences::token_index))
            .do_nothing()
            .execute(self.conn)?;
        Ok(rows > 0)
    }

    fn deck_occurrences(&mut self, deck: DeckId) -> EngineResult<Vec<Occurrence>> {
        let rows = occurrences::table
            .filter(occurrences::deck_id.eq(deck))
            .order((occurrences::sentence_id.asc(), occurrences::token_index.asc()))
            .select(OccurrenceRow::as_select())
            .load::<OccurrenceRow>(self.conn)?;
        Ok(rows
            .into_iter()
            .map(|row| Occurrence {
                deck_id: row.deck_id,
                sentence_id: row.sentence_id,
                token_index: row.token_index,
                form: row.form,
                key: key_of(row.lemma, row.pos, row.mwe_id),
                grammar_label: row.grammar_label,
            })
            .collect())
    }

    fn evidence(&mut self, user: UserId, key: &CardKey) -> EngineResult<Vec<ExampleSentence>> {
        let rows = occurrences::table
            .inner_join(sentences::table)
            .inner_join(decks::table)
            .filter(decks::user_id.eq(user))
            .filter(occurrences::lemma.eq(&key.lemma))
            .filter(occurrences::pos.eq(&key.pos))
            .filter(occurrences::mwe_id.is(key.mwe_id))
            .select((OccurrenceRow::as_select(), sentences::text, sentences::token_count, decks::title))
            .load::<EvidenceRow>(self.conn)?;
        Ok(rows.into_iter().map(|row| example_from_row(row).1).collect())
    }

    fn user_evidence(&mut self, user: UserId) -> EngineResult<Vec<(CardKey, ExampleSentence)>> {
        let rows = occurrences::table
            .inner_join(sentences::table)
            .inner_join(decks::table)
            .filter(decks::user_id.eq(user))
            .order((occurrences::sentence_id.asc(), occurrences::token_index.asc()))
            .select((OccurrenceRow::as_select(), sentences::text, sentences::token_count, decks::title))
            .load::<EvidenceRow>(self.conn)?;
        Ok(rows.into_iter().map(example_from_row).collect())
    }

    fn lemma_mark(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<Option<Mark>> {
        let mark = lemma_marks::table
            .find((user, lemma, pos))
            .select(lemma_marks::mark)
            .first::<String>(self.conn)
            .optional()?;
        match mark {
            Some(value) => Mark::parse(&value)
                .map(Some)
                .ok_or_else(|| EngineError::StoreUnavailable(format!("unknown mark '{}' in database", value))),
            None => Ok(None),
        }
    }

    fn set_lemma_mark(
        &mut self,
        user: UserId,
        lemma: &str,
        pos: &str,
        mark: Mark,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        diesel::insert_into(lemma_marks::table)
            .values((
                lemma_marks::user_id.eq(user),
                lemma_marks::lemma.eq(lemma),
                lemma_marks::pos.eq(pos),
                lemma_marks::mark.eq(mark.as_str()),
                lemma_marks::marked_at.eq(naive(at)),
            ))
            .on_conflict((lemma_marks::user_id, lemma_marks::lemma, lemma_marks::pos))
            .do_update()
            .set((
                lemma_marks::mark.eq(mark.as_str()),
                lemma_marks::marked_at.eq(naive(at)),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn clear_lemma_mark(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<bool> {
        let rows = diesel::delete(lemma_marks::table.find((user, lemma, pos))).execute(self.conn)?;
        Ok(rows > 0)
    }

    fn count_marks(&mut self, user: UserId, mark: Mark) -> EngineResult<usize> {
        let count = lemma_marks::table
            .filter(lemma_marks::user_id.eq(user))
            .filter(lemma_marks::mark.eq(mark.as_str()))
            .count()
            .get_result::<i64>(self.conn)?;
        Ok(count as usize)
    }

    fn marked_lemmas(&mut self, user: UserId) -> EngineResult<Vec<(String, String)>> {
        Ok(lemma_marks::table
            .filter(lemma_marks::user_id.eq(user))
            .select((lemma_marks::lemma, lemma_marks::pos))
            .load::<(String, String)>(self.conn)?)
    }

    fn card(&mut self, card: CardId) -> EngineResult<Option<Card>> {
        cards::table
            .inner_join(card_states::table)
            .filter(cards::card_id.eq(card))
            .select((CardRow::as_select(), CardStateRow::as_select()))
            .first::<(CardRow, CardStateRow)>(self.conn)
            .optional()?
            .map(card_from_rows)
            .transpose()
    }

    fn find_card(&mut self, user: UserId, key: &CardKey) -> EngineResult<Option<Card>> {
        cards::table
            .inner_join(card_states::table)
            .filter(cards::user_id.eq(user))
            .filter(cards::lemma.eq(&key.lemma))
            .filter(cards::pos.eq(&key.pos))
            .filter(cards::mwe_id.is(key.mwe_id))
            .select((CardRow::as_select(), CardStateRow::as_select()))
            .first::<(CardRow, CardStateRow)>(self.conn)
            .optional()?
            .map(card_from_rows)
            .transpose()
    }

    fn cards_for_lemma(&mut self, user: UserId, lemma: &str, pos: &str) -> EngineResult<Vec<Card>> {
        cards::table
            .inner_join(card_states::table)
            .filter(cards::user_id.eq(user))
            .filter(cards::lemma.eq(lemma))
            .filter(cards::pos.eq(pos))
            .order(cards::card_id.asc())
            .select((CardRow::as_select(), CardStateRow::as_select()))
            .load::<(CardRow, CardStateRow)>(self.conn)?
            .into_iter()
            .map(card_from_rows)
            .collect()
    }

    fn insert_card(
        &mut self,
        user: UserId,
        key: &CardKey,
        state: &SchedulerState,
        created_at: DateTime<Utc>,
    ) -> EngineResult<CardId> {
        diesel::insert_into(cards::table)
            .values((
                cards::user_id.eq(user),
                cards::lemma.eq(&key.lemma),
                cards::pos.eq(&key.pos),
                cards::mwe_id.eq(key.mwe_id),
                cards::created_at.eq(naive(created_at)),
            ))
            .execute(self.conn)?;
        let card = self.last_insert_rowid()?;
        diesel::insert_into(card_states::table)
            .values((
                card_states::card_id.eq(card),
                card_states::stage.eq(state.stage.as_str()),
                card_states::stability.eq(state.stability),
                card_states::difficulty.eq(state.difficulty),
                card_states::due.eq(state.due.map(naive)),
                card_states::last_reviewed.eq(state.last_reviewed.map(naive)),
                card_states::reps.eq(state.reps),
                card_states::lapses.eq(state.lapses),
            ))
            .execute(self.conn)?;
        Ok(card)
    }

    fn set_card_retired(&mut self, card: CardId, retired_at: Option<DateTime<Utc>>) -> EngineResult<()> {
        let rows = diesel::update(cards::table.find(card))
            .set(cards::retired_at.eq(retired_at.map(naive)))
            .execute(self.conn)?;
        require_updated(rows, Entity::Card(card))
    }

    fn set_card_introduced(&mut self, card: CardId, at: DateTime<Utc>) -> EngineResult<()> {
        let rows = diesel::update(cards::table.find(card))
            .set(cards::introduced_at.eq(Some(naive(at))))
            .execute(self.conn)?;
        require_updated(rows, Entity::Card(card))
    }

    fn save_state(&mut self, card: CardId, state: &SchedulerState) -> EngineResult<()> {
        let rows = diesel::update(card_states::table.find(card))
            .set((
                card_states::stage.eq(state.stage.as_str()),
                card_states::stability.eq(state.stability),
                card_states::difficulty.eq(state.difficulty),
                card_states::due.eq(state.due.map(naive)),
                card_states::last_reviewed.eq(state.last_reviewed.map(naive)),
                card_states::reps.eq(state.reps),
                card_states::lapses.eq(state.lapses),
            ))
            .execute(self.conn)?;
        require_updated(rows, Entity::Card(card))
    }

    fn due_cards(&mut self, user: UserId, as_of: DateTime<Utc>) -> EngineResult<Vec<Card>> {
        cards::table
            .inner_join(card_states::table)
            .filter(cards::user_id.eq(user))
            .filter(cards::retired_at.is_null())
            .filter(card_states::stage.ne(Stage::New.as_str()))
            .filter(card_states::due.le(naive(as_of)))
            .order((card_states::due.asc(), cards::card_id.asc()))
            .select((CardRow::as_select(), CardStateRow::as_select()))
            .load::<(CardRow, CardStateRow)>(self.conn)?
            .into_iter()
            .map(card_from_rows)
            .collect()
    }

    fn new_cards(&mut self, user: UserId) -> EngineResult<Vec<Card>> {
        cards::table
            .inner_join(card_states::table)
            .filter(cards::user_id.eq(user))
            .filter(cards::retired_at.is_null())
            .filter(card_states::stage.eq(Stage::New.as_str()))
            .order(cards::card_id.asc())
            .select((CardRow::as_select(), CardStateRow::as_select()))
            .load::<(CardRow, CardStateRow)>(self.conn)?
            .into_iter()
            .map(card_from_rows)
            .collect()
    }

    fn started_keys(&mut self, user: UserId) -> EngineResult<Vec<CardKey>> {
        let rows = cards::table
            .inner_join(card_states::table)
            .filter(cards::user_id.eq(user))
            .filter(card_states::stage.ne(Stage::New.as_str()))
            .select((cards::lemma, cards::pos, cards::mwe_id))
            .load::<(String, String, Option<i32>)>(self.conn)?;
        Ok(rows
            .into_iter()
            .map(|(lemma, pos, mwe_id)| key_of(lemma, pos, mwe_id))
            .collect())
    }

    fn count_introduced(
        &mut self,
        user: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let count = cards::table
            .filter(cards::user_id.eq(user))
            .filter(cards::introduced_at.ge(naive(from)))
            .filter(cards::introduced_at.lt(naive(to)))
            .count()
            .get_result::<i64>(self.conn)?;
        Ok(count as usize)
    }

    fn append_review(&mut self, entry: &ReviewLogEntry) -> EngineResult<()> {
        let state = &entry.state_after;
        diesel::insert_into(review_log::table)
            .values((
                review_log::card_id.eq(entry.card_id),
                review_log::user_id.eq(entry.user_id),
                review_log::grade.eq(entry.grade.value()),
                review_log::stage_before.eq(entry.stage_before.as_str()),
                review_log::stage_after.eq(state.stage.as_str()),
                review_log::stability.eq(state.stability),
                review_log::difficulty.eq(state.difficulty),
                review_log::due.eq(state.due.map(naive)),
                review_log::last_reviewed.eq(state.last_reviewed.map(naive)),
                review_log::reps.eq(state.reps),
                review_log::lapses.eq(state.lapses),
                review_log::reviewed_at.eq(naive(entry.reviewed_at)),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn reviews(&mut self, card: CardId) -> EngineResult<Vec<ReviewLogEntry>> {
        review_log::table
            .filter(review_log::card_id.eq(card))
            .order(review_log::review_id.asc())
            .select(ReviewLogRow::as_select())
            .load::<ReviewLogRow>(self.conn)?
            .into_iter()
            .map(review_from_row)
            .collect()
    }
}
