//! The per-user set of reviewable cards.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;

use super::error::EngineResult;
use super::knowledge;
use super::scheduler::SchedulerState;
use super::store::Store;
use super::types::{Card, CardKey, DeckId, ExampleSentence, Occurrence, SentenceId, UserId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnsureReport {
    pub created: usize,
    pub existing: usize,
    pub revived: usize,
    pub skipped_marked: usize,
}

/// Creates a card for every distinct key in `occurrences` that the user has
/// neither marked known nor ignored. Repeated calls create nothing new.
///
/// A retired card whose lemma is no longer marked is brought back instead
/// of duplicated.
pub fn ensure_cards<S: Store>(
    store: &mut S,
    user: UserId,
    occurrences: &[Occurrence],
    now: DateTime<Utc>,
) -> EngineResult<EnsureReport> {
    let keys: BTreeSet<&CardKey> = occurrences.iter().map(|o| &o.key).collect();

    store.atomically(|store| {
        store.user_settings(user)?;
        let mut report = EnsureReport::default();

        for key in keys {
            if knowledge::is_marked(store, user, &key.lemma, &key.pos)? {
                report.skipped_marked += 1;
                continue;
            }
            match store.find_card(user, key)? {
                Some(card) if card.is_retired() => {
                    store.set_card_retired(card.id, None)?;
                    report.revived += 1;
                }
                Some(_) => report.existing += 1,
                None => {
                    store.insert_card(user, key, &SchedulerState::new(), now)?;
                    report.created += 1;
                }
            }
        }

        log::debug!("user {} ensure_cards: {:?}", user, report);
        Ok(report)
    })
}

/// Cards due at or before `as_of`, earliest first, ties by card id.
pub fn list_due<S: Store>(store: &mut S, user: UserId, as_of: DateTime<Utc>) -> EngineResult<Vec<Card>> {
    store.user_settings(user)?;
    store.due_cards(user, as_of)
}

/// New cards introduced during the UTC day containing `as_of`.
pub fn count_new_introduced_today<S: Store>(
    store: &mut S,
    user: UserId,
    as_of: DateTime<Utc>,
) -> EngineResult<usize> {
    let (start, end) = day_bounds(as_of);
    store.count_introduced(user, start, end)
}

/// `[midnight, next midnight)` in UTC around `at`.
pub fn day_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = at.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Most sentences listed on the back of a card.
pub const MAX_EXAMPLES: usize = 5;

/// Presentation order: fewest tokens, then lowest (deck, sentence, token position).
pub fn example_rank(example: &ExampleSentence) -> (i32, DeckId, SentenceId, i32) {
    (
        example.token_count,
        example.deck_id,
        example.sentence_id,
        example.token_index,
    )
}

/// The shortest sentence evidencing `key`.
pub fn best_example<S: Store>(
    store: &mut S,
    user: UserId,
    key: &CardKey,
) -> EngineResult<Option<ExampleSentence>> {
    Ok(store.evidence(user, key)?.into_iter().min_by_key(example_rank))
}

/// All sentences evidencing `key`, in presentation order, one entry per sentence.
pub fn examples<S: Store>(store: &mut S, user: UserId, key: &CardKey) -> EngineResult<Vec<ExampleSentence>> {
    Ok(ordered_examples(store.evidence(user, key)?))
}

pub fn ordered_examples(mut examples: Vec<ExampleSentence>) -> Vec<ExampleSentence> {
    examples.sort_by_key(example_rank);
    examples.dedup_by_key(|e| (e.deck_id, e.sentence_id));
    examples
}

/// Occurrences per deck as `(deck title, count)`, by deck id.
pub fn deck_counts(evidence: &[ExampleSentence]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<DeckId, (String, usize)> = BTreeMap::new();
    for example in evidence {
        counts
            .entry(example.deck_id)
            .or_insert_with(|| (example.deck_title.clone(), 0))
            .1 += 1;
    }
    counts.into_values().collect()
}
