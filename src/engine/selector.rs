//! Chooses the next card to present.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog;
use super::error::EngineResult;
use super::knowledge;
use super::store::Store;
use super::types::{Card, CardKey, DeckId, ExampleSentence, SentenceId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    Due,
    New,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub card: Card,
    /// Sentence shown on the front. `None` only when every deck evidencing
    /// the card has been deleted.
    pub example: Option<ExampleSentence>,
    /// Grammar of the card's token in the front sentence.
    pub grammar: Option<String>,
    /// Back of the card: up to `catalog::MAX_EXAMPLES` sentences with their deck.
    pub examples: Vec<ExampleSentence>,
    /// `(deck title, occurrences)` for every deck containing the card.
    pub deck_counts: Vec<(String, usize)>,
    pub pick: Pick,
}

/// Next card for `user` at `now`.
///
/// Due cards come first, earliest due. Otherwise a new card is introduced
/// while today's new-card count is under the user's cap. Each new card's
/// sentences are ranked by fewest other unknown lemmas, then fewest tokens,
/// then lowest (deck, sentence). The card whose best sentence brings the
/// fewest unknowns wins (ties by card id) and is shown with that sentence.
/// A new card introduced earlier today but not yet answered is offered again
/// before any other new card and does not count against the cap twice.
pub fn next<S: Store>(store: &mut S, user: UserId, now: DateTime<Utc>) -> EngineResult<Option<Presentation>> {
    store.atomically(|store| {
        let settings = store.user_settings(user)?;

        for card in catalog::list_due(store, user, now)? {
            if knowledge::is_marked(store, user, &card.key.lemma, &card.key.pos)? {
                log::warn!("card {} is due but its lemma is marked; skipping", card.id);
                continue;
            }
            return present(store, user, card, None, Pick::Due).map(Some);
        }

        let marked: HashSet<(String, String)> = store.marked_lemmas(user)?.into_iter().collect();
        let is_marked = |key: &CardKey| marked.contains(&(key.lemma.clone(), key.pos.clone()));
        let candidates: Vec<Card> = store
            .new_cards(user)?
            .into_iter()
            .filter(|c| !is_marked(&c.key))
            .collect();

        let (day_start, day_end) = catalog::day_bounds(now);
        let pending = candidates
            .iter()
            .filter(|c| c.introduced_at.is_some_and(|at| at >= day_start && at < day_end))
            .min_by_key(|c| c.id)
            .cloned();
        if let Some(card) = pending {
            return present(store, user, card, None, Pick::New).map(Some);
        }

        let introduced = store.count_introduced(user, day_start, day_end)?;
        if introduced >= settings.new_per_day as usize {
            log::debug!("user {} reached the new-card cap ({})", user, settings.new_per_day);
            return Ok(None);
        }

        let started: HashSet<CardKey> = store.started_keys(user)?.into_iter().collect();
        let evidence = store.user_evidence(user)?;
        let mut sentence_keys: HashMap<SentenceId, BTreeSet<&CardKey>> = HashMap::new();
        let mut by_key: HashMap<&CardKey, Vec<&ExampleSentence>> = HashMap::new();
        for (key, example) in &evidence {
            sentence_keys.entry(example.sentence_id).or_default().insert(key);
            by_key.entry(key).or_default().push(example);
        }

        let mut best: Option<(SentenceRank, Card, ExampleSentence)> = None;
        for card in candidates {
            let Some(examples) = by_key.get(&card.key) else {
                continue;
            };
            let ranked = examples.iter().map(|example| {
                let others = sentence_keys
                    .get(&example.sentence_id)
                    .map(|keys| {
                        keys.iter()
                            .filter(|k| ***k != card.key && !is_marked(**k) && !started.contains(**k))
                            .count()
                    })
                    .unwrap_or(0);
                (rank(others, example), *example)
            });
            let Some((card_rank, example)) = ranked.min_by_key(|(r, _)| *r) else {
                continue;
            };
            let better = match &best {
                Some((best_rank, best_card, _)) => (card_rank.0, card.id) < (best_rank.0, best_card.id),
                None => true,
            };
            if better {
                best = Some((card_rank, card, example.clone()));
            }
        }

        match best {
            Some((card_rank, mut card, example)) => {
                store.set_card_introduced(card.id, now)?;
                card.introduced_at = Some(now);
                log::debug!(
                    "user {} introduced card {} ({} other unknown lemmas)",
                    user,
                    card.id,
                    card_rank.0
                );
                present(store, user, card, Some(example), Pick::New).map(Some)
            }
            None => Ok(None),
        }
    })
}

/// (other unknown lemmas, tokens, deck, sentence, token position)
type SentenceRank = (usize, i32, DeckId, SentenceId, i32);

fn rank(others: usize, example: &ExampleSentence) -> SentenceRank {
    let (tokens, deck, sentence, position) = catalog::example_rank(example);
    (others, tokens, deck, sentence, position)
}

/// Builds the front and back of `card`. Without a chosen sentence the
/// shortest one is shown.
fn present<S: Store>(
    store: &mut S,
    user: UserId,
    card: Card,
    example: Option<ExampleSentence>,
    pick: Pick,
) -> EngineResult<Presentation> {
    let evidence = store.evidence(user, &card.key)?;
    let deck_counts = catalog::deck_counts(&evidence);
    let example = example.or_else(|| evidence.iter().min_by_key(|e| catalog::example_rank(e)).cloned());
    let mut examples = catalog::ordered_examples(evidence);
    examples.truncate(catalog::MAX_EXAMPLES);

    Ok(Presentation {
        grammar: example.as_ref().and_then(|e| e.grammar_label.clone()),
        card,
        example,
        examples,
        deck_counts,
        pick,
    })
}
