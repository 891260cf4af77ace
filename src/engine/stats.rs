use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog;
use super::error::EngineResult;
use super::store::Store;
use super::types::{CardKey, DeckId, Mark, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckSummary {
    pub id: DeckId,
    pub title: String,
    pub lang: String,
    pub known: usize,
    pub unique: usize,
    pub due: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub known_count: usize,
    pub due_count: usize,
    pub new_capacity_today: usize,
    pub decks: Vec<DeckSummary>,
}

pub fn dashboard<S: Store>(store: &mut S, user: UserId, now: DateTime<Utc>) -> EngineResult<Dashboard> {
    let settings = store.user_settings(user)?;
    let due_cards = catalog::list_due(store, user, now)?;
    let due_keys: BTreeSet<CardKey> = due_cards.iter().map(|c| c.key.clone()).collect();

    let introduced = catalog::count_new_introduced_today(store, user, now)?;
    let available = store.new_cards(user)?.len();
    let new_capacity_today = (settings.new_per_day as usize)
        .saturating_sub(introduced)
        .min(available);

    let mut decks = Vec::new();
    for deck in store.decks(user)? {
        let keys: BTreeSet<CardKey> = store
            .deck_occurrences(deck.id)?
            .into_iter()
            .map(|o| o.key)
            .collect();
        let mut known = 0;
        for key in &keys {
            if store.lemma_mark(user, &key.lemma, &key.pos)? == Some(Mark::Known) {
                known += 1;
            }
        }
        decks.push(DeckSummary {
            id: deck.id,
            title: deck.title,
            lang: deck.lang,
            known,
            unique: keys.len(),
            due: keys.intersection(&due_keys).count(),
        });
    }

    Ok(Dashboard {
        known_count: store.count_marks(user, Mark::Known)?,
        due_count: due_cards.len(),
        new_capacity_today,
        decks,
    })
}
