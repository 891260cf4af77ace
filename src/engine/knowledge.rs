//! Per-user known/ignored lemma marks.
//!
//! Marks are read from the store on every query; nothing is cached between
//! operations because imports and reviews may change them at any time.

use chrono::{DateTime, Utc};

use super::error::EngineResult;
use super::store::Store;
use super::types::{Mark, UserId};

pub fn mark_of<S: Store>(store: &mut S, user: UserId, lemma: &str, pos: &str) -> EngineResult<Option<Mark>> {
    store.lemma_mark(user, lemma, pos)
}

pub fn is_known<S: Store>(store: &mut S, user: UserId, lemma: &str, pos: &str) -> EngineResult<bool> {
    Ok(mark_of(store, user, lemma, pos)? == Some(Mark::Known))
}

pub fn is_ignored<S: Store>(store: &mut S, user: UserId, lemma: &str, pos: &str) -> EngineResult<bool> {
    Ok(mark_of(store, user, lemma, pos)? == Some(Mark::Ignored))
}

pub fn is_marked<S: Store>(store: &mut S, user: UserId, lemma: &str, pos: &str) -> EngineResult<bool> {
    Ok(mark_of(store, user, lemma, pos)?.is_some())
}

pub fn mark_known<S: Store>(
    store: &mut S,
    user: UserId,
    lemma: &str,
    pos: &str,
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    set_mark(store, user, lemma, pos, Mark::Known, now)
}

pub fn mark_ignored<S: Store>(
    store: &mut S,
    user: UserId,
    lemma: &str,
    pos: &str,
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    set_mark(store, user, lemma, pos, Mark::Ignored, now)
}

/// Sets `mark` (replacing the other one) and retires the lemma's active
/// cards. Returns how many cards were retired.
pub fn set_mark<S: Store>(
    store: &mut S,
    user: UserId,
    lemma: &str,
    pos: &str,
    mark: Mark,
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    store.atomically(|store| {
        store.user_settings(user)?;
        store.set_lemma_mark(user, lemma, pos, mark, now)?;
        retire_cards(store, user, lemma, pos, now)
    })
}

/// Clears any mark for the lemma and revives its retired cards with their
/// scheduling history intact. Returns how many cards came back.
pub fn unmark<S: Store>(store: &mut S, user: UserId, lemma: &str, pos: &str) -> EngineResult<usize> {
    store.atomically(|store| {
        store.user_settings(user)?;
        if !store.clear_lemma_mark(user, lemma, pos)? {
            return Ok(0);
        }
        let mut revived = 0;
        for card in store.cards_for_lemma(user, lemma, pos)? {
            if card.is_retired() {
                store.set_card_retired(card.id, None)?;
                revived += 1;
            }
        }
        log::debug!("user {} unmarked {}/{}, revived {} cards", user, lemma, pos, revived);
        Ok(revived)
    })
}

/// Bulk "already known" import. Returns the number of lemmas newly marked.
pub fn import_known<S: Store>(
    store: &mut S,
    user: UserId,
    lemmas: &[(String, String)],
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    store.atomically(|store| {
        store.user_settings(user)?;
        let mut imported = 0;
        for (lemma, pos) in lemmas {
            if store.lemma_mark(user, lemma, pos)? != Some(Mark::Known) {
                store.set_lemma_mark(user, lemma, pos, Mark::Known, now)?;
                imported += 1;
            }
            retire_cards(store, user, lemma, pos, now)?;
        }
        log::info!("user {} imported {} known lemmas", user, imported);
        Ok(imported)
    })
}

fn retire_cards<S: Store>(
    store: &mut S,
    user: UserId,
    lemma: &str,
    pos: &str,
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    let mut retired = 0;
    for card in store.cards_for_lemma(user, lemma, pos)? {
        if !card.is_retired() {
            store.set_card_retired(card.id, Some(now))?;
            retired += 1;
        }
    }
    Ok(retired)
}
