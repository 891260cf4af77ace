//! Turns a deck's analyzed sentences into lemma occurrences.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::{EngineError, EngineResult, Entity};
use super::store::Store;
use super::types::{AnalyzedSentence, CardKey, Deck, DeckId, Occurrence, Token, TokenRole, UserId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub sentences_indexed: usize,
    pub sentences_skipped: usize,
    pub occurrences: usize,
}

pub fn create_deck<S: Store>(
    store: &mut S,
    user: UserId,
    title: &str,
    lang: &str,
    now: DateTime<Utc>,
) -> EngineResult<DeckId> {
    store.atomically(|store| {
        store.user_settings(user)?;
        let deck = store.insert_deck(user, title, lang, now)?;
        log::debug!("user {} created deck {} ({})", user, deck, lang);
        Ok(deck)
    })
}

pub fn list_decks<S: Store>(store: &mut S, user: UserId) -> EngineResult<Vec<Deck>> {
    store.user_settings(user)?;
    store.decks(user)
}

/// Loads a deck, failing with `NotFound` unless it belongs to `user`.
pub fn owned_deck<S: Store>(store: &mut S, user: UserId, deck: DeckId) -> EngineResult<Deck> {
    store
        .deck(deck)?
        .filter(|d| d.user_id == user)
        .ok_or(EngineError::NotFound(Entity::Deck(deck)))
}

/// Deletes the deck with its sentences and occurrences. Cards and their
/// review history are kept.
pub fn delete_deck<S: Store>(store: &mut S, user: UserId, deck: DeckId) -> EngineResult<()> {
    store.atomically(|store| {
        owned_deck(store, user, deck)?;
        store.remove_deck(deck)?;
        log::info!("user {} deleted deck {}", user, deck);
        Ok(())
    })
}

/// Persists the sentences of `deck` and one occurrence per token.
///
/// Empty sentences are skipped. Tokens of one multi-word expression share the
/// group's key, so the expression becomes a single card. No cards are
/// created here.
pub fn index_deck<S: Store>(
    store: &mut S,
    deck: DeckId,
    sentences: &[AnalyzedSentence],
) -> EngineResult<IndexReport> {
    store.atomically(|store| {
        if store.deck(deck)?.is_none() {
            return Err(EngineError::NotFound(Entity::Deck(deck)));
        }

        let mut report = IndexReport::default();
        for sentence in sentences {
            if sentence.tokens.is_empty() {
                log::warn!("deck {}: skipping sentence without tokens", deck);
                report.sentences_skipped += 1;
                continue;
            }

            let keys = resolve_keys(store, &sentence.tokens)?;
            let sentence_id = store.insert_sentence(deck, &sentence.text, sentence.tokens.len() as i32)?;
            for (index, (token, key)) in sentence.tokens.iter().zip(keys).enumerate() {
                let occurrence = Occurrence {
                    deck_id: deck,
                    sentence_id,
                    token_index: index as i32,
                    form: token.form.clone(),
                    key,
                    grammar_label: token.grammar_label.clone(),
                };
                if store.insert_occurrence(&occurrence)? {
                    report.occurrences += 1;
                }
            }
            report.sentences_indexed += 1;
        }

        log::info!(
            "deck {} indexed: {} sentences, {} skipped, {} occurrences",
            deck,
            report.sentences_indexed,
            report.sentences_skipped,
            report.occurrences
        );
        Ok(report)
    })
}

/// Card key for every token of a sentence, in token order.
fn resolve_keys<S: Store>(store: &mut S, tokens: &[Token]) -> EngineResult<Vec<CardKey>> {
    let mut groups: BTreeMap<u32, Vec<&Token>> = BTreeMap::new();
    for token in tokens {
        if let TokenRole::Grouped { group } = token.role() {
            groups.entry(group).or_default().push(token);
        }
    }

    let mut group_keys = BTreeMap::new();
    for (group, members) in groups {
        let (lemma, pos) = group_identity(&members);
        let mwe_id = store.intern_mwe(&lemma, &pos)?;
        group_keys.insert(
            group,
            CardKey {
                lemma,
                pos,
                mwe_id: Some(mwe_id),
            },
        );
    }

    Ok(tokens
        .iter()
        .map(|token| match token.role() {
            TokenRole::Standalone => CardKey::word(&token.lemma, &token.pos),
            TokenRole::Grouped { group } => group_keys[&group].clone(),
        })
        .collect())
}

/// Members that already agree on lemma and pos keep it; otherwise the
/// member lemmas are joined in order under the first member's pos.
fn group_identity(members: &[&Token]) -> (String, String) {
    let head = members[0];
    if members
        .iter()
        .all(|t| t.lemma == head.lemma && t.pos == head.pos)
    {
        return (head.lemma.clone(), head.pos.clone());
    }
    let lemma = members
        .iter()
        .map(|t| t.lemma.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    (lemma, head.pos.clone())
}
