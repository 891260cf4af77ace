//! One review turn: grade a card, or take it out of rotation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::{EngineError, EngineResult, Entity};
use super::knowledge;
use super::scheduler::{self, Grade, SchedulerParams, SchedulerState, Stage};
use super::store::Store;
use super::types::{Card, CardId, Mark, ReviewLogEntry, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub card_id: CardId,
    pub grade: Grade,
    pub stage_before: Stage,
    pub state: SchedulerState,
}

/// Loads a card, failing with `NotFound` unless it belongs to `user`.
pub fn owned_card<S: Store>(store: &mut S, user: UserId, card: CardId) -> EngineResult<Card> {
    store
        .card(card)?
        .filter(|c| c.user_id == user)
        .ok_or(EngineError::NotFound(Entity::Card(card)))
}

/// Applies `grade` to the card's scheduler state and logs the review.
///
/// The user's retention target overrides `params.desired_retention`.
pub fn submit_answer<S: Store>(
    store: &mut S,
    user: UserId,
    card_id: CardId,
    grade: Grade,
    now: DateTime<Utc>,
    params: &SchedulerParams,
) -> EngineResult<ReviewOutcome> {
    store.atomically(|store| {
        let settings = store.user_settings(user)?;
        let card = owned_card(store, user, card_id)?;
        if card.is_retired() {
            return Err(EngineError::InvalidState(format!(
                "card {} is retired and cannot be graded",
                card_id
            )));
        }

        let params = params.with_retention(settings.retention);
        let state = scheduler::schedule(&card.state, grade, now, &params);

        if card.introduced_at.is_none() {
            store.set_card_introduced(card.id, now)?;
        }
        store.save_state(card.id, &state)?;
        store.append_review(&ReviewLogEntry {
            card_id: card.id,
            user_id: user,
            grade,
            stage_before: card.state.stage,
            state_after: state.clone(),
            reviewed_at: now,
        })?;

        log::debug!(
            "user {} graded card {} {:?}: {} -> {}",
            user,
            card.id,
            grade,
            card.state.stage.as_str(),
            state.stage.as_str()
        );
        Ok(ReviewOutcome {
            card_id: card.id,
            grade,
            stage_before: card.state.stage,
            state,
        })
    })
}

/// Marks the card's lemma known and retires its cards.
pub fn mark_known<S: Store>(store: &mut S, user: UserId, card_id: CardId, now: DateTime<Utc>) -> EngineResult<Card> {
    dispose(store, user, card_id, Mark::Known, now)
}

/// Marks the card's lemma ignored and retires its cards.
pub fn mark_ignored<S: Store>(store: &mut S, user: UserId, card_id: CardId, now: DateTime<Utc>) -> EngineResult<Card> {
    dispose(store, user, card_id, Mark::Ignored, now)
}

fn dispose<S: Store>(
    store: &mut S,
    user: UserId,
    card_id: CardId,
    mark: Mark,
    now: DateTime<Utc>,
) -> EngineResult<Card> {
    store.atomically(|store| {
        let card = owned_card(store, user, card_id)?;
        let retired = knowledge::set_mark(store, user, &card.key.lemma, &card.key.pos, mark, now)?;
        log::debug!(
            "user {} marked card {} {} ({} cards retired)",
            user,
            card_id,
            mark.as_str(),
            retired
        );
        owned_card(store, user, card_id)
    })
}
