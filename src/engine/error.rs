use std::fmt;

use thiserror::Error;

use super::types::{CardId, DeckId, UserId};
use crate::parser::ParseError;

/// The record a `NotFound` refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    User(UserId),
    Deck(DeckId),
    Card(CardId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User(id) => write!(f, "user {}", id),
            Entity::Deck(id) => write!(f, "deck {}", id),
            Entity::Card(id) => write!(f, "card {}", id),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("Invalid grade {0}, expected 1 (again) to 4 (easy)")]
    InvalidGrade(i32),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Parse failure: {0}")]
    ParseFailure(#[from] ParseError),
}

pub type EngineResult<T> = Result<T, EngineError>;
