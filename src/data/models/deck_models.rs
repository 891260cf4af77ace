use chrono::NaiveDateTime;
use diesel::{Queryable, Selectable};
use serde::{Deserialize, Serialize};

use crate::engine::catalog::EnsureReport;
use crate::engine::indexer::IndexReport;
use crate::schema::{decks, occurrences};

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = decks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeckRow {
    pub deck_id: i32,
    pub user_id: i32,
    pub title: String,
    pub lang: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = occurrences)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OccurrenceRow {
    pub sentence_id: i32,
    pub token_index: i32,
    pub deck_id: i32,
    pub form: String,
    pub lemma: String,
    pub pos: String,
    pub mwe_id: Option<i32>,
    pub grammar_label: Option<String>,
}

/// Request payload for importing a text as a new deck
#[derive(Debug, Deserialize)]
pub struct CreateDeckRequest {
    pub title: String,
    pub lang: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct DeckCreated {
    pub deck_id: i32,
    #[serde(flatten)]
    pub index: IndexReport,
    pub cards: EnsureReport,
}
