use chrono::NaiveDateTime;
use diesel::{Queryable, Selectable};
use serde::Deserialize;

use crate::schema::{card_states, cards, review_log};

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = cards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CardRow {
    pub card_id: i32,
    pub user_id: i32,
    pub lemma: String,
    pub pos: String,
    pub mwe_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub introduced_at: Option<NaiveDateTime>,
    pub retired_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = card_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CardStateRow {
    pub card_id: i32,
    pub stage: String,
    pub stability: f64,
    pub difficulty: f64,
    pub due: Option<NaiveDateTime>,
    pub last_reviewed: Option<NaiveDateTime>,
    pub reps: i32,
    pub lapses: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = review_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewLogRow {
    pub review_id: i32,
    pub card_id: i32,
    pub user_id: i32,
    pub grade: i32,
    pub stage_before: String,
    pub stage_after: String,
    pub stability: f64,
    pub difficulty: f64,
    pub due: Option<NaiveDateTime>,
    pub last_reviewed: Option<NaiveDateTime>,
    pub reps: i32,
    pub lapses: i32,
    pub reviewed_at: NaiveDateTime,
}

/// Answer payload. `quality` is accepted as an alias of `grade`.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub card_id: i32,
    #[serde(alias = "quality")]
    pub grade: i32,
}

#[derive(Debug, Deserialize)]
pub struct CardRequest {
    pub card_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct LemmaRequest {
    pub lemma: String,
    pub pos: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportKnownRequest {
    pub lemmas: Vec<LemmaRequest>,
}
