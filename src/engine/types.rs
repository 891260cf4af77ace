use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scheduler::{Grade, SchedulerState, Stage};

pub type UserId = i32;
pub type DeckId = i32;
pub type SentenceId = i32;
pub type CardId = i32;
pub type MweId = i32;

/// One analyzed token as delivered by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub form: String,
    pub lemma: String,
    pub pos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feats: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_label: Option<String>,
    /// Sentence-local group number shared by the tokens of one multi-word expression.
    #[serde(default)]
    pub mwe_id: Option<u32>,
}

impl Token {
    pub fn new(form: &str, lemma: &str, pos: &str) -> Self {
        Self {
            form: form.to_string(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            feats: None,
            grammar_label: None,
            mwe_id: None,
        }
    }

    pub fn in_group(mut self, group: u32) -> Self {
        self.mwe_id = Some(group);
        self
    }

    pub fn role(&self) -> TokenRole {
        match self.mwe_id {
            Some(group) => TokenRole::Grouped { group },
            None => TokenRole::Standalone,
        }
    }
}

/// Whether a token is its own card key or borrows the key of its expression group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    Standalone,
    Grouped { group: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedSentence {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl AnalyzedSentence {
    /// Builds a sentence whose text is the space-joined token forms.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let text = tokens
            .iter()
            .map(|t| t.form.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, tokens }
    }
}

/// Identity of a card within one user's catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardKey {
    pub lemma: String,
    pub pos: String,
    pub mwe_id: Option<MweId>,
}

impl CardKey {
    pub fn word(lemma: &str, pos: &str) -> Self {
        Self {
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            mwe_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub deck_id: DeckId,
    pub sentence_id: SentenceId,
    pub token_index: i32,
    pub form: String,
    pub key: CardKey,
    /// Parser's human-readable grammar of the token, shown on the card back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Known,
    Ignored,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::Known => "known",
            Mark::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "known" => Some(Mark::Known),
            "ignored" => Some(Mark::Ignored),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub key: CardKey,
    pub created_at: DateTime<Utc>,
    /// When the selector first presented this card as a new card.
    pub introduced_at: Option<DateTime<Utc>>,
    /// Set when the lemma was marked known or ignored; the row is kept for history.
    pub retired_at: Option<DateTime<Utc>>,
    pub state: SchedulerState,
}

impl Card {
    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    pub fn is_new(&self) -> bool {
        self.state.stage == Stage::New
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub user_id: UserId,
    pub title: String,
    pub lang: String,
    pub created_at: DateTime<Utc>,
}

/// A sentence that evidences a card, with the position of the card's token in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleSentence {
    pub deck_id: DeckId,
    pub sentence_id: SentenceId,
    pub token_index: i32,
    pub form: String,
    pub grammar_label: Option<String>,
    pub text: String,
    pub token_count: i32,
    pub deck_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_new_per_day")]
    pub new_per_day: u32,
    #[serde(default = "default_retention")]
    pub retention: f64,
    #[serde(default = "default_theme")]
    pub theme: String,
}

pub const MIN_RETENTION: f64 = 0.70;
pub const MAX_RETENTION: f64 = 0.99;
pub const MAX_NEW_PER_DAY: u32 = 500;

fn default_new_per_day() -> u32 {
    20
}

fn default_retention() -> f64 {
    0.9
}

fn default_theme() -> String {
    "system".to_string()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            new_per_day: default_new_per_day(),
            retention: default_retention(),
            theme: default_theme(),
        }
    }
}

impl UserSettings {
    /// Clamps values into the ranges the scheduler accepts.
    pub fn sanitized(mut self) -> Self {
        self.new_per_day = self.new_per_day.min(MAX_NEW_PER_DAY);
        if !self.retention.is_finite() {
            self.retention = default_retention();
        }
        self.retention = self.retention.clamp(MIN_RETENTION, MAX_RETENTION);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub card_id: CardId,
    pub user_id: UserId,
    pub grade: Grade,
    pub stage_before: Stage,
    pub state_after: SchedulerState,
    pub reviewed_at: DateTime<Utc>,
}
