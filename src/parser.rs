use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::types::{AnalyzedSentence, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "FI")]
    Finnish,
    #[serde(rename = "ET")]
    Estonian,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Finnish => "FI",
            Language::Estonian => "ET",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FI" => Ok(Language::Finnish),
            "ET" => Ok(Language::Estonian),
            _ => Err(ParseError::UnsupportedLanguage(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Malformed text: {0}")]
    Malformed(String),
}

/// Morphological analysis of raw text into sentences of tokens.
pub trait Parser: Send + Sync {
    fn analyze(&self, lang: Language, text: &str) -> Result<Vec<AnalyzedSentence>, ParseError>;
}

lazy_static! {
    static ref SENTENCE: Regex = Regex::new(r"[^.!?]+[.!?]*").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^\d+([.,]\d+)?$").unwrap();
}

/// Dictionary-free fallback: lemma is the lower-cased form, the part of
/// speech is guessed from common suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicParser;

impl HeuristicParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for HeuristicParser {
    fn analyze(&self, lang: Language, text: &str) -> Result<Vec<AnalyzedSentence>, ParseError> {
        if text.contains('\0') {
            return Err(ParseError::Malformed("text contains NUL bytes".to_string()));
        }

        let mut sentences = Vec::new();
        for m in SENTENCE.find_iter(text) {
            let sentence = m.as_str().trim();
            let tokens: Vec<Token> = sentence
                .split_whitespace()
                .filter_map(|word| analyze_word(lang, word))
                .collect();
            if tokens.is_empty() {
                continue;
            }
            sentences.push(AnalyzedSentence {
                text: sentence.to_string(),
                tokens,
            });
        }
        log::debug!("heuristic parser: {} sentences ({})", sentences.len(), lang);
        Ok(sentences)
    }
}

fn analyze_word(lang: Language, word: &str) -> Option<Token> {
    let form = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-');
    if form.is_empty() {
        return None;
    }
    let lemma = form.to_lowercase();
    let pos = guess_pos(lang, form, &lemma);
    let mut token = Token::new(form, &lemma, pos);
    token.grammar_label = Some(format!("{} (heuristic)", pos));
    Some(token)
}

fn guess_pos(lang: Language, form: &str, lemma: &str) -> &'static str {
    if NUMBER.is_match(lemma) {
        return "NUM";
    }
    if form.chars().next().is_some_and(char::is_uppercase) && form.chars().skip(1).any(char::is_lowercase) {
        // names
        return "NOUN";
    }
    let ends = |suffixes: &[&str]| suffixes.iter().any(|s| lemma.ends_with(s));
    match lang {
        Language::Finnish => {
            if ends(&["sti"]) {
                "ADV"
            } else if ends(&["minen", "us", "ys", "uus", "yys"]) {
                "NOUN"
            } else if ends(&["nen", "inen", "llinen"]) {
                "ADJ"
            } else if ends(&["da", "dä", "ta", "tä", "lla", "llä", "sta", "stä"]) && lemma.len() > 4 {
                "VERB"
            } else {
                "NOUN"
            }
        }
        Language::Estonian => {
            if ends(&["lt", "sti"]) {
                "ADV"
            } else if ends(&["mine", "us"]) {
                "NOUN"
            } else if ends(&["ne", "lik"]) {
                "ADJ"
            } else if ends(&["ma", "da", "ta"]) && lemma.len() > 3 {
                "VERB"
            } else {
                "NOUN"
            }
        }
    }
}
