//! End-to-end engine behaviour against the in-memory store.

use chrono::{DateTime, Duration, TimeZone, Utc};

use finnest::engine::review::{self, ReviewOutcome};
use finnest::engine::scheduler::SchedulerParams;
use finnest::engine::selector::{self, Pick};
use finnest::engine::{
    catalog, indexer, knowledge, stats, AnalyzedSentence, CardKey, DeckId, EngineError, Entity, Grade,
    MemoryStore, Stage, Store, Token, UserId, UserSettings,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap()
}

fn word(form: &str, lemma: &str, pos: &str) -> Token {
    Token::new(form, lemma, pos)
}

fn sentence(tokens: Vec<Token>) -> AnalyzedSentence {
    AnalyzedSentence::from_tokens(tokens)
}

fn settings(new_per_day: u32) -> UserSettings {
    UserSettings {
        new_per_day,
        ..UserSettings::default()
    }
}

/// Creates a deck from `sentences`, indexes it and materializes its cards.
fn import(store: &mut MemoryStore, user: UserId, sentences: &[AnalyzedSentence]) -> DeckId {
    let deck = indexer::create_deck(store, user, "Uutiset", "FI", now()).unwrap();
    indexer::index_deck(store, deck, sentences).unwrap();
    let occurrences = store.deck_occurrences(deck).unwrap();
    catalog::ensure_cards(store, user, &occurrences, now()).unwrap();
    deck
}

fn answer(store: &mut MemoryStore, user: UserId, card: i32, grade: Grade, at: DateTime<Utc>) -> ReviewOutcome {
    review::submit_answer(store, user, card, grade, at, &SchedulerParams::default()).unwrap()
}

#[test]
fn test_known_lemma_gets_no_card_on_import() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    knowledge::mark_known(&mut store, user, "talo", "NOUN", now()).unwrap();

    let sentences: Vec<AnalyzedSentence> = (0..5)
        .map(|i| {
            sentence(vec![
                word("Talo", "talo", "NOUN"),
                word("on", "olla", "VERB"),
                word(if i % 2 == 0 { "iso" } else { "pieni" }, if i % 2 == 0 { "iso" } else { "pieni" }, "ADJ"),
            ])
        })
        .collect();
    let deck = indexer::create_deck(&mut store, user, "Talot", "FI", now()).unwrap();
    indexer::index_deck(&mut store, deck, &sentences).unwrap();
    let occurrences = store.deck_occurrences(deck).unwrap();
    let report = catalog::ensure_cards(&mut store, user, &occurrences, now()).unwrap();

    assert_eq!(report.skipped_marked, 1);
    assert_eq!(report.created, 3);
    assert!(store.find_card(user, &CardKey::word("talo", "NOUN")).unwrap().is_none());
}

#[test]
fn test_ensure_cards_is_idempotent() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    let deck = import(
        &mut store,
        user,
        &[sentence(vec![word("Kissa", "kissa", "NOUN"), word("nukkuu", "nukkua", "VERB")])],
    );
    let before = store.card_count(user);

    let occurrences = store.deck_occurrences(deck).unwrap();
    let report = catalog::ensure_cards(&mut store, user, &occurrences, now()).unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.existing, 2);
    assert_eq!(store.card_count(user), before);
}

#[test]
fn test_marking_known_retires_card_until_unmarked() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    let deck = import(&mut store, user, &[sentence(vec![word("Koira", "koira", "NOUN")])]);
    let key = CardKey::word("koira", "NOUN");
    let card = store.find_card(user, &key).unwrap().unwrap();

    knowledge::mark_known(&mut store, user, "koira", "NOUN", now()).unwrap();
    assert!(store.find_card(user, &key).unwrap().unwrap().is_retired());
    assert!(selector::next(&mut store, user, now()).unwrap().is_none());

    // re-importing does not bring it back while marked
    let occurrences = store.deck_occurrences(deck).unwrap();
    let report = catalog::ensure_cards(&mut store, user, &occurrences, now()).unwrap();
    assert_eq!(report.skipped_marked, 1);
    assert_eq!(store.card_count(user), 1);

    assert_eq!(knowledge::unmark(&mut store, user, "koira", "NOUN").unwrap(), 1);
    let presented = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_eq!(presented.card.id, card.id);
}

#[test]
fn test_next_prefers_sentence_with_fewest_other_unknowns() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    knowledge::mark_known(&mut store, user, "olla", "VERB", now()).unwrap();

    // "auto" sorts first, so its card gets the lower id
    import(
        &mut store,
        user,
        &[
            sentence(vec![word("Auto", "auto", "NOUN"), word("on", "olla", "VERB"), word("talossa", "talo", "NOUN")]),
            sentence(vec![word("Talo", "talo", "NOUN")]),
        ],
    );

    let presented = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_eq!(presented.pick, Pick::New);
    assert_eq!(presented.card.key, CardKey::word("talo", "NOUN"));
    let example = presented.example.unwrap();
    assert_eq!(example.text, "Talo");
    assert_eq!(example.token_count, 1);
}

#[test]
fn test_new_card_is_shown_with_its_least_demanding_sentence() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    knowledge::mark_known(&mut store, user, "olla", "VERB", now()).unwrap();

    // same length, but only the second sentence has nothing else to learn
    import(
        &mut store,
        user,
        &[
            sentence(vec![word("Auto", "auto", "NOUN"), word("bussi", "bussi", "NOUN")]),
            sentence(vec![word("Auto", "auto", "NOUN"), word("on", "olla", "VERB")]),
        ],
    );

    let presented = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_eq!(presented.card.key, CardKey::word("auto", "NOUN"));
    assert_eq!(presented.example.unwrap().text, "Auto on");
}

#[test]
fn test_choosing_a_new_card_does_not_look_up_cards_one_by_one() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    let sentences: Vec<AnalyzedSentence> = (0..60)
        .map(|i| {
            let lemma = format!("sana{}", i);
            sentence(vec![word(&lemma, &lemma, "NOUN"), word("ja", "ja", "CCONJ")])
        })
        .collect();
    import(&mut store, user, &sentences);

    let before = store.lookups();
    let presented = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_eq!(presented.pick, Pick::New);
    // only the chosen card's back is read by key
    assert_eq!(store.lookups() - before, 1);
}

#[test]
fn test_presentation_carries_the_card_back() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    let mut inessive = word("talossa", "talo", "NOUN");
    inessive.grammar_label = Some("Inessive singular (-ssa)".to_string());
    import(
        &mut store,
        user,
        &[sentence(vec![inessive]), sentence(vec![word("Talo", "talo", "NOUN"), word("palaa", "palaa", "VERB")])],
    );
    let deck = indexer::create_deck(&mut store, user, "Kirjat", "FI", now()).unwrap();
    indexer::index_deck(&mut store, deck, &[sentence(vec![word("Talot", "talo", "NOUN"), word("ovat", "olla", "VERB")])])
        .unwrap();

    let presented = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_eq!(presented.card.key, CardKey::word("talo", "NOUN"));
    assert_eq!(presented.example.as_ref().unwrap().text, "talossa");
    assert_eq!(presented.grammar.as_deref(), Some("Inessive singular (-ssa)"));

    let texts: Vec<&str> = presented.examples.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["talossa", "Talo palaa", "Talot ovat"]);
    assert_eq!(presented.examples[2].deck_title, "Kirjat");
    assert_eq!(
        presented.deck_counts,
        vec![("Uutiset".to_string(), 2), ("Kirjat".to_string(), 1)]
    );
}

#[test]
fn test_good_good_again_walks_the_stages() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    import(&mut store, user, &[sentence(vec![word("Järvi", "järvi", "NOUN")])]);
    let card = selector::next(&mut store, user, now()).unwrap().unwrap().card;
    assert_eq!(card.state.stage, Stage::New);

    let first = answer(&mut store, user, card.id, Grade::Good, now());
    assert_eq!(first.state.stage, Stage::Learning);
    let second = answer(&mut store, user, card.id, Grade::Good, first.state.due.unwrap());
    assert_eq!(second.state.stage, Stage::Review);
    let third = answer(&mut store, user, card.id, Grade::Again, second.state.due.unwrap());
    assert_eq!(third.state.stage, Stage::Relearning);
    assert_eq!(third.state.lapses, 1);

    let log = store.reviews(card.id).unwrap();
    let stages: Vec<(Stage, Stage)> = log.iter().map(|r| (r.stage_before, r.state_after.stage)).collect();
    assert_eq!(
        stages,
        vec![
            (Stage::New, Stage::Learning),
            (Stage::Learning, Stage::Review),
            (Stage::Review, Stage::Relearning),
        ]
    );
    assert_eq!(store.card(card.id).unwrap().unwrap().state, third.state);
}

#[test]
fn test_answer_for_another_users_card_is_not_found() {
    let mut store = MemoryStore::new();
    let alice = store.add_user(UserSettings::default());
    let bob = store.add_user(UserSettings::default());
    import(&mut store, alice, &[sentence(vec![word("Meri", "meri", "NOUN")])]);
    let card = store.find_card(alice, &CardKey::word("meri", "NOUN")).unwrap().unwrap();

    let err = review::submit_answer(&mut store, bob, card.id, Grade::Good, now(), &SchedulerParams::default())
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound(Entity::Card(card.id)));
    assert!(store.reviews(card.id).unwrap().is_empty());

    let err = review::mark_known(&mut store, bob, card.id, now()).unwrap_err();
    assert_eq!(err, EngineError::NotFound(Entity::Card(card.id)));
    assert!(!knowledge::is_known(&mut store, bob, "meri", "NOUN").unwrap());
}

#[test]
fn test_daily_new_card_cap() {
    let mut store = MemoryStore::new();
    let user = store.add_user(settings(2));
    import(
        &mut store,
        user,
        &[sentence(vec![
            word("Yksi", "yksi", "NUM"),
            word("kaksi", "kaksi", "NUM"),
            word("kolme", "kolme", "NUM"),
            word("neljä", "neljä", "NUM"),
        ])],
    );

    let first = selector::next(&mut store, user, now()).unwrap().unwrap();
    // unanswered card comes back without using another slot
    let again = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_eq!(again.card.id, first.card.id);
    assert_eq!(catalog::count_new_introduced_today(&mut store, user, now()).unwrap(), 1);
    answer(&mut store, user, first.card.id, Grade::Good, now());

    let second = selector::next(&mut store, user, now()).unwrap().unwrap();
    assert_ne!(second.card.id, first.card.id);
    answer(&mut store, user, second.card.id, Grade::Good, now());

    assert_eq!(catalog::count_new_introduced_today(&mut store, user, now()).unwrap(), 2);
    assert!(selector::next(&mut store, user, now() + Duration::hours(1)).unwrap().is_none());

    // learning cards fall due first once their step has passed
    let later = now() + Duration::hours(13);
    let due = selector::next(&mut store, user, later).unwrap().unwrap();
    assert_eq!(due.pick, Pick::Due);
    assert_eq!(due.card.id, first.card.id);

    // a new day frees the cap again
    let tomorrow = now() + Duration::days(1);
    answer(&mut store, user, first.card.id, Grade::Good, later);
    answer(&mut store, user, second.card.id, Grade::Good, later);
    let fresh = selector::next(&mut store, user, tomorrow).unwrap().unwrap();
    assert_eq!(fresh.pick, Pick::New);
}

#[test]
fn test_ignored_card_is_never_presented() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    import(
        &mut store,
        user,
        &[sentence(vec![word("Helsinki", "helsinki", "PROPN"), word("kaupunki", "kaupunki", "NOUN")])],
    );

    let first = selector::next(&mut store, user, now()).unwrap().unwrap();
    let retired = review::mark_ignored(&mut store, user, first.card.id, now()).unwrap();
    assert!(retired.is_retired());
    assert!(knowledge::is_ignored(&mut store, user, &first.card.key.lemma, &first.card.key.pos).unwrap());

    for _ in 0..3 {
        if let Some(next) = selector::next(&mut store, user, now()).unwrap() {
            assert_ne!(next.card.id, first.card.id);
            answer(&mut store, user, next.card.id, Grade::Easy, now());
        }
    }

    let err = review::submit_answer(&mut store, user, first.card.id, Grade::Good, now(), &SchedulerParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[test]
fn test_marking_keeps_review_history() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    import(&mut store, user, &[sentence(vec![word("Sauna", "sauna", "NOUN")])]);
    let card = selector::next(&mut store, user, now()).unwrap().unwrap().card;
    answer(&mut store, user, card.id, Grade::Hard, now());

    review::mark_known(&mut store, user, card.id, now()).unwrap();
    // marking twice is harmless
    review::mark_known(&mut store, user, card.id, now()).unwrap();

    assert_eq!(store.reviews(card.id).unwrap().len(), 1);
    assert!(catalog::list_due(&mut store, user, now() + Duration::days(30)).unwrap().is_empty());
}

#[test]
fn test_failed_answer_leaves_no_partial_state() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    import(&mut store, user, &[sentence(vec![word("Kuu", "kuu", "NOUN")])]);
    let card = store.find_card(user, &CardKey::word("kuu", "NOUN")).unwrap().unwrap();

    // introduced_at and state are written, the review log append fails
    store.fail_after_writes(2);
    let err = review::submit_answer(&mut store, user, card.id, Grade::Good, now(), &SchedulerParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreUnavailable(_)));

    let reloaded = store.card(card.id).unwrap().unwrap();
    assert_eq!(reloaded, card);
    assert!(store.reviews(card.id).unwrap().is_empty());

    // the whole operation can simply be retried
    let outcome = answer(&mut store, user, card.id, Grade::Good, now());
    assert_eq!(outcome.state.stage, Stage::Learning);
}

#[test]
fn test_failed_import_indexes_nothing() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    let deck = indexer::create_deck(&mut store, user, "Runot", "FI", now()).unwrap();

    store.fail_after_writes(3);
    let err = indexer::index_deck(
        &mut store,
        deck,
        &[
            sentence(vec![word("Tuuli", "tuuli", "NOUN"), word("puhaltaa", "puhaltaa", "VERB")]),
            sentence(vec![word("Sataa", "sataa", "VERB")]),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::StoreUnavailable(_)));
    assert!(store.deck_occurrences(deck).unwrap().is_empty());
}

#[test]
fn test_expression_becomes_one_card() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    import(
        &mut store,
        user,
        &[
            sentence(vec![
                word("Hän", "hän", "PRON"),
                word("pitää", "pitää", "VERB").in_group(1),
                word("huolta", "huoli", "NOUN").in_group(1),
            ]),
            sentence(vec![
                word("Pidän", "pitää", "VERB").in_group(3),
                word("huolta", "huoli", "NOUN").in_group(3),
            ]),
        ],
    );

    let cards = store.cards_for_lemma(user, "pitää huoli", "VERB").unwrap();
    assert_eq!(cards.len(), 1);
    assert!(cards[0].key.mwe_id.is_some());
    assert_eq!(catalog::examples(&mut store, user, &cards[0].key).unwrap().len(), 2);
    assert_eq!(store.card_count(user), 2);
}

#[test]
fn test_deleting_deck_keeps_cards() {
    let mut store = MemoryStore::new();
    let user = store.add_user(UserSettings::default());
    let deck = import(&mut store, user, &[sentence(vec![word("Lumi", "lumi", "NOUN")])]);
    let card = selector::next(&mut store, user, now()).unwrap().unwrap().card;
    answer(&mut store, user, card.id, Grade::Good, now());

    indexer::delete_deck(&mut store, user, deck).unwrap();
    assert!(indexer::list_decks(&mut store, user).unwrap().is_empty());

    let due = selector::next(&mut store, user, now() + Duration::days(1)).unwrap().unwrap();
    assert_eq!(due.card.id, card.id);
    assert!(due.example.is_none());

    let other = store.add_user(UserSettings::default());
    assert_eq!(
        indexer::delete_deck(&mut store, other, deck).unwrap_err(),
        EngineError::NotFound(Entity::Deck(deck))
    );
}

#[test]
fn test_dashboard_counts() {
    let mut store = MemoryStore::new();
    let user = store.add_user(settings(10));
    knowledge::import_known(
        &mut store,
        user,
        &[("olla".to_string(), "VERB".to_string()), ("ja".to_string(), "CCONJ".to_string())],
        now(),
    )
    .unwrap();
    import(
        &mut store,
        user,
        &[sentence(vec![
            word("Metsä", "metsä", "NOUN"),
            word("on", "olla", "VERB"),
            word("vihreä", "vihreä", "ADJ"),
        ])],
    );

    let card = selector::next(&mut store, user, now()).unwrap().unwrap().card;
    answer(&mut store, user, card.id, Grade::Again, now());

    let dashboard = stats::dashboard(&mut store, user, now() + Duration::minutes(5)).unwrap();
    assert_eq!(dashboard.known_count, 2);
    assert_eq!(dashboard.due_count, 1);
    assert_eq!(dashboard.new_capacity_today, 1);
    assert_eq!(dashboard.decks.len(), 1);
    assert_eq!(dashboard.decks[0].unique, 3);
    assert_eq!(dashboard.decks[0].known, 1);
    assert_eq!(dashboard.decks[0].due, 1);
}

#[test]
fn test_unknown_user_is_not_found() {
    let mut store = MemoryStore::new();
    assert_eq!(
        selector::next(&mut store, 7, now()).unwrap_err(),
        EngineError::NotFound(Entity::User(7))
    );
}
