// Mirrors src/data/schema.sql.

diesel::table! {
    users (user_id) {
        user_id -> Integer,
        email -> Text,
        password -> Text,
        settings_json -> Text,
    }
}

diesel::table! {
    decks (deck_id) {
        deck_id -> Integer,
        user_id -> Integer,
        title -> Text,
        lang -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    sentences (sentence_id) {
        sentence_id -> Integer,
        deck_id -> Integer,
        text -> Text,
        token_count -> Integer,
    }
}

diesel::table! {
    mwe_groups (mwe_id) {
        mwe_id -> Integer,
        lemma -> Text,
        pos -> Text,
    }
}

diesel::table! {
    occurrences (sentence_id, token_index) {
        sentence_id -> Integer,
        token_index -> Integer,
        deck_id -> Integer,
        form -> Text,
        lemma -> Text,
        pos -> Text,
        mwe_id -> Nullable<Integer>,
        grammar_label -> Nullable<Text>,
    }
}

diesel::table! {
    lemma_marks (user_id, lemma, pos) {
        user_id -> Integer,
        lemma -> Text,
        pos -> Text,
        mark -> Text,
        marked_at -> Timestamp,
    }
}

diesel::table! {
    cards (card_id) {
        card_id -> Integer,
        user_id -> Integer,
        lemma -> Text,
        pos -> Text,
        mwe_id -> Nullable<Integer>,
        created_at -> Timestamp,
        introduced_at -> Nullable<Timestamp>,
        retired_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    card_states (card_id) {
        card_id -> Integer,
        stage -> Text,
        stability -> Double,
        difficulty -> Double,
        due -> Nullable<Timestamp>,
        last_reviewed -> Nullable<Timestamp>,
        reps -> Integer,
        lapses -> Integer,
    }
}

diesel::table! {
    review_log (review_id) {
        review_id -> Integer,
        card_id -> Integer,
        user_id -> Integer,
        grade -> Integer,
        stage_before -> Text,
        stage_after -> Text,
        stability -> Double,
        difficulty -> Double,
        due -> Nullable<Timestamp>,
        last_reviewed -> Nullable<Timestamp>,
        reps -> Integer,
        lapses -> Integer,
        reviewed_at -> Timestamp,
    }
}

diesel::joinable!(card_states -> cards (card_id));
diesel::joinable!(occurrences -> sentences (sentence_id));
diesel::joinable!(occurrences -> decks (deck_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    decks,
    sentences,
    mwe_groups,
    occurrences,
    lemma_marks,
    cards,
    card_states,
    review_log,
);
