//! Unit tests for the quiz engine and the durable stores.
//!
//! Included from `main.rs` under `#[cfg(test)]`. Engine tests inject a seeded
//! `StdRng` so shuffling is reproducible; store tests run against an
//! in-memory `KvStore` except for the `FileStore` round-trip itself.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::quiz::ai_helper::HINT_FALLBACK;
use crate::quiz::catalog::{Catalog, CountryEntry, Difficulty};
use crate::quiz::options::answer_options;
use crate::quiz::{AdvanceOutcome, Phase, SessionState, SubmitOutcome, HINTS_PER_SESSION};
use crate::store::accounts::{self, AuthError, RegisterError};
use crate::store::history::{self, QuizResult};
use crate::store::{FileStore, KvStore, USERS_KEY};

// ── helpers ──────────────────────────────────────────────────────────────────

/// In-memory stand-in for the durable key-value store.
#[derive(Default)]
struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn entry(name: &str, code: &str, language: &str, difficulty: Difficulty) -> CountryEntry {
    CountryEntry {
        name: name.to_string(),
        code: code.to_string(),
        language: language.to_string(),
        difficulty,
    }
}

/// A tiny catalog with exactly three easy entries, for shortfall scenarios.
fn three_easy_entries() -> Catalog {
    Catalog::from_entries(vec![
        entry("France", "FR", "French", Difficulty::Easy),
        entry("Spain", "ES", "Spanish", Difficulty::Easy),
        entry("Japan", "JP", "Japanese", Difficulty::Easy),
    ])
}

/// Builds a session and answers the current question correctly.
fn answer_correctly(session: &mut SessionState) -> SubmitOutcome {
    let language = session
        .current_question()
        .expect("session should have a current question")
        .language
        .clone();
    session.submit(&language)
}

// ── catalog ──────────────────────────────────────────────────────────────────

#[test]
fn builtin_catalog_covers_every_profile() {
    let catalog = Catalog::builtin();
    for difficulty in Difficulty::ALL {
        let pool = catalog.pool(difficulty);
        assert!(
            pool.len() >= difficulty.question_count(),
            "{:?} pool has only {} entries for {} questions",
            difficulty,
            pool.len(),
            difficulty.question_count()
        );

        let languages: HashSet<&str> = pool.iter().map(|c| c.language.as_str()).collect();
        assert!(
            languages.len() >= 4,
            "{:?} pool has only {} distinct languages",
            difficulty,
            languages.len()
        );
    }
}

#[test]
fn included_levels_are_cumulative() {
    let mut previous: HashSet<Difficulty> = HashSet::new();
    for difficulty in Difficulty::ALL {
        let levels: HashSet<Difficulty> = difficulty.included_levels().iter().copied().collect();
        assert!(
            previous.is_subset(&levels),
            "levels for {:?} do not include the tier below",
            difficulty
        );
        assert!(levels.contains(&difficulty));
        previous = levels;
    }
}

// ── session builder ──────────────────────────────────────────────────────────

#[test]
fn build_draws_unique_questions_from_the_pool() {
    let catalog = Catalog::builtin();
    for difficulty in Difficulty::ALL {
        for seed in [1, 42, 999] {
            let session = SessionState::build(difficulty, &catalog, &mut rng(seed));
            let pool = catalog.pool(difficulty);

            assert_eq!(
                session.total_questions(),
                difficulty.question_count().min(pool.len()),
                "wrong session length for {:?}",
                difficulty
            );

            let names: HashSet<&str> = session.questions.iter().map(|q| q.name.as_str()).collect();
            assert_eq!(
                names.len(),
                session.questions.len(),
                "duplicate question for {:?} seed {}",
                difficulty,
                seed
            );
            for question in &session.questions {
                assert!(
                    pool.contains(question),
                    "question {} not in the {:?} pool",
                    question.name,
                    difficulty
                );
            }
        }
    }
}

#[test]
fn build_starts_with_fresh_counters() {
    let session = SessionState::build(Difficulty::Medium, &Catalog::builtin(), &mut rng(7));
    assert_eq!(session.current_index, 0);
    assert_eq!(session.score, 0);
    assert_eq!(session.hints_remaining, HINTS_PER_SESSION);
    assert_eq!(session.phase(), Phase::AwaitingAnswer);
    assert!(session.revealed_hint.is_none());
    assert!(session.revealed_fact.is_none());
}

#[test]
fn build_keeps_shortfall_when_pool_is_small() {
    // Easy asks for 5 questions but only 3 easy entries exist: the session
    // is 3 questions long, not an error and not padded.
    let session = SessionState::build(Difficulty::Easy, &three_easy_entries(), &mut rng(1));
    assert_eq!(session.total_questions(), 3);
}

#[test]
fn build_orders_vary_across_seeds() {
    let catalog = Catalog::builtin();
    let orders: HashSet<Vec<String>> = (0..10)
        .map(|seed| {
            SessionState::build(Difficulty::Hard, &catalog, &mut rng(seed))
                .questions
                .iter()
                .map(|q| q.name.clone())
                .collect()
        })
        .collect();
    assert!(orders.len() > 1, "shuffle produced one fixed order");
}

// ── option generator ─────────────────────────────────────────────────────────

#[test]
fn options_are_four_distinct_with_one_correct() {
    let catalog = Catalog::builtin();
    let pool = catalog.pool(Difficulty::Medium);
    for seed in [3, 17, 2024] {
        for question in pool.iter().take(6) {
            let options = answer_options(question, &pool, &mut rng(seed));

            assert_eq!(options.len(), 4, "expected 4 options for {}", question.name);
            let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
            assert_eq!(distinct.len(), 4, "duplicate option for {}", question.name);
            let correct = options.iter().filter(|o| **o == question.language).count();
            assert_eq!(correct, 1, "correct answer count for {}", question.name);
        }
    }
}

#[test]
fn options_shrink_when_pool_lacks_distractors() {
    // Two distinct incorrect languages available: 3 options total.
    let pool = vec![
        entry("France", "FR", "French", Difficulty::Easy),
        entry("Spain", "ES", "Spanish", Difficulty::Easy),
        entry("Mexico", "MX", "Spanish", Difficulty::Easy),
        entry("Japan", "JP", "Japanese", Difficulty::Easy),
    ];
    let options = answer_options(&pool[0], &pool, &mut rng(5));
    assert_eq!(options.len(), 3);
    assert_eq!(options.iter().filter(|o| **o == "French").count(), 1);
}

#[test]
fn correct_option_has_no_fixed_position() {
    let catalog = Catalog::builtin();
    let pool = catalog.pool(Difficulty::Easy);
    let question = &pool[0];

    let positions: HashSet<usize> = (0..30)
        .map(|seed| {
            answer_options(question, &pool, &mut rng(seed))
                .iter()
                .position(|o| *o == question.language)
                .expect("correct answer missing from options")
        })
        .collect();
    assert!(
        positions.len() > 1,
        "correct answer always landed at the same position"
    );
}

// ── scoring & progress ───────────────────────────────────────────────────────

#[test]
fn submit_scores_exact_match_once() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(9));

    assert_eq!(answer_correctly(&mut session), SubmitOutcome::Correct);
    assert_eq!(session.score, 1);

    // The result is fixed once entered; a second submission changes nothing.
    let language = session.current_question().unwrap().language.clone();
    assert_eq!(session.submit(&language), SubmitOutcome::Ignored);
    assert_eq!(session.score, 1);
}

#[test]
fn wrong_answer_does_not_score() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(9));
    assert_eq!(session.submit("Klingon"), SubmitOutcome::Incorrect);
    assert_eq!(session.score, 0);
    assert_eq!(session.phase(), Phase::Answered { correct: false });
}

#[test]
fn score_never_exceeds_answered_count() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(11));
    let total = session.total_questions();
    let mut answered = 0;
    loop {
        answer_correctly(&mut session);
        answered += 1;
        assert!(session.score as usize <= answered);
        if session.advance() == AdvanceOutcome::Finished {
            break;
        }
    }
    assert_eq!(answered, total);
    assert_eq!(session.score as usize, total);
}

#[test]
fn advance_requires_an_answer() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(2));
    assert_eq!(session.advance(), AdvanceOutcome::Ignored);
    assert_eq!(session.current_index, 0);
}

#[test]
fn advance_clears_revealed_hint_and_fact() {
    let mut session = SessionState::build(Difficulty::Medium, &Catalog::builtin(), &mut rng(4));

    let ticket = session.request_hint().expect("hint should be granted");
    assert!(session.resolve_hint(ticket, "a clue".to_string()));
    answer_correctly(&mut session);
    let ticket = session.request_fact().expect("fact should be granted");
    assert!(session.resolve_fact(ticket, "a fact".to_string()));

    assert_eq!(session.advance(), AdvanceOutcome::NextQuestion);
    assert_eq!(session.current_index, 1);
    assert!(session.revealed_hint.is_none());
    assert!(session.revealed_fact.is_none());
    assert_eq!(session.phase(), Phase::AwaitingAnswer);
}

#[test]
fn advance_past_last_question_finishes() {
    // One easy entry: a 1-question session.
    let catalog = Catalog::from_entries(vec![entry("France", "FR", "French", Difficulty::Easy)]);
    let mut session = SessionState::build(Difficulty::Easy, &catalog, &mut rng(1));
    assert_eq!(session.total_questions(), 1);

    answer_correctly(&mut session);
    assert_eq!(session.advance(), AdvanceOutcome::Finished);
    assert_eq!(session.phase(), Phase::AllQuestionsDone);

    // The finished session accepts nothing further.
    assert_eq!(session.submit("French"), SubmitOutcome::Ignored);
    assert_eq!(session.advance(), AdvanceOutcome::Ignored);
    assert!(session.request_hint().is_none());
}

// ── hint & fact lifecycle ────────────────────────────────────────────────────

#[test]
fn hint_request_with_exhausted_budget_is_noop() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(6));
    session.hints_remaining = 0;

    assert!(session.request_hint().is_none());
    assert_eq!(session.hints_remaining, 0);
    assert!(session.revealed_hint.is_none());
}

#[test]
fn hint_budget_is_spent_on_the_attempt_not_the_result() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(6));

    let ticket = session.request_hint().expect("hint should be granted");
    assert_eq!(session.hints_remaining, 2);

    // Provider failure: the caller lands the fallback text instead, and the
    // spent hint stays spent.
    assert!(session.resolve_hint(ticket, HINT_FALLBACK.to_string()));
    assert_eq!(session.hints_remaining, 2);
    assert_eq!(session.revealed_hint.as_deref(), Some(HINT_FALLBACK));
}

#[test]
fn duplicate_hint_request_is_suppressed_while_in_flight() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(6));

    assert!(session.request_hint().is_some());
    assert!(session.request_hint().is_none(), "second request must be rejected");
    assert_eq!(session.hints_remaining, 2, "only the first request may spend budget");
}

#[test]
fn hint_request_after_reveal_is_noop() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(6));
    let ticket = session.request_hint().unwrap();
    assert!(session.resolve_hint(ticket, "a clue".to_string()));

    assert!(session.request_hint().is_none());
    assert_eq!(session.hints_remaining, 2);
}

#[test]
fn stale_hint_completion_is_discarded() {
    let mut session = SessionState::build(Difficulty::Medium, &Catalog::builtin(), &mut rng(8));

    let stale = session.request_hint().expect("hint should be granted");
    answer_correctly(&mut session);
    assert_eq!(session.advance(), AdvanceOutcome::NextQuestion);

    // The response arrives after the session moved on: it must not attach to
    // the new question.
    assert!(!session.resolve_hint(stale, "late clue".to_string()));
    assert!(session.revealed_hint.is_none());
}

#[test]
fn fact_requires_a_correct_answer() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(10));

    assert!(session.request_fact().is_none(), "no fact before answering");
    session.submit("Klingon");
    assert!(session.request_fact().is_none(), "no fact after a wrong answer");
}

#[test]
fn fact_is_granted_once_per_question() {
    let mut session = SessionState::build(Difficulty::Easy, &Catalog::builtin(), &mut rng(10));
    answer_correctly(&mut session);

    let ticket = session.request_fact().expect("fact should be granted");
    assert!(session.request_fact().is_none(), "duplicate while in flight");
    assert!(session.resolve_fact(ticket, "a fact".to_string()));
    assert_eq!(session.revealed_fact.as_deref(), Some("a fact"));
    assert!(session.request_fact().is_none(), "no second fact after reveal");
}

#[test]
fn stale_fact_completion_is_discarded() {
    let mut session = SessionState::build(Difficulty::Medium, &Catalog::builtin(), &mut rng(12));
    answer_correctly(&mut session);
    let stale = session.request_fact().unwrap();
    assert_eq!(session.advance(), AdvanceOutcome::NextQuestion);

    assert!(!session.resolve_fact(stale, "late fact".to_string()));
    assert!(session.revealed_fact.is_none());
}

// ── history store ────────────────────────────────────────────────────────────

#[test]
fn history_is_most_recent_first() {
    let mut store = MemoryStore::default();
    let first = QuizResult::new(3, 5, Difficulty::Easy);
    let second = QuizResult::new(9, 10, Difficulty::Medium);

    history::append(&mut store, "a@x.com", first.clone());
    history::append(&mut store, "a@x.com", second.clone());

    assert_eq!(history::load(&store, "a@x.com"), vec![second, first]);

    history::clear(&mut store, "a@x.com");
    assert!(history::load(&store, "a@x.com").is_empty());
}

#[test]
fn history_is_partitioned_by_account() {
    let mut store = MemoryStore::default();
    history::append(&mut store, "a@x.com", QuizResult::new(5, 5, Difficulty::Easy));

    assert!(history::load(&store, "b@x.com").is_empty());
    history::clear(&mut store, "b@x.com");
    assert_eq!(history::load(&store, "a@x.com").len(), 1);
}

#[test]
fn corrupt_history_reads_as_empty() {
    let mut store = MemoryStore::default();
    store.set("quizHistory_a@x.com", "not json at all".to_string());
    assert!(history::load(&store, "a@x.com").is_empty());
}

#[test]
fn quiz_result_round_trips_through_json() {
    let result = QuizResult::new(7, 10, Difficulty::Hard);
    let raw = serde_json::to_string(&result).unwrap();
    let back: QuizResult = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, result);
}

// ── account store ────────────────────────────────────────────────────────────

#[test]
fn register_then_authenticate() {
    let mut store = MemoryStore::default();
    assert_eq!(accounts::register(&mut store, "a@x.com", "p"), Ok(()));
    assert_eq!(accounts::current_user(&store).as_deref(), Some("a@x.com"));

    accounts::logout(&mut store);
    assert!(accounts::current_user(&store).is_none());

    assert_eq!(accounts::authenticate(&mut store, "a@x.com", "p"), Ok(()));
    assert_eq!(accounts::current_user(&store).as_deref(), Some("a@x.com"));
}

#[test]
fn duplicate_registration_keeps_the_stored_password() {
    let mut store = MemoryStore::default();
    accounts::register(&mut store, "a@x.com", "p").unwrap();

    assert_eq!(
        accounts::register(&mut store, "a@x.com", "p2"),
        Err(RegisterError::AlreadyExists)
    );
    assert_eq!(accounts::authenticate(&mut store, "a@x.com", "p"), Ok(()));
    assert_eq!(
        accounts::authenticate(&mut store, "a@x.com", "p2"),
        Err(AuthError::InvalidCredentials)
    );
}

#[test]
fn authenticate_rejects_wrong_credentials() {
    let mut store = MemoryStore::default();
    accounts::register(&mut store, "a@x.com", "p").unwrap();
    accounts::logout(&mut store);

    assert_eq!(
        accounts::authenticate(&mut store, "a@x.com", "wrong"),
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(
        accounts::authenticate(&mut store, "b@x.com", "p"),
        Err(AuthError::InvalidCredentials)
    );
    assert!(accounts::current_user(&store).is_none(), "failed auth must not sign in");
}

#[test]
fn empty_fields_are_rejected_without_state_change() {
    let mut store = MemoryStore::default();
    assert_eq!(
        accounts::register(&mut store, "", "p"),
        Err(RegisterError::EmptyField)
    );
    assert_eq!(
        accounts::register(&mut store, "a@x.com", ""),
        Err(RegisterError::EmptyField)
    );
    assert!(store.get(USERS_KEY).is_none(), "nothing may be stored");
    assert_eq!(
        accounts::authenticate(&mut store, "", ""),
        Err(AuthError::EmptyField)
    );
}

#[test]
fn corrupt_user_list_is_treated_as_empty() {
    let mut store = MemoryStore::default();
    store.set(USERS_KEY, "{{{ not json".to_string());

    // Fail open: sign-in finds nobody, registration starts a fresh list.
    assert_eq!(
        accounts::authenticate(&mut store, "a@x.com", "p"),
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(accounts::register(&mut store, "a@x.com", "p"), Ok(()));
    assert_eq!(accounts::authenticate(&mut store, "a@x.com", "p"), Ok(()));
}

// ── file store ───────────────────────────────────────────────────────────────

#[test]
fn file_store_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!(
        "language-explorer-store-reopen-{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    {
        let mut store = FileStore::open(&path);
        store.set("currentUser", "a@x.com".to_string());
        store.set("users", "[]".to_string());
        store.remove("users");
    }

    let store = FileStore::open(&path);
    assert_eq!(store.get("currentUser").as_deref(), Some("a@x.com"));
    assert!(store.get("users").is_none());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn file_store_recovers_from_corruption() {
    let path = std::env::temp_dir().join(format!(
        "language-explorer-store-corrupt-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, "definitely not json").unwrap();

    let store = FileStore::open(&path);
    assert!(store.get("currentUser").is_none());

    let _ = std::fs::remove_file(&path);
}
