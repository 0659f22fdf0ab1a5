use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::quiz::catalog::Difficulty;

/// Summary of one finished session. Immutable once created; the session
/// object itself is never persisted, only this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: u32,
    pub total_questions: usize,
    pub difficulty: Difficulty,
    pub date: String,
}

impl QuizResult {
    pub fn new(score: u32, total_questions: usize, difficulty: Difficulty) -> Self {
        Self {
            score,
            total_questions,
            difficulty,
            date: Utc::now().to_rfc3339(),
        }
    }
}

/// History is partitioned strictly per account.
fn history_key(email: &str) -> String {
    format!("quizHistory_{}", email)
}

/// Prepends the result and rewrites the account's full list in one store
/// write, so the persisted list is always most-recent-first and complete.
pub fn append(store: &mut dyn KvStore, email: &str, result: QuizResult) {
    let mut results = load(store, email);
    results.insert(0, result);
    match serde_json::to_string(&results) {
        Ok(raw) => store.set(&history_key(email), raw),
        Err(err) => log::error!("Failed to serialize history for {}: {}", email, err),
    }
}

/// Most-recent-first. An account with no history (or a corrupt entry) reads
/// as empty, never as an error.
pub fn load(store: &dyn KvStore, email: &str) -> Vec<QuizResult> {
    let raw = match store.get(&history_key(email)) {
        Some(raw) => raw,
        None => return Vec::new(),
    };
    match serde_json::from_str(&raw) {
        Ok(results) => results,
        Err(err) => {
            log::warn!("Stored history for {} is corrupt, treating as empty: {}", email, err);
            Vec::new()
        }
    }
}

pub fn clear(store: &mut dyn KvStore, email: &str) {
    store.remove(&history_key(email));
}
