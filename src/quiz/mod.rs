pub mod ai_helper;
pub mod catalog;
pub mod options;

use rand::seq::SliceRandom;
use rand::Rng;

use catalog::{Catalog, CountryEntry, Difficulty};

/// Hint budget for one whole session, not per question.
pub const HINTS_PER_SESSION: u8 = 3;

/// Where the current question stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    AwaitingAnswer,
    Answered { correct: bool },
    AllQuestionsDone,
}

/// Lifecycle of one AI-text slot (the hint or the fun fact of the current
/// question). A slot accepts a new request only while `Idle`; `InFlight`
/// suppresses duplicates until the pending request resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
enum FetchSlot {
    #[default]
    Idle,
    InFlight,
    Done,
}

/// Proof that a hint/fact request was accepted, tagged with the question it
/// was issued for. A completion whose tag no longer matches the current
/// question is discarded, so a slow response can never overwrite state that
/// belongs to a later question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FetchTicket {
    question_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Correct,
    Incorrect,
    /// The question was already answered (or the session is over); nothing
    /// changed. Re-submitting is deliberately a no-op.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    NextQuestion,
    Finished,
    /// No answer has been given yet, so there is nothing to advance past.
    Ignored,
}

/// One play-through: the drawn question sequence, the pool distractors come
/// from, and every per-question counter. Lives inside the dialogue state and
/// is dropped once the summary is persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionState {
    pub questions: Vec<CountryEntry>,
    pub pool: Vec<CountryEntry>,
    pub difficulty: Difficulty,
    pub current_index: usize,
    pub score: u32,
    pub hints_remaining: u8,
    pub revealed_hint: Option<String>,
    pub revealed_fact: Option<String>,
    phase: Phase,
    hint_slot: FetchSlot,
    fact_slot: FetchSlot,
}

impl SessionState {
    /// Draws a fresh session for the chosen difficulty: filter the catalog
    /// down to the tier's pool, shuffle it uniformly, keep a prefix of
    /// `question_count` entries.
    ///
    /// A pool smaller than the requested count yields a shorter session
    /// rather than an error; duplicating questions to pad the sequence would
    /// be worse than asking fewer of them.
    pub fn build(difficulty: Difficulty, catalog: &Catalog, rng: &mut impl Rng) -> Self {
        let pool = catalog.pool(difficulty);

        let mut questions = pool.clone();
        questions.shuffle(rng);
        questions.truncate(difficulty.question_count());

        Self {
            questions,
            pool,
            difficulty,
            current_index: 0,
            score: 0,
            hints_remaining: HINTS_PER_SESSION,
            revealed_hint: None,
            revealed_fact: None,
            phase: Phase::AwaitingAnswer,
            hint_slot: FetchSlot::Idle,
            fact_slot: FetchSlot::Idle,
        }
    }

    pub fn current_question(&self) -> Option<&CountryEntry> {
        self.questions.get(self.current_index)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    /// Scores the selected language against the current question. The result
    /// is fixed once entered: any further submission for the same question
    /// falls through as `Ignored`.
    pub fn submit(&mut self, selected: &str) -> SubmitOutcome {
        if self.phase != Phase::AwaitingAnswer {
            return SubmitOutcome::Ignored;
        }
        let correct = match self.current_question() {
            Some(question) => selected == question.language,
            None => return SubmitOutcome::Ignored,
        };

        if correct {
            self.score += 1;
        }
        self.phase = Phase::Answered { correct };
        if correct {
            SubmitOutcome::Correct
        } else {
            SubmitOutcome::Incorrect
        }
    }

    /// Moves past an answered question: on to the next one, or into
    /// `AllQuestionsDone` after the last. Clears the revealed hint/fact and
    /// both fetch slots so nothing from the previous question leaks forward.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if !matches!(self.phase, Phase::Answered { .. }) {
            return AdvanceOutcome::Ignored;
        }

        self.revealed_hint = None;
        self.revealed_fact = None;
        self.hint_slot = FetchSlot::Idle;
        self.fact_slot = FetchSlot::Idle;

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.phase = Phase::AwaitingAnswer;
            AdvanceOutcome::NextQuestion
        } else {
            self.phase = Phase::AllQuestionsDone;
            AdvanceOutcome::Finished
        }
    }

    /// Starts a hint request. Valid only while the question is unanswered,
    /// the budget is not exhausted, and no hint is in flight or already
    /// revealed for this question. The budget is spent here, on the attempt;
    /// a failed fetch does not refund it.
    pub fn request_hint(&mut self) -> Option<FetchTicket> {
        if self.phase != Phase::AwaitingAnswer {
            return None;
        }
        if self.hints_remaining == 0 || self.hint_slot != FetchSlot::Idle {
            return None;
        }
        self.hints_remaining -= 1;
        self.hint_slot = FetchSlot::InFlight;
        Some(FetchTicket {
            question_index: self.current_index,
        })
    }

    /// Lands a hint response. Returns false (and changes nothing) when the
    /// ticket is stale, i.e. the session has advanced since the request.
    pub fn resolve_hint(&mut self, ticket: FetchTicket, text: String) -> bool {
        if ticket.question_index != self.current_index || self.hint_slot != FetchSlot::InFlight {
            return false;
        }
        self.hint_slot = FetchSlot::Done;
        self.revealed_hint = Some(text);
        true
    }

    /// Starts a fun-fact request. Only a correctly answered question earns
    /// one, and only once per question.
    pub fn request_fact(&mut self) -> Option<FetchTicket> {
        if self.phase != (Phase::Answered { correct: true }) {
            return None;
        }
        if self.fact_slot != FetchSlot::Idle {
            return None;
        }
        self.fact_slot = FetchSlot::InFlight;
        Some(FetchTicket {
            question_index: self.current_index,
        })
    }

    /// Lands a fun-fact response, with the same staleness guard as
    /// [`SessionState::resolve_hint`].
    pub fn resolve_fact(&mut self, ticket: FetchTicket, text: String) -> bool {
        if ticket.question_index != self.current_index || self.fact_slot != FetchSlot::InFlight {
            return false;
        }
        self.fact_slot = FetchSlot::Done;
        self.revealed_fact = Some(text);
        true
    }
}
