use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use crate::quiz::catalog::CountryEntry;

/// How many incorrect options we aim to show next to the correct one.
const DISTRACTOR_COUNT: usize = 3;

/// Builds the answer choices for one question: the correct language plus up
/// to three distinct distractor languages drawn from the session's candidate
/// pool, shuffled so the correct answer has no fixed position.
///
/// When the pool offers fewer than three distinct incorrect languages the
/// result is shorter than four. That is intended: a thin pool should not
/// repeat a distractor just to fill the grid.
pub fn answer_options(
    question: &CountryEntry,
    pool: &[CountryEntry],
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut incorrect: Vec<&str> = pool
        .iter()
        .map(|entry| entry.language.as_str())
        .filter(|language| *language != question.language)
        .collect();
    incorrect.sort_unstable();
    incorrect.dedup();

    let mut options: Vec<String> = incorrect
        .into_iter()
        .choose_multiple(rng, DISTRACTOR_COUNT)
        .into_iter()
        .map(str::to_string)
        .collect();
    options.push(question.language.clone());
    options.shuffle(rng);
    options
}
