//! Question Selector
//!
//! Expected Information Gain (EIG) driven item selection.
//!
//! - EIG(q) = H(b) - [ P(correct) * H(b | correct) + P(wrong) * H(b | wrong) ]
//!   - H: Shannon entropy in bits
//!   - P(correct) = Σ b_i * p_correct(θ_i, d_q), the marginal over the belief
//!
//! Selection is a full scan of the pool, O(|pool| × GRID_SIZE). The pool is
//! small in practice; this scan is the first place to look if pools grow to
//! many thousands of items.

use serde::{Deserialize, Serialize};

use crate::belief::{ability_grid, entropy, posterior, Belief, BeliefState};
use crate::irt::IrtParams;
use crate::types::Question;

/// EIG values whose magnitude is below this are displayed as zero
const DISPLAY_FLOOR: f64 = 1e-9;

/// A candidate with its score
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredQuestion {
    pub question_id: u64,
    pub difficulty: f64,
    /// Expected information gain in bits
    pub eig: f64,
}

/// Marginal probability of a correct answer under `belief`
pub fn marginal_p_correct(belief: &Belief, params: &IrtParams, difficulty: f64) -> f64 {
    ability_grid()
        .iter()
        .zip(belief.iter())
        .map(|(&ability, &p)| p * params.p_correct(ability, difficulty))
        .sum()
}

/// EIG of `question` under the default 4PL parameters
pub fn expected_information_gain(belief: &Belief, question: &Question) -> f64 {
    expected_information_gain_with(belief, &IrtParams::default(), question)
}

/// EIG in bits. Not clamped: tiny negative values are floating-point noise.
pub fn expected_information_gain_with(
    belief: &Belief,
    params: &IrtParams,
    question: &Question,
) -> f64 {
    let prior_entropy = entropy(belief);
    let p_correct = marginal_p_correct(belief, params, question.difficulty);

    let (if_correct, _) = posterior(belief, params, question.difficulty, true);
    let (if_wrong, _) = posterior(belief, params, question.difficulty, false);

    let expected_posterior_entropy =
        p_correct * entropy(&if_correct) + (1.0 - p_correct) * entropy(&if_wrong);

    prior_entropy - expected_posterior_entropy
}

/// EIG formatted for display: floating-point noise around zero shows as 0
pub fn display_eig(eig: f64) -> f64 {
    if eig.abs() < DISPLAY_FLOOR {
        0.0
    } else {
        eig
    }
}

/// Pick the candidate with the highest EIG under the default parameters
pub fn select_next<'a, I>(state: &BeliefState, pool: I) -> Option<&'a Question>
where
    I: IntoIterator<Item = &'a Question>,
{
    select_next_with(state, &IrtParams::default(), pool)
}

/// Pick the candidate with the strictly highest EIG; the first maximum in
/// pool order wins ties. `None` for an empty pool.
pub fn select_next_with<'a, I>(
    state: &BeliefState,
    params: &IrtParams,
    pool: I,
) -> Option<&'a Question>
where
    I: IntoIterator<Item = &'a Question>,
{
    let mut best: Option<(&'a Question, f64)> = None;
    let mut scanned = 0usize;
    for question in pool {
        scanned += 1;
        let eig = expected_information_gain_with(state.belief(), params, question);
        match best {
            Some((_, best_eig)) if eig <= best_eig => {}
            _ => best = Some((question, eig)),
        }
    }

    if let Some((question, eig)) = best {
        tracing::trace!(
            question_id = question.id,
            difficulty = question.difficulty,
            eig,
            pool_size = scanned,
            "selected question"
        );
    }
    best.map(|(question, _)| question)
}

/// Score every candidate, in pool order
pub fn score_pool(
    state: &BeliefState,
    params: &IrtParams,
    pool: &[Question],
) -> Vec<ScoredQuestion> {
    pool.iter()
        .map(|question| ScoredQuestion {
            question_id: question.id,
            difficulty: question.difficulty,
            eig: expected_information_gain_with(state.belief(), params, question),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::uniform_belief;

    fn pool(difficulties: &[f64]) -> Vec<Question> {
        difficulties
            .iter()
            .enumerate()
            .map(|(i, &d)| Question::new(i as u64 + 1, d))
            .collect()
    }

    #[test]
    fn test_empty_pool_returns_none() {
        let empty: Vec<Question> = Vec::new();
        assert!(select_next(&BeliefState::initial(), &empty).is_none());
    }

    #[test]
    fn test_single_candidate_is_selected() {
        let candidates = pool(&[0.99]);
        let picked = select_next(&BeliefState::initial(), &candidates).unwrap();
        assert_eq!(picked.id, 1);
    }

    #[test]
    fn test_uniform_belief_prefers_middle_difficulty() {
        let candidates = pool(&[0.2, 0.5, 0.8]);
        let picked = select_next(&BeliefState::initial(), &candidates).unwrap();
        assert_eq!(picked.difficulty, 0.5);
    }

    #[test]
    fn test_tie_break_first_in_pool_order() {
        let candidates = vec![Question::new(9, 0.5), Question::new(3, 0.5)];
        let picked = select_next(&BeliefState::initial(), &candidates).unwrap();
        assert_eq!(picked.id, 9);
    }

    #[test]
    fn test_eig_nonnegative_on_uniform() {
        let belief = uniform_belief();
        for i in 0..=20 {
            let q = Question::new(i, i as f64 / 20.0);
            assert!(expected_information_gain(&belief, &q) >= -1e-9);
        }
    }

    #[test]
    fn test_eig_is_pure() {
        let state = BeliefState::initial().update(&Question::new(1, 0.3), true);
        let q = Question::new(2, 0.6);
        let a = expected_information_gain(state.belief(), &q);
        let b = expected_information_gain(state.belief(), &q);
        assert_eq!(a, b);
    }

    #[test]
    fn test_eig_zero_for_point_mass() {
        let mut belief = [0.0; crate::types::GRID_SIZE];
        belief[10] = 1.0;
        let eig = expected_information_gain(&belief, &Question::new(1, 0.5));
        assert_eq!(display_eig(eig), 0.0);
    }

    #[test]
    fn test_marginal_matches_p_correct_on_uniform() {
        let belief = uniform_belief();
        let params = IrtParams::default();
        let p = marginal_p_correct(&belief, &params, 0.5);
        // symmetric curve around 0.5 on a symmetric grid
        assert!((p - 0.575).abs() < 1e-9, "p = {}", p);
    }

    #[test]
    fn test_selection_follows_belief() {
        // after many correct answers the belief sits high, so a hard item
        // should beat an easy one
        let mut state = BeliefState::initial();
        for id in 0..20 {
            state = state.update(&Question::new(id, 0.7), true);
        }
        let candidates = pool(&[0.1, 0.9]);
        let picked = select_next(&state, &candidates).unwrap();
        assert_eq!(picked.difficulty, 0.9);
    }

    #[test]
    fn test_score_pool_preserves_order() {
        let candidates = pool(&[0.8, 0.2, 0.5]);
        let scores = score_pool(&BeliefState::initial(), &IrtParams::default(), &candidates);
        let ids: Vec<u64> = scores.iter().map(|s| s.question_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(scores[2].eig > scores[0].eig);
    }
}
