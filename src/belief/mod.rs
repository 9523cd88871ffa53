//! Belief Tracker
//!
//! Discrete Bayesian estimator over a fixed ability grid.
//!
//! Core principles:
//! - The grid holds GRID_SIZE abilities evenly spaced over [GRID_MIN, GRID_MAX]
//! - Belief is a probability mass per grid point, always summing to 1
//! - Each answer multiplies the belief by the 4PL likelihood and renormalizes
//! - Estimate = expectation over the grid, uncertainty = Shannon entropy (bits)
//!
//! Updates follow value semantics: `update` borrows the current state and
//! returns a new one, so a caller can keep the pre-update state around for
//! comparison or display.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{AbilityError, Result};
use crate::irt::IrtParams;
use crate::sanitize::sanitize_belief;
use crate::types::{
    HistoryEntry, Question, EPSILON, GRID_MAX, GRID_MIN, GRID_SIZE, SNAPSHOT_VERSION,
};

/// Belief masses aligned with [`ability_grid`]
pub type Belief = [f64; GRID_SIZE];

static ABILITY_GRID: OnceLock<Belief> = OnceLock::new();

// ==================== Grid & Distribution Helpers ====================

/// The process-wide ability grid, computed once
pub fn ability_grid() -> &'static Belief {
    ABILITY_GRID.get_or_init(|| {
        let step = (GRID_MAX - GRID_MIN) / (GRID_SIZE - 1) as f64;
        let mut grid = [0.0; GRID_SIZE];
        for (i, value) in grid.iter_mut().enumerate() {
            *value = GRID_MIN + step * i as f64;
        }
        grid[GRID_SIZE - 1] = GRID_MAX;
        grid
    })
}

/// Uniform belief (maximum entropy)
pub fn uniform_belief() -> Belief {
    [1.0 / GRID_SIZE as f64; GRID_SIZE]
}

/// Shannon entropy in bits; masses below EPSILON contribute nothing
pub fn entropy(belief: &[f64]) -> f64 {
    belief
        .iter()
        .filter(|&&p| p >= EPSILON)
        .map(|&p| -p * p.log2())
        .sum()
}

/// Expected ability under `belief`
pub fn expectation(belief: &Belief) -> f64 {
    ability_grid()
        .iter()
        .zip(belief.iter())
        .map(|(a, p)| a * p)
        .sum()
}

/// Normalize in place. Returns `false` and falls back to uniform when the
/// total mass is numerically degenerate.
pub fn normalize(belief: &mut Belief) -> bool {
    let sum: f64 = belief.iter().sum();
    if !(sum >= EPSILON) {
        *belief = uniform_belief();
        return false;
    }
    for p in belief.iter_mut() {
        *p /= sum;
    }
    true
}

/// Posterior after observing `correct` on a question of `difficulty`.
///
/// The second element is `false` when normalization degenerated.
pub fn posterior(
    prior: &Belief,
    params: &IrtParams,
    difficulty: f64,
    correct: bool,
) -> (Belief, bool) {
    let grid = ability_grid();
    let mut next = *prior;
    for (p, &ability) in next.iter_mut().zip(grid.iter()) {
        *p *= params.likelihood(ability, difficulty, correct);
    }
    let ok = normalize(&mut next);
    (next, ok)
}

// ==================== Belief State ====================

/// A learner's estimator state
#[derive(Clone, Debug, PartialEq)]
pub struct BeliefState {
    belief: Belief,
    estimate: f64,
    uncertainty: f64,
    history: Vec<HistoryEntry>,
}

impl Default for BeliefState {
    fn default() -> Self {
        Self::initial()
    }
}

impl BeliefState {
    /// Fresh state: uniform belief, grid-mean estimate, log2(N) bits
    pub fn initial() -> Self {
        Self::from_belief(uniform_belief(), Vec::new())
    }

    fn from_belief(belief: Belief, history: Vec<HistoryEntry>) -> Self {
        Self {
            estimate: expectation(&belief),
            uncertainty: entropy(&belief),
            belief,
            history,
        }
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    /// Expected ability
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Entropy of the belief in bits
    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn answered_count(&self) -> usize {
        self.history.len()
    }

    /// Apply one observed answer under the default 4PL parameters
    pub fn update(&self, question: &Question, correct: bool) -> Self {
        self.update_with(&IrtParams::default(), question, correct)
    }

    /// Apply one observed answer and return the successor state
    pub fn update_with(&self, params: &IrtParams, question: &Question, correct: bool) -> Self {
        let (belief, ok) = posterior(&self.belief, params, question.difficulty, correct);
        if !ok {
            tracing::debug!(
                question_id = question.id,
                difficulty = question.difficulty,
                "degenerate posterior mass, belief reset to uniform"
            );
        }

        let mut history = Vec::with_capacity(self.history.len() + 1);
        history.extend_from_slice(&self.history);

        let mut next = Self::from_belief(belief, history);
        next.history.push(HistoryEntry {
            question_id: question.id,
            correct,
            estimate: next.estimate,
        });
        next
    }

    /// Export for persistence
    pub fn snapshot(&self) -> BeliefSnapshot {
        BeliefSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            belief: self.belief.to_vec(),
            history: self.history.clone(),
            answered: None,
        }
    }

    /// Rebuild from a persisted snapshot. Estimate and uncertainty are
    /// always recomputed from the restored belief.
    pub fn from_snapshot(snapshot: &BeliefSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                version = %snapshot.version,
                expected = SNAPSHOT_VERSION,
                "restoring belief snapshot with a different version"
            );
        }
        if let Some(entry) = snapshot.history.iter().find(|e| !e.estimate.is_finite()) {
            return Err(AbilityError::InvalidSnapshot(format!(
                "history entry for question {} has estimate {}",
                entry.question_id, entry.estimate
            )));
        }
        let belief = sanitize_belief(&snapshot.belief)?;
        Ok(Self::from_belief(belief, snapshot.history.clone()))
    }
}

/// Serializable estimator state: a flat belief array plus the answer history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeliefSnapshot {
    pub version: String,
    pub belief: Vec<f64>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Question ids still excluded from selection, written by sessions.
    /// `None` means every history entry counts as answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered: Option<Vec<u64>>,
}

impl BeliefSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
