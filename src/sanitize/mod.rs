//! Data Sanitization
//!
//! Boundary checks applied before data reaches the estimator.
//!
//! Functions:
//! - Difficulty clamping
//! - Persisted belief repair and validation
//! - Belief health diagnostics
//!
//! The estimator's hot path does no validation of its own; everything coming
//! from storage or from the question bank should pass through here first.

use crate::belief::{entropy, Belief};
use crate::error::{AbilityError, Result};
use crate::types::{
    BeliefDiagnostics, Question, EPSILON, GRID_SIZE, MAX_DIFFICULTY, MIN_DIFFICULTY,
};

/// Tolerance on the total mass of a healthy belief
const SUM_TOLERANCE: f64 = 1e-6;

/// Clamp a difficulty into the open unit interval. NaN maps to 0.5.
pub fn clamp_difficulty(difficulty: f64) -> f64 {
    if difficulty.is_nan() {
        return 0.5;
    }
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Copy of `question` with its difficulty clamped
pub fn sanitize_question(question: &Question) -> Question {
    Question {
        difficulty: clamp_difficulty(question.difficulty),
        ..question.clone()
    }
}

/// Repair a persisted belief array.
///
/// A length other than GRID_SIZE is unrecoverable. Non-finite or negative
/// entries are zeroed; a total mass that collapses resets to uniform;
/// anything else is renormalized. Entries are scaled by their maximum
/// first, so huge finite masses cannot overflow the sum.
pub fn sanitize_belief(raw: &[f64]) -> Result<Belief> {
    if raw.len() != GRID_SIZE {
        return Err(AbilityError::BeliefLengthMismatch {
            expected: GRID_SIZE,
            actual: raw.len(),
        });
    }

    let mut belief = [0.0; GRID_SIZE];
    let mut repaired = 0usize;
    for (dst, &src) in belief.iter_mut().zip(raw.iter()) {
        if src.is_finite() && src >= 0.0 {
            *dst = src;
        } else {
            repaired += 1;
        }
    }

    if repaired > 0 {
        tracing::warn!(repaired, "persisted belief contained invalid entries");
    }

    let max = belief.iter().copied().fold(0.0, f64::max);
    if max > 1.0 {
        for p in belief.iter_mut() {
            *p /= max;
        }
    }

    let sum: f64 = belief.iter().sum();
    if sum < EPSILON {
        tracing::warn!(sum, "persisted belief has no usable mass, resetting to uniform");
    } else if (sum - 1.0).abs() > SUM_TOLERANCE {
        tracing::debug!(sum, "renormalizing persisted belief");
    }
    crate::belief::normalize(&mut belief);
    Ok(belief)
}

/// 诊断信念分布健康状态
pub fn diagnose_belief(belief: &[f64]) -> BeliefDiagnostics {
    let has_nan = belief.iter().any(|p| p.is_nan());
    let has_inf = belief.iter().any(|p| p.is_infinite());
    let has_negative = belief.iter().any(|&p| p < 0.0);

    let finite = belief.iter().copied().filter(|p| p.is_finite());
    let sum: f64 = finite.clone().sum();
    let min_mass = finite.clone().fold(f64::MAX, f64::min);
    let max_mass = finite.fold(f64::MIN, f64::max);

    let length_ok = belief.len() == GRID_SIZE;
    let sum_ok = (sum - 1.0).abs() <= SUM_TOLERANCE;
    let is_healthy = length_ok && !has_nan && !has_inf && !has_negative && sum_ok;

    let message = if is_healthy {
        "Belief is healthy".to_string()
    } else if !length_ok {
        format!("Belief has {} entries, expected {}", belief.len(), GRID_SIZE)
    } else if has_nan {
        "Belief contains NaN values".to_string()
    } else if has_inf {
        "Belief contains infinite values".to_string()
    } else if has_negative {
        "Belief contains negative masses".to_string()
    } else {
        format!("Belief mass sums to {:.6}", sum)
    };

    BeliefDiagnostics {
        is_healthy,
        has_nan,
        has_inf,
        has_negative,
        sum,
        min_mass: if min_mass == f64::MAX { 0.0 } else { min_mass },
        max_mass: if max_mass == f64::MIN { 0.0 } else { max_mass },
        entropy: if is_healthy { entropy(belief) } else { 0.0 },
        message,
    }
}
