//! 4PL Item Response Model
//!
//! Probability of a correct response given a hypothesized ability and a
//! question difficulty:
//!
//! - P = c + (1 - c - s) * σ(a * (θ - b))
//!   - θ: ability, b: difficulty
//!   - a: discrimination (slope of the curve)
//!   - c: guessing floor (chance of a lucky guess at zero ability)
//!   - s: slipping (careless-error rate, ceiling is 1 - s)
//!
//! The floor and ceiling keep every likelihood strictly inside (0, 1), so the
//! Bayesian update and entropy stay well defined.

use serde::{Deserialize, Serialize};

use crate::error::{AbilityError, Result};
use crate::types::{DEFAULT_DISCRIMINATION, DEFAULT_GUESSING, DEFAULT_SLIPPING};

/// 4PL curve parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrtParams {
    pub discrimination: f64,
    pub guessing: f64,
    pub slipping: f64,
}

impl Default for IrtParams {
    fn default() -> Self {
        Self {
            discrimination: DEFAULT_DISCRIMINATION,
            guessing: DEFAULT_GUESSING,
            slipping: DEFAULT_SLIPPING,
        }
    }
}

impl IrtParams {
    /// Probability of a correct response, in `[guessing, 1 - slipping]`
    #[inline]
    pub fn p_correct(&self, ability: f64, difficulty: f64) -> f64 {
        let base = sigmoid(self.discrimination * (ability - difficulty));
        self.guessing + (1.0 - self.guessing - self.slipping) * base
    }

    /// Likelihood of the observed outcome
    #[inline]
    pub fn likelihood(&self, ability: f64, difficulty: f64, correct: bool) -> f64 {
        let p = self.p_correct(ability, difficulty);
        if correct {
            p
        } else {
            1.0 - p
        }
    }

    /// Lowest probability the curve can produce
    pub fn floor(&self) -> f64 {
        self.guessing
    }

    /// Highest probability the curve can produce
    pub fn ceiling(&self) -> f64 {
        1.0 - self.slipping
    }

    pub fn validate(&self) -> Result<()> {
        if !self.discrimination.is_finite() || self.discrimination <= 0.0 {
            return Err(AbilityError::Config(format!(
                "discrimination must be positive, got {}",
                self.discrimination
            )));
        }
        if !(0.0..1.0).contains(&self.guessing) || !(0.0..1.0).contains(&self.slipping) {
            return Err(AbilityError::Config(format!(
                "guessing and slipping must be in [0, 1), got {} / {}",
                self.guessing, self.slipping
            )));
        }
        // Both bounds must stay strictly inside (0, 1)
        if self.guessing <= 0.0 || self.slipping <= 0.0 || self.guessing + self.slipping >= 1.0 {
            return Err(AbilityError::Config(format!(
                "guessing ({}) and slipping ({}) must leave an open (0, 1) band",
                self.guessing, self.slipping
            )));
        }
        Ok(())
    }
}

/// Probability of a correct response under the default 4PL parameters
#[inline]
pub fn p_correct(ability: f64, difficulty: f64) -> f64 {
    IrtParams::default().p_correct(ability, difficulty)
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
