//! Common Types and Constants
//!
//! Shared data structures used across the estimator, selector and session.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Number of points on the ability grid
pub const GRID_SIZE: usize = 20;

/// Lowest ability value on the grid
pub const GRID_MIN: f64 = 0.01;

/// Highest ability value on the grid
pub const GRID_MAX: f64 = 0.99;

/// Numerical stability epsilon (normalization floor, entropy cut-off)
pub const EPSILON: f64 = 1e-10;

/// Default 4PL discrimination
pub const DEFAULT_DISCRIMINATION: f64 = 1.5;

/// Default 4PL guessing floor
pub const DEFAULT_GUESSING: f64 = 0.2;

/// Default 4PL slipping (ceiling = 1 - slipping)
pub const DEFAULT_SLIPPING: f64 = 0.05;

/// Smallest difficulty accepted at the collaborator boundary
pub const MIN_DIFFICULTY: f64 = 1e-3;

/// Largest difficulty accepted at the collaborator boundary
pub const MAX_DIFFICULTY: f64 = 1.0 - 1e-3;

/// Snapshot format version
pub const SNAPSHOT_VERSION: &str = "1.0.0";

// ==================== Question Types ====================

/// A candidate question as seen by the estimator.
///
/// Presentation fields (text, options) live with the collaborator; only the
/// id, difficulty and an optional concept tag flow through here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Stable numeric identifier
    pub id: u64,
    /// Difficulty on the ability scale, in (0, 1)
    pub difficulty: f64,
    /// Concept tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
}

impl Question {
    pub fn new(id: u64, difficulty: f64) -> Self {
        Self {
            id,
            difficulty,
            concept: None,
        }
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }
}

/// One answered question in a learner's history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question_id: u64,
    pub correct: bool,
    /// Ability estimate right after this answer was applied
    pub estimate: f64,
}

/// A raw answer log record, as replayed when restoring a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: u64,
    pub difficulty: f64,
    pub correct: bool,
}

// ==================== Diagnostics ====================

/// Belief health diagnostic result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BeliefDiagnostics {
    pub is_healthy: bool,
    pub has_nan: bool,
    pub has_inf: bool,
    pub has_negative: bool,
    pub sum: f64,
    pub min_mass: f64,
    pub max_mass: f64,
    /// Entropy in bits (0 when the belief is unusable)
    pub entropy: f64,
    pub message: String,
}
