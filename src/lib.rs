//! # danci-ability - 自适应能力评估算法库
//!
//! Estimates a learner's latent ability from multiple-choice answers and
//! picks the question expected to teach us the most about it.
//!
//! - **4PL IRT** - response probability with guessing floor and slipping ceiling
//! - **Belief Tracker** - discrete Bayesian posterior over a fixed ability grid
//! - **EIG Selector** - expected information gain question selection
//! - **Learning Session** - per-learner policy: answered set, convergence, hints
//! - **Simulation** - virtual students comparing adaptive and linear selection
//!
//! ## 模块结构
//!
//! - [`irt`] - 4PL response model
//! - [`belief`] - ability grid, belief state, snapshots
//! - [`selector`] - EIG scoring and selection
//! - [`session`] - learner session policy
//! - [`simulation`] - virtual student batches and reports
//! - [`sanitize`] - boundary clamping, belief repair and diagnostics
//! - [`config`] - session and simulation configuration
//! - [`logging`] - tracing subscriber setup
//! - [`types`] - shared types and constants
//!
//! ## 使用示例
//!
//! ```rust
//! use danci_ability::{select_next, BeliefState, Question};
//!
//! let pool = vec![
//!     Question::new(1, 0.2),
//!     Question::new(2, 0.5),
//!     Question::new(3, 0.8),
//! ];
//!
//! let state = BeliefState::initial();
//! let next = select_next(&state, &pool).unwrap();
//! assert_eq!(next.id, 2);
//!
//! let state = state.update(next, true);
//! assert!(state.estimate() > 0.5);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod belief;
pub mod config;
pub mod error;
pub mod irt;
pub mod logging;
pub mod sanitize;
pub mod selector;
pub mod session;
pub mod simulation;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

pub use error::{AbilityError, Result};

pub use irt::{p_correct, IrtParams};

pub use belief::{ability_grid, entropy, BeliefSnapshot, BeliefState};

pub use selector::{
    display_eig, expected_information_gain, expected_information_gain_with, score_pool,
    select_next, select_next_with, ScoredQuestion,
};

pub use config::{ExhaustionPolicy, SelectionMode, SessionConfig, SimulationConfig};

pub use session::{AnswerOutcome, ConvergenceTracker, HintDecision, HintKind, LearningSession};

pub use simulation::{SimulationReport, SimulationRunner, StudentResult, VirtualStudent};
