//! Learner Simulation
//!
//! Virtual students with a known true ability answer questions drawn by the
//! adaptive (EIG) policy or the linear control policy. Comparing how fast
//! the estimate lands near the true ability measures what adaptive
//! selection buys.
//!
//! - Each student owns a seeded ChaCha8 RNG, so a batch is reproducible
//! - Answers are sampled from the same 4PL curve the estimator assumes
//! - Batches run in parallel with rayon; result order follows the
//!   (ability, student, mode) loop order regardless of scheduling

pub mod bank;
pub mod output;
pub mod report;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ExhaustionPolicy, SelectionMode, SessionConfig, SimulationConfig};
use crate::error::{AbilityError, Result};
use crate::irt::IrtParams;
use crate::session::LearningSession;
use crate::types::Question;

pub use bank::{evenly_spaced, load_questions};
pub use output::{
    result_rows, trajectory_rows, write_outputs, OutputFiles, ResultRow, TrajectoryRow,
};
pub use report::{GroupSummary, ModeSummary, SimulationReport};

// ==================== Data Structures ====================

/// One point of a student's estimate trajectory
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub step: usize,
    pub estimated_ability: f64,
    pub entropy: f64,
    /// Question answered at this step (`None` for the prior)
    pub question_id: Option<u64>,
}

/// Outcome of one simulated student
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudentResult {
    pub student_id: String,
    pub true_ability: f64,
    pub mode: SelectionMode,
    /// Step at which the student converged, or total questions otherwise
    pub convergence_step: usize,
    pub final_estimated: f64,
    pub final_error: f64,
    pub total_questions: usize,
    pub converged: bool,
    pub trajectory: Vec<TrajectoryPoint>,
}

// ==================== Virtual Student ====================

pub struct VirtualStudent {
    student_id: String,
    true_ability: f64,
    mode: SelectionMode,
    params: IrtParams,
    rng: ChaCha8Rng,
    session: LearningSession,
    estimates: Vec<f64>,
    trajectory: Vec<TrajectoryPoint>,
}

impl VirtualStudent {
    pub fn new(
        student_id: impl Into<String>,
        true_ability: f64,
        mode: SelectionMode,
        params: IrtParams,
        seed: u64,
    ) -> Result<Self> {
        let session = LearningSession::new(SessionConfig {
            irt: params,
            mode,
            exhaustion: ExhaustionPolicy::Finish,
            ..SessionConfig::default()
        })?;

        Ok(Self {
            student_id: student_id.into(),
            true_ability,
            mode,
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            session,
            estimates: Vec::new(),
            trajectory: Vec::new(),
        })
    }

    /// Sample a response from the student's true ability
    pub fn simulate_answer(&mut self, difficulty: f64) -> bool {
        let p = self.params.p_correct(self.true_ability, difficulty);
        self.rng.gen::<f64>() < p
    }

    /// Converged when the latest estimate (or, with `use_stability`, each of
    /// the last `window` estimates) is within `threshold` of the true ability
    pub fn is_converged(&self, threshold: f64, window: usize, use_stability: bool) -> bool {
        let within = |est: &f64| (est - self.true_ability).abs() < threshold;
        if !use_stability {
            return self.estimates.last().map_or(false, within);
        }
        let window = window.max(1);
        self.estimates.len() >= window
            && self.estimates[self.estimates.len() - window..].iter().all(within)
    }

    fn record(&mut self, question_id: Option<u64>) {
        let step = self.trajectory.len();
        let estimate = self.session.estimate();
        self.estimates.push(estimate);
        self.trajectory.push(TrajectoryPoint {
            step,
            estimated_ability: estimate,
            entropy: self.session.uncertainty(),
            question_id,
        });
    }

    /// Answer questions until convergence, pool exhaustion or the question cap
    pub fn simulate_learning(
        mut self,
        pool: &[Question],
        config: &SimulationConfig,
    ) -> StudentResult {
        self.record(None);

        let mut convergence_step = None;
        for step in 1..=config.max_questions {
            let Some(question) = self.session.next_question(pool) else {
                break;
            };
            let correct = self.simulate_answer(question.difficulty);
            self.session.submit(question, correct);
            self.record(Some(question.id));

            if self.is_converged(
                config.convergence_threshold,
                config.stability_window,
                config.use_stability_check,
            ) {
                convergence_step = Some(step);
                break;
            }
        }

        let final_estimated = self.session.estimate();
        let total_questions = self.session.state().answered_count();
        StudentResult {
            student_id: self.student_id,
            true_ability: self.true_ability,
            mode: self.mode,
            convergence_step: convergence_step.unwrap_or(total_questions),
            final_estimated,
            final_error: (final_estimated - self.true_ability).abs(),
            total_questions,
            converged: convergence_step.is_some(),
            trajectory: self.trajectory,
        }
    }
}

// ==================== Runner ====================

/// One planned experiment of a batch
#[derive(Clone, Debug)]
struct Experiment {
    true_ability: f64,
    student_index: usize,
    mode: SelectionMode,
    seed: u64,
}

pub struct SimulationRunner {
    config: SimulationConfig,
    pool: Vec<Question>,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig, pool: Vec<Question>) -> Result<Self> {
        config.validate()?;
        if pool.is_empty() {
            return Err(AbilityError::Config("question pool must not be empty".into()));
        }
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn plan(&self) -> Vec<Experiment> {
        let mut experiments = Vec::with_capacity(self.config.total_experiments());
        for &true_ability in &self.config.ability_values {
            for student_index in 0..self.config.students_per_ability {
                for &mode in &self.config.modes {
                    let seed = self.config.random_seed + experiments.len() as u64;
                    experiments.push(Experiment {
                        true_ability,
                        student_index,
                        mode,
                        seed,
                    });
                }
            }
        }
        experiments
    }

    pub fn run_single(
        &self,
        true_ability: f64,
        mode: SelectionMode,
        student_index: usize,
        seed: u64,
    ) -> Result<StudentResult> {
        let student_id =
            format!("Robot_{:.1}_{:03}_{}", true_ability, student_index, mode.label());
        let student = VirtualStudent::new(student_id, true_ability, mode, self.config.irt, seed)?;
        Ok(student.simulate_learning(&self.pool, &self.config))
    }

    /// Run every (ability, student, mode) combination in parallel
    pub fn run_batch(&self) -> Result<Vec<StudentResult>> {
        let experiments = self.plan();
        tracing::info!(
            experiments = experiments.len(),
            pool_size = self.pool.len(),
            threshold = self.config.convergence_threshold,
            "starting simulation batch"
        );

        let results: Vec<StudentResult> = experiments
            .par_iter()
            .map(|e| self.run_single(e.true_ability, e.mode, e.student_index, e.seed))
            .collect::<Result<Vec<_>>>()?;

        let converged = results.iter().filter(|r| r.converged).count();
        tracing::info!(
            experiments = results.len(),
            converged,
            "simulation batch complete"
        );
        Ok(results)
    }
}
