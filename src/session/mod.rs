//! Learning Session
//!
//! Per-learner policy around the estimator: which questions are still
//! available, when the pool is exhausted, when the estimate has settled, and
//! whether a hint should cost anything.
//!
//! Submitting an answer needs `&mut self`, so updates for one learner are
//! applied strictly one after another.

use std::collections::HashSet;
use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};

use crate::belief::{BeliefSnapshot, BeliefState};
use crate::config::{ExhaustionPolicy, SelectionMode, SessionConfig};
use crate::error::Result;
use crate::sanitize::sanitize_question;
use crate::selector::{expected_information_gain_with, select_next_with};
use crate::types::{AnswerRecord, Question};

// ==================== Convergence ====================

/// Tracks consecutive answers whose estimate change stayed under a threshold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceTracker {
    threshold: f64,
    window: usize,
    stable_streak: usize,
}

impl ConvergenceTracker {
    pub fn new(threshold: f64, window: usize) -> Self {
        Self {
            threshold,
            window: window.max(1),
            stable_streak: 0,
        }
    }

    /// Record one estimate transition and report convergence
    pub fn observe(&mut self, previous: f64, current: f64) -> bool {
        if (current - previous).abs() < self.threshold {
            self.stable_streak += 1;
        } else {
            self.stable_streak = 0;
        }
        self.is_converged()
    }

    pub fn is_converged(&self) -> bool {
        self.stable_streak >= self.window
    }

    pub fn stable_streak(&self) -> usize {
        self.stable_streak
    }

    pub fn reset(&mut self) {
        self.stable_streak = 0;
    }
}

// ==================== Outcomes ====================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: u64,
    pub correct: bool,
    /// EIG of the answered question, measured before the update
    pub eig: f64,
    pub estimate_before: f64,
    pub estimate: f64,
    pub uncertainty: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
    /// Uncertainty is high: hints help exploration and are free
    Free,
    /// The estimate is fairly certain: hints carry a cost
    Cost,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HintDecision {
    pub kind: HintKind,
    pub cost: f64,
    /// Entropy at decision time, in nats
    pub entropy: f64,
}

// ==================== Session ====================

pub struct LearningSession {
    config: SessionConfig,
    state: BeliefState,
    answered: HashSet<u64>,
    convergence: ConvergenceTracker,
}

impl LearningSession {
    /// New session with a uniform belief
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_state(config, BeliefState::initial()))
    }

    fn with_state(config: SessionConfig, state: BeliefState) -> Self {
        let convergence =
            ConvergenceTracker::new(config.convergence_threshold, config.stability_window);
        Self {
            config,
            state,
            answered: HashSet::new(),
            convergence,
        }
    }

    /// Restore from persisted state. The convergence streak is rebuilt from
    /// the snapshot history; answered ids come from the snapshot's answered
    /// set, or from the whole history when the snapshot has none.
    pub fn from_snapshot(config: SessionConfig, snapshot: &BeliefSnapshot) -> Result<Self> {
        config.validate()?;
        let state = BeliefState::from_snapshot(snapshot)?;
        let mut session = Self::with_state(config, state);

        let mut previous = BeliefState::initial().estimate();
        for entry in session.state.history() {
            session.convergence.observe(previous, entry.estimate);
            previous = entry.estimate;
        }
        session.answered = match &snapshot.answered {
            Some(ids) => ids.iter().copied().collect(),
            None => session.state.history().iter().map(|e| e.question_id).collect(),
        };

        tracing::debug!(
            answered = session.answered.len(),
            estimate = session.state.estimate(),
            "session restored from snapshot"
        );
        Ok(session)
    }

    /// Rebuild a session by replaying an ordered answer log
    pub fn replay(config: SessionConfig, records: &[AnswerRecord]) -> Result<Self> {
        let mut session = Self::new(config)?;
        for record in records {
            let question = Question::new(record.question_id, record.difficulty);
            session.submit(&question, record.correct);
        }
        tracing::debug!(
            replayed = records.len(),
            answered = session.answered.len(),
            estimate = session.state.estimate(),
            "session rebuilt from answer log"
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &BeliefState {
        &self.state
    }

    pub fn estimate(&self) -> f64 {
        self.state.estimate()
    }

    pub fn uncertainty(&self) -> f64 {
        self.state.uncertainty()
    }

    pub fn is_converged(&self) -> bool {
        self.convergence.is_converged()
    }

    pub fn is_answered(&self, question_id: u64) -> bool {
        self.answered.contains(&question_id)
    }

    /// Answered ids in ascending order
    pub fn answered_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.answered.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Choose the next question from `pool`, skipping answered ones.
    ///
    /// With `ExhaustionPolicy::Recycle` an exhausted pool clears the answered
    /// set and selection starts over on the full pool.
    pub fn next_question<'a>(&mut self, pool: &'a [Question]) -> Option<&'a Question> {
        if pool.is_empty() {
            return None;
        }

        if let Some(question) = self.pick(pool) {
            return Some(question);
        }

        match self.config.exhaustion {
            ExhaustionPolicy::Finish => {
                tracing::debug!(pool_size = pool.len(), "question pool exhausted");
                None
            }
            ExhaustionPolicy::Recycle => {
                tracing::debug!(pool_size = pool.len(), "question pool exhausted, recycling");
                self.answered.clear();
                self.pick(pool)
            }
        }
    }

    fn pick<'a>(&self, pool: &'a [Question]) -> Option<&'a Question> {
        let unanswered = pool.iter().filter(|q| !self.answered.contains(&q.id));
        match self.config.mode {
            SelectionMode::Adaptive => select_next_with(&self.state, &self.config.irt, unanswered),
            SelectionMode::Linear => unanswered.min_by_key(|q| q.id),
        }
    }

    /// Apply one judged answer
    pub fn submit(&mut self, question: &Question, correct: bool) -> AnswerOutcome {
        let question = sanitize_question(question);
        let estimate_before = self.state.estimate();
        let eig = expected_information_gain_with(self.state.belief(), &self.config.irt, &question);

        self.state = self.state.update_with(&self.config.irt, &question, correct);
        self.answered.insert(question.id);
        let converged = self.convergence.observe(estimate_before, self.state.estimate());

        tracing::debug!(
            question_id = question.id,
            correct,
            eig,
            estimate = self.state.estimate(),
            uncertainty = self.state.uncertainty(),
            converged,
            "answer applied"
        );

        AnswerOutcome {
            question_id: question.id,
            correct,
            eig,
            estimate_before,
            estimate: self.state.estimate(),
            uncertainty: self.state.uncertainty(),
            converged,
        }
    }

    /// Free hints while uncertainty is high, costed hints once it drops.
    /// The threshold is compared in nats.
    pub fn hint_decision(&self) -> HintDecision {
        let entropy = self.state.uncertainty() * LN_2;
        if entropy > self.config.hint_entropy_threshold {
            HintDecision {
                kind: HintKind::Free,
                cost: 0.0,
                entropy,
            }
        } else {
            HintDecision {
                kind: HintKind::Cost,
                cost: self.config.hint_cost,
                entropy,
            }
        }
    }

    /// Export belief, history and the current answered set
    pub fn snapshot(&self) -> BeliefSnapshot {
        BeliefSnapshot {
            answered: Some(self.answered_ids()),
            ..self.state.snapshot()
        }
    }

    /// Start over with a uniform belief
    pub fn reset(&mut self) {
        self.state = BeliefState::initial();
        self.answered.clear();
        self.convergence.reset();
        tracing::info!("learning session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GRID_SIZE;

    fn bank() -> Vec<Question> {
        vec![
            Question::new(3, 0.8),
            Question::new(1, 0.2),
            Question::new(2, 0.5),
        ]
    }

    fn session(mode: SelectionMode, exhaustion: ExhaustionPolicy) -> LearningSession {
        LearningSession::new(SessionConfig {
            mode,
            exhaustion,
            ..SessionConfig::default()
        })
        .unwrap()
    }

    // ==================== ConvergenceTracker 测试 ====================

    #[test]
    fn test_convergence_requires_consecutive_stable_steps() {
        let mut tracker = ConvergenceTracker::new(0.05, 3);
        assert!(!tracker.observe(0.50, 0.52));
        assert!(!tracker.observe(0.52, 0.53));
        assert!(!tracker.observe(0.53, 0.70));
        assert_eq!(tracker.stable_streak(), 0);
        assert!(!tracker.observe(0.70, 0.71));
        assert!(!tracker.observe(0.71, 0.72));
        assert!(tracker.observe(0.72, 0.72));
    }

    #[test]
    fn test_convergence_window_floor() {
        let mut tracker = ConvergenceTracker::new(0.05, 0);
        assert!(tracker.observe(0.5, 0.5));
    }

    // ==================== selection 测试 ====================

    #[test]
    fn test_adaptive_picks_middle_first() {
        let pool = bank();
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        assert_eq!(s.next_question(&pool).map(|q| q.id), Some(2));
    }

    #[test]
    fn test_linear_picks_lowest_unanswered_id() {
        let pool = bank();
        let mut s = session(SelectionMode::Linear, ExhaustionPolicy::Finish);
        assert_eq!(s.next_question(&pool).map(|q| q.id), Some(1));
        s.submit(&pool[1], true);
        assert_eq!(s.next_question(&pool).map(|q| q.id), Some(2));
    }

    #[test]
    fn test_answered_questions_are_skipped() {
        let pool = bank();
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        let first = s.next_question(&pool).unwrap().clone();
        s.submit(&first, true);
        let second = s.next_question(&pool).unwrap();
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn test_finish_policy_returns_none_when_exhausted() {
        let pool = bank();
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        for q in &pool {
            s.submit(q, false);
        }
        assert!(s.next_question(&pool).is_none());
        assert_eq!(s.answered_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_recycle_policy_restarts_pool() {
        let pool = bank();
        let mut s = session(SelectionMode::Linear, ExhaustionPolicy::Recycle);
        for q in &pool {
            s.submit(q, true);
        }
        assert_eq!(s.next_question(&pool).map(|q| q.id), Some(1));
        assert!(s.answered_ids().is_empty());
        // belief is untouched by recycling
        assert_eq!(s.state().answered_count(), 3);
    }

    #[test]
    fn test_empty_pool() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Recycle);
        assert!(s.next_question(&[]).is_none());
    }

    // ==================== submit 测试 ====================

    #[test]
    fn test_submit_reports_pre_update_eig() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        let q = Question::new(5, 0.5);
        let expected = expected_information_gain_with(
            BeliefState::initial().belief(),
            &s.config().irt,
            &q,
        );
        let outcome = s.submit(&q, true);
        assert_eq!(outcome.eig, expected);
        assert!((outcome.estimate_before - 0.5).abs() < 1e-9);
        assert!(outcome.estimate > outcome.estimate_before);
        assert!(s.is_answered(5));
    }

    #[test]
    fn test_submit_clamps_difficulty() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        let outcome = s.submit(&Question::new(1, f64::NAN), true);
        assert!(outcome.estimate.is_finite());
        assert!(outcome.uncertainty.is_finite());
    }

    // ==================== hint 测试 ====================

    #[test]
    fn test_hint_free_while_uncertain() {
        let s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        let hint = s.hint_decision();
        assert_eq!(hint.kind, HintKind::Free);
        assert_eq!(hint.cost, 0.0);
        assert!((hint.entropy - (GRID_SIZE as f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn test_hint_threshold_in_nats() {
        // 7 correct answers at 0.9 leave ~2.55 nats, the 8th ~2.46 nats
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        let q = Question::new(1, 0.9);
        for _ in 0..7 {
            s.submit(&q, true);
        }
        assert_eq!(s.hint_decision().kind, HintKind::Free);

        s.submit(&q, true);
        let hint = s.hint_decision();
        assert_eq!(hint.kind, HintKind::Cost);
        assert!((hint.entropy - s.uncertainty() * LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_hint_costs_once_certain() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        let q = Question::new(1, 0.9);
        for _ in 0..100 {
            s.submit(&q, true);
        }
        let hint = s.hint_decision();
        assert_eq!(hint.kind, HintKind::Cost);
        assert_eq!(hint.cost, 0.5);
        assert!(hint.entropy <= 2.5);
    }

    // ==================== restore 测试 ====================

    #[test]
    fn test_replay_matches_live_session() {
        let records = vec![
            AnswerRecord { question_id: 1, difficulty: 0.2, correct: true },
            AnswerRecord { question_id: 2, difficulty: 0.5, correct: false },
            AnswerRecord { question_id: 2, difficulty: 0.5, correct: true },
        ];
        let replayed = LearningSession::replay(SessionConfig::default(), &records).unwrap();

        let mut live = LearningSession::new(SessionConfig::default()).unwrap();
        for r in &records {
            live.submit(&Question::new(r.question_id, r.difficulty), r.correct);
        }

        assert_eq!(replayed.answered_ids(), vec![1, 2]);
        assert_eq!(replayed.estimate(), live.estimate());
        assert_eq!(replayed.state().answered_count(), 3);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_answered() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        s.submit(&Question::new(11, 0.4), true);
        s.submit(&Question::new(12, 0.6), false);

        let restored =
            LearningSession::from_snapshot(SessionConfig::default(), &s.snapshot()).unwrap();
        assert_eq!(restored.answered_ids(), vec![11, 12]);
        assert!((restored.estimate() - s.estimate()).abs() < 1e-12);
    }

    #[test]
    fn test_resume_after_recycle_matches_live() {
        let pool = bank();
        let mut live = session(SelectionMode::Linear, ExhaustionPolicy::Recycle);
        for _ in 0..4 {
            let q = live.next_question(&pool).unwrap().clone();
            live.submit(&q, true);
        }
        assert_eq!(live.answered_ids(), vec![1]);

        let config = live.config().clone();
        let json = live.snapshot().to_json().unwrap();
        let snapshot = BeliefSnapshot::from_json(&json).unwrap();
        let mut resumed = LearningSession::from_snapshot(config, &snapshot).unwrap();

        assert_eq!(resumed.answered_ids(), live.answered_ids());
        let expected = live.next_question(&pool).map(|q| q.id);
        assert_eq!(resumed.next_question(&pool).map(|q| q.id), expected);
        assert_eq!(expected, Some(2));
    }

    #[test]
    fn test_from_snapshot_without_answered_uses_history() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        s.submit(&Question::new(5, 0.4), true);
        let snapshot = s.state().snapshot();
        assert!(snapshot.answered.is_none());

        let restored = LearningSession::from_snapshot(SessionConfig::default(), &snapshot).unwrap();
        assert_eq!(restored.answered_ids(), vec![5]);
    }

    #[test]
    fn test_from_snapshot_rejects_bad_length() {
        let snapshot = BeliefSnapshot {
            version: crate::types::SNAPSHOT_VERSION.to_string(),
            belief: vec![1.0 / (GRID_SIZE - 1) as f64; GRID_SIZE - 1],
            history: Vec::new(),
            answered: None,
        };
        assert!(LearningSession::from_snapshot(SessionConfig::default(), &snapshot).is_err());
    }

    #[test]
    fn test_reset() {
        let mut s = session(SelectionMode::Adaptive, ExhaustionPolicy::Finish);
        s.submit(&Question::new(1, 0.5), true);
        s.reset();
        assert!(s.answered_ids().is_empty());
        assert_eq!(s.state(), &BeliefState::initial());
        assert!(!s.is_converged());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SessionConfig {
            convergence_threshold: -1.0,
            ..SessionConfig::default()
        };
        assert!(LearningSession::new(config).is_err());
    }
}
