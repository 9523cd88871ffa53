use serde::{Deserialize, Serialize};

use crate::error::{AbilityError, Result};
use crate::irt::IrtParams;

/// How the next question is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Maximum expected information gain
    Adaptive,
    /// Lowest unanswered id first (control group)
    Linear,
}

impl SelectionMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "adaptive" => Some(SelectionMode::Adaptive),
            "linear" => Some(SelectionMode::Linear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Adaptive => "adaptive",
            SelectionMode::Linear => "linear",
        }
    }

    /// Capitalized name used in simulated student ids
    pub fn label(&self) -> &'static str {
        match self {
            SelectionMode::Adaptive => "Adaptive",
            SelectionMode::Linear => "Linear",
        }
    }
}

/// What to do once every question in the pool has been answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    Finish,
    Recycle,
}

impl ExhaustionPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "finish" => Some(ExhaustionPolicy::Finish),
            "recycle" => Some(ExhaustionPolicy::Recycle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub irt: IrtParams,
    pub mode: SelectionMode,
    pub exhaustion: ExhaustionPolicy,
    /// Estimate change below which an answer counts as stable
    pub convergence_threshold: f64,
    /// Consecutive stable answers required to report convergence
    pub stability_window: usize,
    /// Entropy in nats (natural log) above which hints are free
    pub hint_entropy_threshold: f64,
    pub hint_cost: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            irt: IrtParams::default(),
            mode: SelectionMode::Adaptive,
            exhaustion: ExhaustionPolicy::Finish,
            convergence_threshold: 0.05,
            stability_window: 3,
            hint_entropy_threshold: 2.5,
            hint_cost: 0.5,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            irt: defaults.irt,
            mode: env_var("ABILITY_SELECTION_MODE")
                .and_then(|v| SelectionMode::from_str(&v))
                .unwrap_or(defaults.mode),
            exhaustion: env_var("ABILITY_EXHAUSTION_POLICY")
                .and_then(|v| ExhaustionPolicy::from_str(&v))
                .unwrap_or(defaults.exhaustion),
            convergence_threshold: env_parse("ABILITY_CONVERGENCE_THRESHOLD")
                .unwrap_or(defaults.convergence_threshold),
            stability_window: env_parse("ABILITY_STABILITY_WINDOW")
                .unwrap_or(defaults.stability_window),
            hint_entropy_threshold: env_parse("ABILITY_HINT_ENTROPY_THRESHOLD")
                .unwrap_or(defaults.hint_entropy_threshold),
            hint_cost: env_parse("ABILITY_HINT_COST").unwrap_or(defaults.hint_cost),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.irt.validate()?;
        if !(self.convergence_threshold > 0.0) {
            return Err(AbilityError::Config(format!(
                "convergence_threshold must be positive, got {}",
                self.convergence_threshold
            )));
        }
        if self.stability_window == 0 {
            return Err(AbilityError::Config("stability_window must be at least 1".into()));
        }
        if !self.hint_entropy_threshold.is_finite() || self.hint_entropy_threshold < 0.0 {
            return Err(AbilityError::Config(format!(
                "hint_entropy_threshold must be non-negative, got {}",
                self.hint_entropy_threshold
            )));
        }
        if !self.hint_cost.is_finite() || self.hint_cost < 0.0 {
            return Err(AbilityError::Config(format!(
                "hint_cost must be non-negative, got {}",
                self.hint_cost
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub irt: IrtParams,
    pub ability_values: Vec<f64>,
    pub students_per_ability: usize,
    pub modes: Vec<SelectionMode>,
    /// |estimate - true ability| below which a student counts as converged
    pub convergence_threshold: f64,
    pub max_questions: usize,
    pub random_seed: u64,
    pub stability_window: usize,
    pub use_stability_check: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            irt: IrtParams::default(),
            ability_values: vec![0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9],
            students_per_ability: 10,
            modes: vec![SelectionMode::Adaptive, SelectionMode::Linear],
            convergence_threshold: 0.05,
            max_questions: 50,
            random_seed: 42,
            stability_window: 3,
            use_stability_check: false,
        }
    }
}

impl SimulationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            irt: defaults.irt,
            ability_values: env_var("ABILITY_SIM_ABILITIES")
                .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
                .filter(|v: &Vec<f64>| !v.is_empty())
                .unwrap_or(defaults.ability_values),
            students_per_ability: env_parse("ABILITY_SIM_STUDENTS")
                .unwrap_or(defaults.students_per_ability),
            modes: env_var("ABILITY_SIM_MODES")
                .map(|v| v.split(',').filter_map(|s| SelectionMode::from_str(s.trim())).collect())
                .filter(|v: &Vec<SelectionMode>| !v.is_empty())
                .unwrap_or(defaults.modes),
            convergence_threshold: env_parse("ABILITY_SIM_THRESHOLD")
                .unwrap_or(defaults.convergence_threshold),
            max_questions: env_parse("ABILITY_SIM_MAX_QUESTIONS").unwrap_or(defaults.max_questions),
            random_seed: env_parse("ABILITY_SIM_SEED").unwrap_or(defaults.random_seed),
            stability_window: env_parse("ABILITY_SIM_STABILITY_WINDOW")
                .unwrap_or(defaults.stability_window),
            use_stability_check: env_var("ABILITY_SIM_STABILITY_CHECK")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.use_stability_check),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.irt.validate()?;
        if self.ability_values.is_empty() {
            return Err(AbilityError::Config("ability_values must not be empty".into()));
        }
        if let Some(bad) = self.ability_values.iter().find(|a| !(**a > 0.0 && **a < 1.0)) {
            return Err(AbilityError::Config(format!(
                "ability values must be in (0, 1), got {}",
                bad
            )));
        }
        if self.modes.is_empty() {
            return Err(AbilityError::Config("modes must not be empty".into()));
        }
        if self.students_per_ability == 0 || self.max_questions == 0 {
            return Err(AbilityError::Config(
                "students_per_ability and max_questions must be at least 1".into(),
            ));
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(AbilityError::Config(format!(
                "convergence_threshold must be positive, got {}",
                self.convergence_threshold
            )));
        }
        if self.use_stability_check && self.stability_window == 0 {
            return Err(AbilityError::Config("stability_window must be at least 1".into()));
        }
        Ok(())
    }

    /// Total number of simulated students across abilities and modes
    pub fn total_experiments(&self) -> usize {
        self.ability_values.len() * self.students_per_ability * self.modes.len()
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|value| value.trim().parse::<T>().ok())
}
