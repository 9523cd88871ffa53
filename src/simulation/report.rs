//! Simulation Summary Statistics
//!
//! Aggregates student results per (ability, mode) group and per mode, and
//! compares adaptive against linear selection:
//!
//! - improvement = (linear_mean - adaptive_mean) / linear_mean × 100
//! - Cohen's d = (mean_a - mean_l) / pooled_sd, with
//!   pooled_sd = sqrt(((n_a - 1) s_a² + (n_l - 1) s_l²) / (n_a + n_l - 2))

use serde::{Deserialize, Serialize};

use super::StudentResult;
use crate::config::SelectionMode;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupSummary {
    pub ability: f64,
    pub mode: SelectionMode,
    pub mean_steps: f64,
    pub std_steps: f64,
    pub median_steps: f64,
    pub convergence_rate: f64,
    pub mean_error: f64,
    pub std_error: f64,
    pub sample_size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModeSummary {
    pub mode: SelectionMode,
    pub mean_steps: f64,
    pub std_steps: f64,
    pub median_steps: f64,
    pub convergence_rate: f64,
    pub mean_error: f64,
    pub sample_size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationReport {
    pub total_experiments: usize,
    pub converged_experiments: usize,
    pub groups: Vec<GroupSummary>,
    pub modes: Vec<ModeSummary>,
    /// Percentage fewer steps adaptive needs compared to linear
    pub improvement_pct: Option<f64>,
    /// Effect size of adaptive vs linear convergence steps
    pub cohens_d: Option<f64>,
}

impl SimulationReport {
    /// Summarize results. Groups follow the order in which abilities and
    /// modes first appear in `results`.
    pub fn from_results(results: &[StudentResult]) -> Self {
        let mut abilities: Vec<f64> = Vec::new();
        let mut modes: Vec<SelectionMode> = Vec::new();
        for r in results {
            if !abilities.iter().any(|&a| a == r.true_ability) {
                abilities.push(r.true_ability);
            }
            if !modes.contains(&r.mode) {
                modes.push(r.mode);
            }
        }

        let mut groups = Vec::new();
        for &ability in &abilities {
            for &mode in &modes {
                let subset: Vec<&StudentResult> = results
                    .iter()
                    .filter(|r| r.true_ability == ability && r.mode == mode)
                    .collect();
                if subset.is_empty() {
                    continue;
                }
                let steps = steps_of(&subset);
                let errors: Vec<f64> = subset.iter().map(|r| r.final_error).collect();
                groups.push(GroupSummary {
                    ability,
                    mode,
                    mean_steps: mean(&steps),
                    std_steps: sample_std(&steps),
                    median_steps: median(&steps),
                    convergence_rate: convergence_rate(&subset),
                    mean_error: mean(&errors),
                    std_error: sample_std(&errors),
                    sample_size: subset.len(),
                });
            }
        }

        let mode_summaries: Vec<ModeSummary> = modes
            .iter()
            .map(|&mode| {
                let subset: Vec<&StudentResult> =
                    results.iter().filter(|r| r.mode == mode).collect();
                let steps = steps_of(&subset);
                let errors: Vec<f64> = subset.iter().map(|r| r.final_error).collect();
                ModeSummary {
                    mode,
                    mean_steps: mean(&steps),
                    std_steps: sample_std(&steps),
                    median_steps: median(&steps),
                    convergence_rate: convergence_rate(&subset),
                    mean_error: mean(&errors),
                    sample_size: subset.len(),
                }
            })
            .collect();

        let steps_for = |mode: SelectionMode| -> Vec<f64> {
            results
                .iter()
                .filter(|r| r.mode == mode)
                .map(|r| r.convergence_step as f64)
                .collect()
        };
        let adaptive = steps_for(SelectionMode::Adaptive);
        let linear = steps_for(SelectionMode::Linear);

        let improvement_pct = if adaptive.is_empty() || linear.is_empty() {
            None
        } else {
            let linear_mean = mean(&linear);
            if linear_mean > 0.0 {
                Some((linear_mean - mean(&adaptive)) / linear_mean * 100.0)
            } else {
                None
            }
        };

        Self {
            total_experiments: results.len(),
            converged_experiments: results.iter().filter(|r| r.converged).count(),
            groups,
            modes: mode_summaries,
            improvement_pct,
            cohens_d: cohens_d(&adaptive, &linear),
        }
    }
}

fn steps_of(subset: &[&StudentResult]) -> Vec<f64> {
    subset.iter().map(|r| r.convergence_step as f64).collect()
}

fn convergence_rate(subset: &[&StudentResult]) -> f64 {
    if subset.is_empty() {
        return 0.0;
    }
    subset.iter().filter(|r| r.converged).count() as f64 / subset.len() as f64
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1); 0 for fewer than two values
pub fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Cohen's d with pooled sample variance; `None` when undefined
pub fn cohens_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return None;
    }
    let v1 = sample_std(a).powi(2);
    let v2 = sample_std(b).powi(2);
    let pooled = (((n1 - 1) as f64 * v1 + (n2 - 1) as f64 * v2) / (n1 + n2 - 2) as f64).sqrt();
    if pooled <= 0.0 {
        return None;
    }
    Some((mean(a) - mean(b)) / pooled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ability: f64, mode: SelectionMode, steps: usize, converged: bool) -> StudentResult {
        StudentResult {
            student_id: format!("{}_{}", ability, steps),
            true_ability: ability,
            mode,
            convergence_step: steps,
            final_estimated: ability,
            final_error: 0.01 * steps as f64,
            total_questions: steps,
            converged,
            trajectory: Vec::new(),
        }
    }

    #[test]
    fn test_stats_helpers() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(sample_std(&[5.0]), 0.0);
        assert!((sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138).abs() < 1e-3);
    }

    #[test]
    fn test_cohens_d() {
        let d = cohens_d(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert!((d + 3.0).abs() < 1e-12, "d = {}", d);
        assert!(cohens_d(&[1.0], &[2.0, 3.0]).is_none());
        assert!(cohens_d(&[1.0, 1.0], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_report_groups_and_improvement() {
        let results = vec![
            result(0.3, SelectionMode::Adaptive, 4, true),
            result(0.3, SelectionMode::Linear, 10, false),
            result(0.3, SelectionMode::Adaptive, 6, true),
            result(0.3, SelectionMode::Linear, 8, true),
            result(0.7, SelectionMode::Adaptive, 5, true),
            result(0.7, SelectionMode::Linear, 12, true),
        ];
        let report = SimulationReport::from_results(&results);

        assert_eq!(report.total_experiments, 6);
        assert_eq!(report.converged_experiments, 5);
        assert_eq!(report.groups.len(), 4);

        let first = &report.groups[0];
        assert_eq!(first.ability, 0.3);
        assert_eq!(first.mode, SelectionMode::Adaptive);
        assert_eq!(first.mean_steps, 5.0);
        assert_eq!(first.sample_size, 2);

        let linear = report.modes.iter().find(|m| m.mode == SelectionMode::Linear).unwrap();
        assert_eq!(linear.mean_steps, 10.0);
        assert!((linear.convergence_rate - 2.0 / 3.0).abs() < 1e-12);

        // adaptive mean 5, linear mean 10
        assert!((report.improvement_pct.unwrap() - 50.0).abs() < 1e-12);
        assert!(report.cohens_d.unwrap() < 0.0);
    }

    #[test]
    fn test_report_single_mode_has_no_comparison() {
        let results = vec![result(0.5, SelectionMode::Adaptive, 3, true)];
        let report = SimulationReport::from_results(&results);
        assert!(report.improvement_pct.is_none());
        assert!(report.cohens_d.is_none());
    }
}
