//! Simulation output files
//!
//! A batch can be written to a directory as three JSON files:
//! per-student results, per-step trajectories and the summary report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{SimulationReport, StudentResult};
use crate::config::SelectionMode;
use crate::error::Result;

pub const RESULTS_FILE: &str = "simulation_results.json";
pub const TRAJECTORIES_FILE: &str = "ability_trajectories.json";
pub const SUMMARY_FILE: &str = "summary_statistics.json";

/// One student's outcome without the trajectory
#[derive(Clone, Debug, Serialize)]
pub struct ResultRow<'a> {
    pub student_id: &'a str,
    pub true_ability: f64,
    pub mode: SelectionMode,
    pub convergence_step: usize,
    pub final_estimated: f64,
    pub final_error: f64,
    pub total_questions: usize,
    pub converged: bool,
}

/// One trajectory step, tagged with its student
#[derive(Clone, Debug, Serialize)]
pub struct TrajectoryRow<'a> {
    pub student_id: &'a str,
    pub true_ability: f64,
    pub mode: SelectionMode,
    pub step: usize,
    pub estimated_ability: f64,
    pub entropy: f64,
    pub question_id: Option<u64>,
}

/// Paths written by [`write_outputs`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFiles {
    pub results: PathBuf,
    pub trajectories: PathBuf,
    pub summary: PathBuf,
}

pub fn result_rows(results: &[StudentResult]) -> Vec<ResultRow<'_>> {
    results
        .iter()
        .map(|r| ResultRow {
            student_id: &r.student_id,
            true_ability: r.true_ability,
            mode: r.mode,
            convergence_step: r.convergence_step,
            final_estimated: r.final_estimated,
            final_error: r.final_error,
            total_questions: r.total_questions,
            converged: r.converged,
        })
        .collect()
}

/// Flatten every student's trajectory, in result order
pub fn trajectory_rows(results: &[StudentResult]) -> Vec<TrajectoryRow<'_>> {
    results
        .iter()
        .flat_map(|r| {
            r.trajectory.iter().map(move |point| TrajectoryRow {
                student_id: &r.student_id,
                true_ability: r.true_ability,
                mode: r.mode,
                step: point.step,
                estimated_ability: point.estimated_ability,
                entropy: point.entropy,
                question_id: point.question_id,
            })
        })
        .collect()
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write results, trajectories and summary into `dir`, creating it if needed
pub fn write_outputs(
    dir: &Path,
    results: &[StudentResult],
    report: &SimulationReport,
) -> Result<OutputFiles> {
    std::fs::create_dir_all(dir)?;
    let files = OutputFiles {
        results: dir.join(RESULTS_FILE),
        trajectories: dir.join(TRAJECTORIES_FILE),
        summary: dir.join(SUMMARY_FILE),
    };

    let trajectories = trajectory_rows(results);
    write_json(&files.results, &result_rows(results))?;
    write_json(&files.trajectories, &trajectories)?;
    write_json(&files.summary, report)?;

    tracing::info!(
        dir = %dir.display(),
        results = results.len(),
        trajectory_points = trajectories.len(),
        "simulation output written"
    );
    Ok(files)
}
