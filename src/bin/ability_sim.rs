use std::path::PathBuf;

use danci_ability::logging::{init_tracing, LogConfig};
use danci_ability::simulation::{evenly_spaced, load_questions, write_outputs};
use danci_ability::{Result, SimulationConfig, SimulationReport, SimulationRunner};

/// Synthetic bank size when no question file is given
const DEFAULT_BANK_SIZE: usize = 50;

fn main() {
    let _ = dotenvy::dotenv();
    let log_guard = init_tracing(&LogConfig::from_env());

    if let Err(err) = run() {
        tracing::error!(error = %err, "simulation failed");
        drop(log_guard);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = SimulationConfig::from_env();

    let pool = match std::env::var("ABILITY_SIM_QUESTIONS") {
        Ok(path) => {
            let path = PathBuf::from(path);
            let questions = load_questions(&path)?;
            tracing::info!(path = %path.display(), count = questions.len(), "loaded question bank");
            questions
        }
        Err(_) => evenly_spaced(DEFAULT_BANK_SIZE),
    };

    let runner = SimulationRunner::new(config, pool)?;
    let results = runner.run_batch()?;
    let report = SimulationReport::from_results(&results);

    for mode in &report.modes {
        tracing::info!(
            mode = mode.mode.as_str(),
            mean_steps = mode.mean_steps,
            convergence_rate = mode.convergence_rate,
            mean_error = mode.mean_error,
            "mode summary"
        );
    }
    if let Some(improvement) = report.improvement_pct {
        tracing::info!(
            improvement_pct = improvement,
            cohens_d = ?report.cohens_d,
            "adaptive vs linear"
        );
    }

    if let Ok(dir) = std::env::var("ABILITY_SIM_OUTPUT_DIR") {
        let files = write_outputs(&PathBuf::from(dir), &results, &report)?;
        tracing::info!(
            results = %files.results.display(),
            trajectories = %files.trajectories.display(),
            "per-student output saved"
        );
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
