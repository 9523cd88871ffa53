//! Question bank helpers for simulation runs

use std::path::Path;

use crate::error::{AbilityError, Result};
use crate::sanitize::sanitize_question;
use crate::types::Question;

/// `count` questions with ids 1..=count and difficulties evenly spread over
/// the open unit interval
pub fn evenly_spaced(count: usize) -> Vec<Question> {
    (1..=count)
        .map(|i| Question::new(i as u64, i as f64 / (count + 1) as f64))
        .collect()
}

/// Load a JSON array of questions, clamping difficulties
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let raw = std::fs::read_to_string(path)?;
    let questions: Vec<Question> = serde_json::from_str(&raw)?;
    if questions.is_empty() {
        return Err(AbilityError::Config(format!(
            "question file {} contains no questions",
            path.display()
        )));
    }
    Ok(questions.iter().map(sanitize_question).collect())
}
