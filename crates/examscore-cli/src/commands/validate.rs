//! The `examscore validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use examscore_core::loader::{load_answer_grid, validate_grid, LoadOptions};

pub fn execute(input: PathBuf, respondent_column: bool) -> Result<()> {
    let grid = load_answer_grid(&input, LoadOptions { respondent_column })
        .with_context(|| format!("failed to load answer sheet {}", input.display()))?;

    println!(
        "Answer sheet: {} ({} questions, {} respondents)",
        grid.source(),
        grid.columns().len(),
        grid.respondent_count()
    );

    let warnings = validate_grid(&grid);
    for w in &warnings {
        let prefix = w
            .question_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Answer sheet valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
