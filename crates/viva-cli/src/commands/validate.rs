//! `viva validate` — check an interview definition for common issues.

use std::path::PathBuf;

use anyhow::Result;

use viva_core::parser::{parse_interview, validate_interview};

pub fn execute(path: PathBuf) -> Result<()> {
    let interview = parse_interview(&path)?;
    let warnings = validate_interview(&interview);

    println!(
        "{}: {} questions in pool, {} asked per attempt, {} dimensions",
        interview.title,
        interview.settings.question_pool.len(),
        interview.question_limit(),
        interview.settings.competency_dimensions.len()
    );

    if warnings.is_empty() {
        println!("Interview definition valid");
    } else {
        for warning in &warnings {
            println!("warning: {}", warning.message);
        }
        println!("{} warning(s)", warnings.len());
    }

    Ok(())
}
