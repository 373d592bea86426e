use std::fs;
use std::path::PathBuf;

use crate::prelude::{println, *};
use fragenimport_core::{Dataset, Question};

/// The catalog always offers exactly four answer options.
const EXPECTED_ANSWER_COUNT: usize = 4;

#[derive(Debug, clap::Args)]
pub struct ValidateOptions {
    /// Path to the question dataset
    #[clap(default_value = "data/questions.json")]
    pub dataset: PathBuf,
}

pub fn run(options: ValidateOptions, _global: crate::Global) -> Result<()> {
    let contents = fs::read_to_string(&options.dataset)
        .with_context(|| f!("cannot read {}", options.dataset.display()))?;
    let dataset: Dataset = serde_json::from_str(&contents)
        .map_err(|e| eyre!(Error::InvalidDataset(e.to_string())))?;

    let mut problems: Vec<(String, String)> = Vec::new();
    for question in &dataset.questions {
        check_question(question, &mut problems);
    }

    if problems.is_empty() {
        println!("{} questions, no problems found", dataset.questions.len());
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Question", "Problem"]);
    for (number, problem) in &problems {
        table.add_row(prettytable::row![number, problem]);
    }
    table.printstd();

    Err(eyre!(
        "{} problem(s) in {} question(s)",
        problems.len(),
        dataset.questions.len()
    ))
}

fn check_question(question: &Question, problems: &mut Vec<(String, String)>) {
    if question.answers.len() != EXPECTED_ANSWER_COUNT {
        problems.push((
            question.display_number.clone(),
            f!(
                "has {} answers, expected {}",
                question.answers.len(),
                EXPECTED_ANSWER_COUNT
            ),
        ));
    }

    for (idx, answer) in question.answers.iter().enumerate() {
        if answer.text.trim().is_empty() {
            problems.push((
                question.display_number.clone(),
                f!("answer {} is empty", idx + 1),
            ));
        }
    }

    if question.correct_answer_index.is_none() {
        problems.push((
            question.display_number.clone(),
            "no correct answer recorded".to_string(),
        ));
    }
}
