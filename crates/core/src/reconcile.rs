//! Carries manually curated correct-answer indices across re-imports.
//!
//! Questions are matched by content, not position: the join key is the
//! whitespace-collapsed question text plus the whitespace-collapsed answer
//! tuple, in option order. `question_number` and `id` both shift between
//! catalog revisions; the text does not. A stored index is only copied when
//! it is still in range for the freshly parsed answer list -- anything else
//! is counted as a discrepancy and reported, never applied.

use std::collections::HashMap;

use crate::model::{Answer, Dataset, Question};

/// Content-based identity of a question for reconciliation purposes.
pub type Signature = (String, Vec<String>);

/// Counters summarizing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Indices copied onto matching questions.
    pub carried: usize,
    /// Stored indices that no longer fit the current answer list.
    pub out_of_range: usize,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the content signature, or `None` when the question cannot be
/// matched reliably: empty question text, no answers, or an answer that is
/// empty after normalization.
pub fn signature(question_text: &str, answers: &[Answer]) -> Option<Signature> {
    let text = collapse_whitespace(question_text);
    if text.is_empty() || answers.is_empty() {
        return None;
    }

    let mut normalized = Vec::with_capacity(answers.len());
    for answer in answers {
        let a = collapse_whitespace(&answer.text);
        if a.is_empty() {
            return None;
        }
        normalized.push(a);
    }

    Some((text, normalized))
}

/// Copy stored correct-answer indices from `prior` onto `questions` where
/// the content signature still matches.
pub fn carry_forward(questions: &mut [Question], prior: &Dataset) -> ReconcileStats {
    let mut lookup: HashMap<Signature, usize> = HashMap::new();
    for entry in &prior.questions {
        let Some(index) = entry.correct_answer_index else {
            continue;
        };
        if let Some(sig) = signature(&entry.question, &entry.answers) {
            lookup.insert(sig, index);
        }
    }

    let mut stats = ReconcileStats::default();
    if lookup.is_empty() {
        return stats;
    }

    for question in questions.iter_mut() {
        let Some(sig) = signature(&question.question, &question.answers) else {
            continue;
        };
        let Some(&index) = lookup.get(&sig) else {
            continue;
        };
        if index < question.answers.len() {
            question.correct_answer_index = Some(index);
            stats.carried += 1;
        } else {
            stats.out_of_range += 1;
        }
    }

    stats
}
