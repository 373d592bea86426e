//! Post-finalization answer repairs.
//!
//! Line wrapping in the source occasionally merges two short answers onto
//! one extracted line or splits one answer across two. Each repair is a
//! narrow shape match: it fires only when the answer list looks exactly like
//! one known breakage, otherwise the answers are left as parsed. The rules
//! form an ordered table with first-applicable-wins semantics; when more
//! than one rule would have applied the question is flagged for manual
//! review instead of silently trusting the priority order.
//!
//! Several predicates encode German surface conventions (noun
//! capitalization, article lists). They are data next to the table, not
//! logic, so a future catalog revision swaps the word lists.

use crate::model::Answer;

/// Articles accepted by the "article noun article noun" and
/// "article + noun" shapes.
const ARTICLES: [&str; 12] = [
    "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer", "eines",
];

/// One named repair: a shape predicate and the transform to apply when the
/// shape matches.
pub struct RepairRule {
    pub name: &'static str,
    applies: fn(&[Answer]) -> bool,
    apply: fn(&mut Vec<Answer>),
}

/// What [`repair_answers`] did: which rule fired (if any) and which other
/// rules would also have fired on the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    pub applied: Option<&'static str>,
    pub also_applicable: Vec<&'static str>,
}

impl RepairOutcome {
    /// More than one rule matched the same answer list.
    pub fn is_ambiguous(&self) -> bool {
        !self.also_applicable.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

static RULES: &[RepairRule] = &[
    RepairRule {
        name: "digit-pair-split",
        applies: digit_pair_applies,
        apply: digit_pair_apply,
    },
    RepairRule {
        name: "sentence-pair-split",
        applies: sentence_pair_applies,
        apply: sentence_pair_apply,
    },
    RepairRule {
        name: "capitalized-pair-split",
        applies: capitalized_pair_applies,
        apply: word_pair_apply,
    },
    RepairRule {
        name: "hyphen-pair-split",
        applies: hyphen_pair_applies,
        apply: word_pair_apply,
    },
    RepairRule {
        name: "case-pair-split",
        applies: case_pair_applies,
        apply: word_pair_apply,
    },
    RepairRule {
        name: "article-pair-split",
        applies: article_pair_applies,
        apply: article_pair_apply,
    },
    RepairRule {
        name: "trailing-fragment-merge",
        applies: trailing_fragment_applies,
        apply: trailing_fragment_apply,
    },
];

/// Apply the first matching repair rule in table order.
///
/// Answers with empty text have already been dropped by finalization; the
/// rules assume non-empty texts. When no shape matches the list is left
/// untouched -- heuristics are best-effort by design.
pub fn repair_answers(answers: &mut Vec<Answer>) -> RepairOutcome {
    let mut matching = RULES.iter().filter(|rule| (rule.applies)(answers));

    let Some(first) = matching.next() else {
        return RepairOutcome::default();
    };
    let also_applicable: Vec<&'static str> = matching.map(|rule| rule.name).collect();

    (first.apply)(answers);

    RepairOutcome {
        applied: Some(first.name),
        also_applicable,
    }
}

// ---------------------------------------------------------------------------
// Word-shape helpers
// ---------------------------------------------------------------------------

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn is_lowercase_initial(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_lowercase)
}

fn is_article(word: &str) -> bool {
    ARTICLES.iter().any(|a| a.eq_ignore_ascii_case(word))
}

fn is_numeric(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit())
}

fn is_hyphenated(word: &str) -> bool {
    word.contains('-')
}

fn two_hyphenated_words(text: &str) -> bool {
    let w = words(text);
    w.len() == 2 && w.iter().all(|word| is_hyphenated(word))
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// `["3 4"]` -- two single-digit answers extracted as one line.
fn digit_pair_applies(answers: &[Answer]) -> bool {
    if answers.len() != 1 {
        return false;
    }
    let chars: Vec<char> = answers[0].text.chars().collect();
    matches!(chars.as_slice(), [a, ' ', b] if a.is_ascii_digit() && b.is_ascii_digit())
}

fn digit_pair_apply(answers: &mut Vec<Answer>) {
    let chars: Vec<char> = answers[0].text.chars().collect();
    answers[0] = Answer::new(chars[0].to_string());
    answers.push(Answer::new(chars[2].to_string()));
}

/// Three answers where the last holds two sentence-terminated phrases
/// joined by ". ".
fn sentence_pair_applies(answers: &[Answer]) -> bool {
    answers.len() == 3
        && answers[2]
            .text
            .split_once(". ")
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
}

fn sentence_pair_apply(answers: &mut Vec<Answer>) {
    let (head, tail) = answers[2].text.split_once(". ").map(|(h, t)| (h.to_string(), t.to_string())).unwrap_or_default();
    answers[2] = Answer::new(format!("{}.", head));
    answers.push(Answer::new(tail));
}

/// Three answers where the last is exactly two capitalized words.
fn capitalized_pair_applies(answers: &[Answer]) -> bool {
    if answers.len() != 3 {
        return false;
    }
    let w = words(&answers[2].text);
    w.len() == 2 && w.iter().all(|word| is_capitalized(word))
}

/// Three answers where the last is two hyphenated tokens.
fn hyphen_pair_applies(answers: &[Answer]) -> bool {
    answers.len() == 3 && two_hyphenated_words(&answers[2].text)
}

/// Three answers where the last is a capitalized word followed by a
/// lowercase-initial word.
fn case_pair_applies(answers: &[Answer]) -> bool {
    if answers.len() != 3 {
        return false;
    }
    let w = words(&answers[2].text);
    w.len() == 2 && is_capitalized(w[0]) && is_lowercase_initial(w[1])
}

/// Shared transform: split the last answer into its two words.
fn word_pair_apply(answers: &mut Vec<Answer>) {
    let w: Vec<String> = words(&answers[2].text).iter().map(|s| s.to_string()).collect();
    answers[2] = Answer::new(w[0].clone());
    answers.push(Answer::new(w[1].clone()));
}

/// Three answers where the last is exactly four words in an
/// "article noun article noun" repetition.
fn article_pair_applies(answers: &[Answer]) -> bool {
    if answers.len() != 3 {
        return false;
    }
    let w = words(&answers[2].text);
    w.len() == 4 && is_article(w[0]) && !is_article(w[1]) && is_article(w[2]) && !is_article(w[3])
}

fn article_pair_apply(answers: &mut Vec<Answer>) {
    let w: Vec<String> = words(&answers[2].text).iter().map(|s| s.to_string()).collect();
    answers[2] = Answer::new(format!("{} {}", w[0], w[1]));
    answers.push(Answer::new(format!("{} {}", w[2], w[3])));
}

/// Four or more answers where the last is a short non-numeric tail that
/// reads as a continuation of the previous answer, wrapped onto its own
/// line by the extractor.
fn trailing_fragment_applies(answers: &[Answer]) -> bool {
    if answers.len() < 4 {
        return false;
    }
    let last = &answers[answers.len() - 1].text;
    let prev = &answers[answers.len() - 2].text;
    let w = words(last);

    if w.is_empty() || w.len() > 2 || w.iter().any(|word| is_numeric(word)) {
        return false;
    }

    match w.len() {
        1 => is_lowercase_initial(w[0]),
        _ => {
            // Shapes that make a plausible standalone option keep the tail.
            let article_noun = is_article(w[0]) && is_capitalized(w[1]);
            let adjective_noun = is_lowercase_initial(w[0]) && is_capitalized(w[1]);
            let hyphen_echo = w.iter().all(|word| is_hyphenated(word)) && two_hyphenated_words(prev);
            let both_terminated = last.ends_with('.') && prev.ends_with('.');
            !(article_noun || adjective_noun || hyphen_echo || both_terminated)
        }
    }
}

fn trailing_fragment_apply(answers: &mut Vec<Answer>) {
    let tail = answers.pop().map(|a| a.text).unwrap_or_default();
    if let Some(prev) = answers.last_mut() {
        prev.text = format!("{} {}", prev.text, tail);
    }
}
