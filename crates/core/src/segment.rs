//! The question segmenter: a forgiving state machine over normalized lines.
//!
//! Classification rules are evaluated per line in a fixed order, first match
//! wins (see the body of [`segment`]). Anything that does not open, extend,
//! or close a question is boilerplate and is dropped. The segmenter trusts
//! the page-then-top-then-left ordering of its input.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::markers;
use crate::model::{Answer, Line, PageBounds, Question, Section};
use crate::repair::{repair_answers, RepairOutcome};

/// Where an open question currently accepts lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    CollectingQuestion,
    CollectingAnswers,
}

/// A question under assembly. Owned exclusively by the segmenter; finalized
/// into an immutable [`Question`] when the next header arrives or input ends.
#[derive(Debug)]
struct OpenQuestion {
    display_number: String,
    question_number: Option<u32>,
    section: Section,
    question_lines: Vec<String>,
    answers: Vec<Answer>,
    bounds: BTreeMap<u32, PageBounds>,
    pages: BTreeSet<u32>,
    state: SegmentState,
}

impl OpenQuestion {
    fn open(header: &Line, section: Section) -> Self {
        let text = header.text.trim();
        let mut question = Self {
            display_number: text.to_string(),
            question_number: markers::parse_question_number(text),
            section,
            question_lines: Vec::new(),
            answers: Vec::new(),
            bounds: BTreeMap::new(),
            pages: BTreeSet::new(),
            state: SegmentState::CollectingQuestion,
        };
        question.touch(header);
        question
    }

    /// Record that `line` contributed to this question: expand the per-page
    /// extent and the page set.
    fn touch(&mut self, line: &Line) {
        self.bounds
            .entry(line.page)
            .and_modify(|b| b.expand(&line.bbox))
            .or_insert_with(|| PageBounds::from_bbox(&line.bbox));
        self.pages.insert(line.page);
    }

    fn question_text(&self) -> String {
        self.question_lines.join(" ").trim().to_string()
    }

    /// Close the question: join and clean the body, drop empty answers,
    /// apply answer repair, and assign the emission-order id.
    fn finalize(self, id: usize) -> (Question, RepairOutcome) {
        let mut text = self.question_text();
        text = strip_leading_enumerator(&text);

        let mut answers: Vec<Answer> = self
            .answers
            .into_iter()
            .map(|a| Answer::new(a.text.trim()))
            .filter(|a| !a.text.is_empty())
            .collect();
        let repair = repair_answers(&mut answers);

        let question = Question {
            id,
            display_number: self.display_number,
            question_number: self.question_number,
            section: self.section,
            question: text,
            answers,
            pages: self.pages.into_iter().collect(),
            images: Vec::new(),
            correct_answer_index: None,
            bounds: self.bounds,
            claimed_images: Vec::new(),
        };
        (question, repair)
    }
}

/// A question where answer repair matched (possibly ambiguously).
#[derive(Debug, Clone)]
pub struct RepairFlag {
    pub question_id: usize,
    pub display_number: String,
    pub applied: &'static str,
    pub also_applicable: Vec<&'static str>,
}

impl RepairFlag {
    pub fn is_ambiguous(&self) -> bool {
        !self.also_applicable.is_empty()
    }
}

/// Result of one segmentation pass.
#[derive(Debug)]
pub struct SegmentOutcome {
    pub questions: Vec<Question>,
    pub repairs: Vec<RepairFlag>,
    /// Section context after the last line, for callers that feed documents
    /// in chunks.
    pub section: Section,
}

/// The header already carries the number; an inline "12." prefix on the body
/// is duplicate enumeration noise.
fn strip_leading_enumerator(text: &str) -> String {
    let re = Regex::new(r"^\d+\.\s*").unwrap();
    re.replace(text, "").into_owned()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn ends_sentence_like(text: &str) -> bool {
    let t = text.trim_end();
    markers::ends_with_ellipsis(t) || t.ends_with('?') || t.ends_with('.')
}

/// Assemble question records from the normalized, merged line sequence.
///
/// Pure in `(lines, initial_section)`: the running section context enters as
/// a parameter and leaves in the outcome instead of living in ambient state.
pub fn segment(lines: &[Line], initial_section: Section) -> SegmentOutcome {
    let mut section = initial_section;
    let mut open: Option<OpenQuestion> = None;
    let mut questions: Vec<Question> = Vec::new();
    let mut repairs: Vec<RepairFlag> = Vec::new();

    let mut finalize_into =
        |open: OpenQuestion, questions: &mut Vec<Question>, repairs: &mut Vec<RepairFlag>| {
            let (question, repair) = open.finalize(questions.len() + 1);
            if let Some(applied) = repair.applied {
                repairs.push(RepairFlag {
                    question_id: question.id,
                    display_number: question.display_number.clone(),
                    applied,
                    also_applicable: repair.also_applicable,
                });
            }
            questions.push(question);
        };

    for (index, line) in lines.iter().enumerate() {
        let text = line.text.trim();

        // 1. Page labels, even when a stray bullet precedes them.
        let unbulleted = markers::strip_bullet(text).unwrap_or(text);
        if markers::is_page_label(unbulleted) {
            continue;
        }

        // 2. Copyright footers.
        if markers::is_copyright(text) {
            continue;
        }

        // 3./4. Section markers update the running context only.
        if markers::is_part_marker(text) {
            section.part = Some(text.to_string());
            continue;
        }
        if markers::is_topic_marker(text) {
            section.topic = Some(text.to_string());
            continue;
        }

        // 5. Document-meta boilerplate.
        if markers::is_meta_marker(text) {
            continue;
        }

        // 6. Question headers close the open question and start the next.
        if markers::is_question_header(text) {
            if let Some(finished) = open.take() {
                finalize_into(finished, &mut questions, &mut repairs);
            }
            open = Some(OpenQuestion::open(line, section.clone()));
            continue;
        }

        // 7. Pre-amble noise before the first header.
        let Some(question) = open.as_mut() else {
            continue;
        };

        // 8. Bullet-prefixed lines start a new answer option.
        if let Some(option_text) = markers::strip_bullet(text) {
            question.answers.push(Answer::new(option_text));
            question.state = SegmentState::CollectingAnswers;
            question.touch(line);
            continue;
        }

        // 9. Non-bullet lines inside the answer list continue the last option.
        if question.state == SegmentState::CollectingAnswers && !question.answers.is_empty() {
            let last = question.answers.last_mut().unwrap();
            last.text = format!("{} {}", last.text, text);
            question.touch(line);
            continue;
        }

        // 10. Inline-image captions inside the prompt are dropped.
        if markers::is_image_label(text) {
            continue;
        }

        // 11a. An ellipsis prompt followed by a terminated phrase: the phrase
        // is the first answer, its bullet was lost.
        if markers::ends_with_ellipsis(&question.question_text()) && text.ends_with('.') {
            question.answers.push(Answer::new(text));
            question.state = SegmentState::CollectingAnswers;
            question.touch(line);
            continue;
        }

        // 11b. A short unterminated line directly before a bullet option is
        // an answer that slipped ahead of its own bullet.
        let next_is_bullet = lines
            .get(index + 1)
            .is_some_and(|next| markers::strip_bullet(next.text.trim()).is_some());
        if word_count(text) <= 3 && !ends_sentence_like(text) && next_is_bullet {
            question.answers.push(Answer::new(text));
            question.state = SegmentState::CollectingAnswers;
            question.touch(line);
            continue;
        }

        // 12. Everything else is prompt text.
        question.question_lines.push(text.to_string());
        question.touch(line);
    }

    if let Some(finished) = open {
        finalize_into(finished, &mut questions, &mut repairs);
    }

    SegmentOutcome {
        questions,
        repairs,
        section,
    }
}
