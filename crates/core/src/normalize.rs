//! Line-level repairs applied before segmentation.
//!
//! The extractor hands us physical lines, which disagree with the logical
//! structure in two ways:
//!
//! 1. A bullet option and surrounding text were captured as *one* line
//!    ("question text \u{F0A3} option one \u{F0A3} option two"). Fixed by
//!    [`expand_inline_bullets`], a pure per-line split.
//! 2. A bullet glyph and its option text were captured as *separate*
//!    adjacent lines. Fixed by [`merge_naked_bullets`], a single left-to-right
//!    pass with one slot of lookahead and lookbehind.

use crate::markers::{is_bullet, is_image_label, is_naked_bullet, is_question_header};
use crate::model::Line;

/// Split a line at every bullet glyph that is not its very first character.
///
/// The text before the first interior bullet becomes a head segment (kept
/// only if non-blank); each bullet-delimited chunk becomes its own logical
/// line starting with that bullet. All segments inherit the source line's
/// bounding box and page. A line with no interior bullet passes through
/// unchanged.
pub fn expand_inline_bullets(line: &Line) -> Vec<Line> {
    let text = line.text.as_str();
    let splits: Vec<usize> = text
        .char_indices()
        .filter(|&(i, c)| i > 0 && is_bullet(c))
        .map(|(i, _)| i)
        .collect();

    if splits.is_empty() {
        return vec![line.clone()];
    }

    let mut segments: Vec<Line> = Vec::with_capacity(splits.len() + 1);

    let head = text[..splits[0]].trim();
    if !head.is_empty() {
        segments.push(line.with_text(head));
    }

    let mut cuts = splits;
    cuts.push(text.len());
    for pair in cuts.windows(2) {
        let chunk = text[pair[0]..pair[1]].trim();
        if !chunk.is_empty() {
            segments.push(line.with_text(chunk));
        }
    }

    segments
}

/// Re-attach naked bullets to their option text.
///
/// Resolution order for a line that is exactly one bullet glyph:
///
/// a. Forward merge: the next line exists, does not itself start with a
///    bullet, and is not a question header -- the two lines become one
///    bullet-prefixed option line carrying the bullet's bounding box.
/// b. Backward merge: the previously emitted line does not start with a
///    bullet and either looks like an image caption (at most two words,
///    label shape) or like a finished answer fragment (sentence-terminal
///    period, 2..=10 words) -- the glyph is folded onto the end of that
///    line, neutralizing it.
/// c. Otherwise the naked bullet stays; downstream it becomes an answer
///    option with empty text, which answer repair drops.
pub fn merge_naked_bullets(lines: Vec<Line>) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let text = line.text.trim();

        if !is_naked_bullet(text) {
            out.push(line.clone());
            i += 1;
            continue;
        }

        // a. Forward merge with the following text line.
        if let Some(next) = lines.get(i + 1) {
            let next_text = next.text.trim();
            let next_is_bullet = next_text.chars().next().is_some_and(is_bullet);
            if !next_is_bullet && !is_question_header(next_text) {
                out.push(line.with_text(format!("{} {}", text, next_text)));
                i += 2;
                continue;
            }
        }

        // b. Backward merge onto the previously accumulated line.
        if let Some(prev) = out.last_mut() {
            let prev_text = prev.text.trim();
            let prev_is_bullet = prev_text.chars().next().is_some_and(is_bullet);
            if !prev_is_bullet {
                let words = prev_text.split_whitespace().count();
                let label_like = words <= 2 && is_image_label(prev_text);
                let fragment_like = prev_text.ends_with('.') && (2..=10).contains(&words);
                if label_like || fragment_like {
                    prev.text = format!("{} {}", prev_text, text);
                    i += 1;
                    continue;
                }
            }
        }

        // c. Keep the naked bullet unmerged.
        out.push(line.clone());
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoundingBox;

    fn make_line(text: &str) -> Line {
        Line::new(text, BoundingBox::new(0.0, 0.0, 100.0, 10.0), 1)
    }

    // -- expand_inline_bullets ---------------------------------------------

    #[test]
    fn expand_plain_line_is_identity() {
        let line = make_line("Was ist die Hauptstadt?");
        assert_eq!(expand_inline_bullets(&line), vec![line.clone()]);
    }

    #[test]
    fn expand_leading_bullet_only_is_identity() {
        let line = make_line("\u{25A1} Berlin");
        assert_eq!(expand_inline_bullets(&line), vec![line.clone()]);
    }

    #[test]
    fn expand_splits_interior_bullets() {
        let line = make_line("Was ist das? \u{25A1} Berlin \u{25A1} Hamburg");
        let segments = expand_inline_bullets(&line);

        let texts: Vec<&str> = segments.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Was ist das?", "\u{25A1} Berlin", "\u{25A1} Hamburg"]);
        assert!(segments.iter().all(|s| s.page == 1));
    }

    #[test]
    fn expand_drops_blank_head() {
        let line = make_line("  \u{25A1} Berlin \u{25A1} Hamburg");
        let texts: Vec<String> = expand_inline_bullets(&line)
            .into_iter()
            .map(|l| l.text)
            .collect();
        assert_eq!(texts, vec!["\u{25A1} Berlin", "\u{25A1} Hamburg"]);
    }

    #[test]
    fn expand_line_starting_with_bullet_splits_later_options() {
        let line = make_line("\u{25A1} Berlin \u{25A1} Hamburg");
        let texts: Vec<String> = expand_inline_bullets(&line)
            .into_iter()
            .map(|l| l.text)
            .collect();
        assert_eq!(texts, vec!["\u{25A1} Berlin", "\u{25A1} Hamburg"]);
    }

    // -- merge_naked_bullets -----------------------------------------------

    #[test]
    fn forward_merge_joins_bullet_and_text() {
        let lines = vec![make_line("\u{25A1}"), make_line("Berlin")];
        let merged = merge_naked_bullets(lines);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "\u{25A1} Berlin");
    }

    #[test]
    fn forward_merge_keeps_bullet_bbox() {
        let bullet = Line::new("\u{25A1}", BoundingBox::new(5.0, 50.0, 10.0, 60.0), 2);
        let text = Line::new("Berlin", BoundingBox::new(20.0, 51.0, 80.0, 61.0), 2);
        let merged = merge_naked_bullets(vec![bullet.clone(), text]);

        assert_eq!(merged[0].bbox, bullet.bbox);
    }

    #[test]
    fn forward_merge_does_not_swallow_bullet_option() {
        // The next line already starts its own option; merging would destroy it.
        let lines = vec![make_line("\u{25A1}"), make_line("\u{25A1} Berlin")];
        let merged = merge_naked_bullets(lines);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "\u{25A1}");
    }

    #[test]
    fn forward_merge_does_not_cross_question_boundary() {
        let lines = vec![make_line("\u{25A1}"), make_line("Aufgabe 13")];
        let merged = merge_naked_bullets(lines);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].text, "Aufgabe 13");
    }

    #[test]
    fn backward_merge_onto_image_label() {
        let lines = vec![
            make_line("Bild 2"),
            make_line("\u{25A1}"),
            make_line("\u{25A1} Berlin"),
        ];
        let merged = merge_naked_bullets(lines);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Bild 2 \u{25A1}");
        assert_eq!(merged[1].text, "\u{25A1} Berlin");
    }

    #[test]
    fn backward_merge_onto_sentence_fragment() {
        let lines = vec![
            make_line("Das Grundgesetz gilt."),
            make_line("\u{25A1}"),
            make_line("\u{25A1} Berlin"),
        ];
        let merged = merge_naked_bullets(lines);

        assert_eq!(merged[0].text, "Das Grundgesetz gilt. \u{25A1}");
    }

    #[test]
    fn unresolvable_naked_bullet_is_kept() {
        // Neither forward (next is a bullet option) nor backward (previous is
        // a long unterminated line) applies.
        let lines = vec![
            make_line("Was ist die Hauptstadt von Deutschland und warum ist das so wichtig hier"),
            make_line("\u{25A1}"),
            make_line("\u{25A1} Berlin"),
        ];
        let merged = merge_naked_bullets(lines);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].text, "\u{25A1}");
    }
}
