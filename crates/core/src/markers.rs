//! The fixed lexical conventions of the source catalog.
//!
//! The parser is tuned to one document family: "Aufgabe N" question headers,
//! checkbox-glyph answer bullets, "Teil ..." part markers, and a handful of
//! boilerplate prefixes that must be skipped. Everything the segmenter and
//! the merger need to recognize lives here as predicate functions over one
//! trimmed line of text.

use regex::Regex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The closed set of glyphs that mark the start of an answer option.
///
/// U+F0A3 is the Wingdings checkbox the catalog actually uses; the empty
/// square and ballot box show up when a different extractor already mapped
/// the private-use glyph to Unicode.
pub const BULLET_GLYPHS: [char; 3] = ['\u{F0A3}', '\u{25A1}', '\u{2610}'];

/// Question headers: `"Aufgabe 12"`.
pub const QUESTION_PREFIX: &str = "Aufgabe ";

/// Page labels: `"Seite 3 von 120"`.
pub const PAGE_LABEL_PREFIX: &str = "Seite ";

/// Section part markers: `"Teil I"`, `"Teil II"`.
pub const PART_PREFIX: &str = "Teil ";

/// Section topic markers. Two shapes occur in the catalog.
pub const TOPIC_PREFIXES: [&str; 2] = ["Allgemeine Fragen", "Bundesland"];

/// Structural/explanatory boilerplate that never belongs to a question.
pub const META_PREFIXES: [&str; 3] = ["Test", "Aufbau", "Hinweis"];

/// Copyright footer markers.
pub const COPYRIGHT_MARKERS: [&str; 2] = ["\u{A9}", "Copyright"];

// ---------------------------------------------------------------------------
// Bullet predicates
// ---------------------------------------------------------------------------

pub fn is_bullet(c: char) -> bool {
    BULLET_GLYPHS.contains(&c)
}

/// If `text` starts with a bullet glyph, return the option text after it
/// (leading bullets and whitespace stripped).
pub fn strip_bullet(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if !is_bullet(first) {
        return None;
    }
    Some(text.trim_start_matches(|c| is_bullet(c) || c == ' ').trim())
}

/// A line that is exactly one bullet glyph with no attached text.
pub fn is_naked_bullet(text: &str) -> bool {
    let mut chars = text.trim().chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_bullet(c))
}

// ---------------------------------------------------------------------------
// Line classification predicates
// ---------------------------------------------------------------------------

pub fn is_question_header(text: &str) -> bool {
    text.starts_with(QUESTION_PREFIX)
}

/// Parse the integer following the question-header prefix.
///
/// Failure is non-fatal: the caller keeps the question with no number.
pub fn parse_question_number(text: &str) -> Option<u32> {
    text.strip_prefix("Aufgabe")?.trim().parse().ok()
}

pub fn is_page_label(text: &str) -> bool {
    text.starts_with(PAGE_LABEL_PREFIX)
}

pub fn is_part_marker(text: &str) -> bool {
    text.starts_with(PART_PREFIX)
}

pub fn is_topic_marker(text: &str) -> bool {
    TOPIC_PREFIXES.iter().any(|p| text.starts_with(p))
}

pub fn is_meta_marker(text: &str) -> bool {
    META_PREFIXES.iter().any(|p| text.starts_with(p))
}

pub fn is_copyright(text: &str) -> bool {
    COPYRIGHT_MARKERS.iter().any(|m| text.starts_with(m))
}

/// Short inline-image captions like `"Bild"`, `"Bild 2"`, or `"Bild 2 \u{F0A3}"`
/// (a stray checkbox merged onto the caption is tolerated).
pub fn is_image_label(text: &str) -> bool {
    let re = Regex::new(r"^Bild(\s*\d+)?\s*[\x{F0A3}\x{25A1}\x{2610}]?$").unwrap();
    re.is_match(text.trim())
}

/// True when the text ends with a Unicode or three-dot ellipsis.
pub fn ends_with_ellipsis(text: &str) -> bool {
    let t = text.trim_end();
    t.ends_with('\u{2026}') || t.ends_with("...")
}
