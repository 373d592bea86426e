//! Text and image-placement extraction from page content streams.
//!
//! This module implements two pure walks over a page's decoded content
//! operations.  The text walk is a simplified PDF text-rendering state
//! machine producing positioned [`TextSpan`]s that are then grouped into
//! [`Line`]s.  The graphics walk tracks the transformation matrix through
//! `q`/`Q`/`cm` so that every `Do` invocation of an XObject yields the
//! rectangle it was painted into.
//!
//! All output coordinates use a top-left origin: `top < bottom`, with the
//! page's MediaBox height used to flip the PDF's bottom-left origin.

use super::backend::{get_number_from_value, PageId, PdfBackend, PdfValue};
use crate::types::{BoundingBox, Line};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single run of text at a specific position on the page.
///
/// Coordinates are in PDF space (bottom-left origin); the flip to top-origin
/// happens when spans are assembled into [`Line`]s.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

/// Where an XObject was painted: its resource-dictionary name plus the
/// rectangle covered by the drawing operation, in top-origin coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: Vec<u8>,
    pub bbox: BoundingBox,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Two spans whose Y coordinates differ by no more than this are treated as
/// belonging to the same line.  The catalog mixes text and symbol fonts on
/// one baseline with small vertical offsets.
const Y_TOLERANCE: f32 = 2.0;

/// Approximate character width as a fraction of font size when no better
/// metric is available.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Minimum gap (in points) between adjacent spans before we insert a space.
const MIN_WORD_GAP: f32 = 1.5;

/// The identity 2x3 matrix: [a, b, c, d, e, f].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Mutable state tracked while walking a page's content stream for text.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key).
    font_key: Vec<u8>,
    /// Current font size in text-space units.
    font_size: f32,
    /// Elements [a, b, c, d, tx, ty] of the current text matrix.
    text_matrix: [f32; 6],
    /// Text line matrix -- set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).  Default 1.0.
    horiz_scale: f32,
    /// Character spacing (Tc).
    char_spacing: f32,
    /// Word spacing (Tw).
    word_spacing: f32,
    /// Text rise (Ts).
    text_rise: f32,
    /// Leading (TL).
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Effective font size accounting for the text matrix vertical scale.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }
}

/// Estimate the rendered width of a text string given the current state.
///
/// We do not have access to the actual glyph widths array, so each character
/// contributes `font_size * APPROX_CHAR_WIDTH_RATIO * horiz_scale`.
fn estimate_text_width(text: &str, state: &TextState) -> f32 {
    let n = text.chars().count() as f32;
    n * state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale
}

/// Advance the text matrix after rendering `text`.
fn advance_after_show(text: &str, state: &mut TextState) {
    let mut total_dx: f32 = 0.0;
    for ch in text.chars() {
        let char_w = state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale;
        total_dx += char_w + state.char_spacing;
        if ch == ' ' {
            total_dx += state.word_spacing;
        }
    }
    state.advance_x(total_dx);
}

/// Decode a single [`PdfValue::Str`] operand into a `String`, using the
/// backend's font-aware decoder.
fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                super::backend::decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Public API: span extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce a flat list of
/// [`TextSpan`]s.
///
/// Implements a simplified PDF text-rendering state machine handling the
/// operators:
///
/// | Operator | Action |
/// |----------|--------|
/// | `BT`     | Begin text object -- reset matrices |
/// | `ET`     | End text object |
/// | `Tf`     | Set font and size |
/// | `Tm`     | Set text matrix directly |
/// | `Td`     | Translate text position |
/// | `TD`     | Translate and set leading |
/// | `T*`     | Move to start of next line |
/// | `TL`     | Set text leading |
/// | `Tc`     | Set character spacing |
/// | `Tw`     | Set word spacing |
/// | `Tz`     | Set horizontal scaling |
/// | `Ts`     | Set text rise |
/// | `Tj`     | Show a string |
/// | `TJ`     | Show strings with kerning adjustments |
/// | `'`      | Move to next line and show string |
/// | `"`      | Set spacing, move to next line and show string |
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut state = TextState::default();
    let mut spans: Vec<TextSpan> = Vec::new();

    for op in &ops {
        match op.operator.as_str() {
            // -- Text object delimiters --------------------------------
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {
                // Font state is kept across text objects because the catalog
                // reuses fonts set earlier.
            }

            // -- Font ---------------------------------------------------
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let PdfValue::Name(key) = &op.operands[0] {
                        state.font_key = key.clone();
                    }
                    state.font_size = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                }
            }

            // -- Text matrix / position ---------------------------------
            "Tm" => {
                if let Some(m) = read_matrix(&op.operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "Td" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                // TD is equivalent to: -ty TL ; tx ty Td
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => {
                state.translate_line(0.0, -state.leading);
            }
            "TL" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.leading = v;
                }
            }

            // -- Spacing / scaling --------------------------------------
            "Tc" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.text_rise = v;
                }
            }

            // -- Show text ----------------------------------------------
            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    handle_tj_array(arr, backend, page_id, &mut state, &mut spans);
                }
            }

            // -- Convenience show operators -----------------------------
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "\"" => {
                // " aw ac string  =>  set Tw, Tc, T*, Tj
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    emit_show_string(&op.operands[2], backend, page_id, &mut state, &mut spans);
                }
            }

            _ => { /* Ignore non-text operators */ }
        }
    }

    Ok(spans)
}

/// Read six numeric operands as a 2x3 matrix.
fn read_matrix(operands: &[PdfValue]) -> Option<[f32; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    if vals.len() == 6 {
        Some([vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
    } else {
        None
    }
}

/// Decode an operand as a string, create a [`TextSpan`], and advance the
/// text position.  Shared by `Tj`, `'`, and `"` operators.
fn emit_show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    let x = state.x();
    let y = state.y() + state.text_rise;
    let fs = state.effective_font_size();
    let width = estimate_text_width(&text, state);
    spans.push(TextSpan {
        text: text.clone(),
        x,
        y,
        width,
        font_size: fs,
    });
    advance_after_show(&text, state);
}

/// Process a `TJ` array: elements are either strings to render or numeric
/// kerning adjustments (in thousandths of a unit of text space).
fn handle_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let mut buf = String::new();
    let mut span_x = state.x();
    let span_y = state.y() + state.text_rise;

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &state.font_key);
                if buf.is_empty() {
                    span_x = state.x();
                }
                buf.push_str(&fragment);
                advance_after_show(&fragment, state);
            }
            val => {
                // Numeric kerning: negative value = move right, positive =
                // move left (in thousandths of a text-space unit).
                if let Some(adj) = get_number_from_value(val) {
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;

                    // A displacement large enough to look like a word gap
                    // becomes a space in the accumulated buffer.
                    let gap_threshold =
                        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;

                    if dx > gap_threshold && !buf.is_empty() {
                        buf.push(' ');
                    }

                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        let fs = state.effective_font_size();
        let width = estimate_text_width(trimmed, state);
        spans.push(TextSpan {
            text: trimmed.to_string(),
            x: span_x,
            y: span_y,
            width,
            font_size: fs,
        });
    }
}

// ---------------------------------------------------------------------------
// Public API: span -> line grouping
// ---------------------------------------------------------------------------

/// Group a page's [`TextSpan`]s into [`Line`]s in top-to-bottom reading
/// order, converting coordinates to a top-left origin.
///
/// Spans whose Y coordinates lie within [`Y_TOLERANCE`] points of each other
/// are placed on the same line.  Within a line, spans are sorted
/// left-to-right and a single space is inserted between spans separated by
/// at least [`MIN_WORD_GAP`] points.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>, page: u32, page_height: f32) -> Vec<Line> {
    if spans.is_empty() {
        return Vec::new();
    }

    // Sort by Y descending (top of page first), then X ascending.
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<TextSpan> = vec![spans.remove(0)];
    let mut current_y = current[0].y;

    for span in spans {
        if (span.y - current_y).abs() <= Y_TOLERANCE {
            current.push(span);
        } else {
            lines.push(assemble_line(std::mem::take(&mut current), page, page_height));
            current_y = span.y;
            current.push(span);
        }
    }

    if !current.is_empty() {
        lines.push(assemble_line(current, page, page_height));
    }

    lines
}

/// Build a [`Line`] from spans known to share the same baseline.
fn assemble_line(mut spans: Vec<TextSpan>, page: u32, page_height: f32) -> Line {
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut text = String::new();
    let mut prev_end: Option<f32> = None;
    for span in &spans {
        if let Some(end) = prev_end {
            let gap = span.x - end;
            if gap >= MIN_WORD_GAP && !text.is_empty() && !text.ends_with(' ') {
                text.push(' ');
            }
        }
        text.push_str(&span.text);
        prev_end = Some(span.x + span.width);
    }

    let left = spans
        .iter()
        .map(|s| s.x)
        .fold(f32::INFINITY, f32::min);
    let right = spans
        .iter()
        .map(|s| s.x + s.width)
        .fold(f32::NEG_INFINITY, f32::max);
    let baseline = spans.first().map(|s| s.y).unwrap_or(0.0);
    let ascent = spans
        .iter()
        .map(|s| s.font_size)
        .fold(0.0_f32, f32::max);

    // Flip to a top-left origin: the span box spans from the baseline up to
    // baseline + ascent in PDF space.
    let top = page_height - (baseline + ascent);
    let bottom = page_height - baseline;

    Line {
        text,
        bbox: BoundingBox::new(left, top, right, bottom),
        page,
    }
}

/// Extract all text lines from a page.
pub fn extract_page_lines(
    backend: &dyn PdfBackend,
    page: u32,
    page_id: PageId,
) -> Result<Vec<Line>, PdfError> {
    let spans = extract_page_spans(backend, page_id)?;
    let (_, height) = backend.page_dimensions(page_id)?;
    Ok(group_spans_into_lines(spans, page, height))
}

// ---------------------------------------------------------------------------
// Public API: image placements
// ---------------------------------------------------------------------------

/// Multiply two 2x3 matrices: `result = m * ctm` (row-vector convention,
/// `m` applied first).
fn mat_mul(m: [f32; 6], ctm: [f32; 6]) -> [f32; 6] {
    [
        m[0] * ctm[0] + m[1] * ctm[2],
        m[0] * ctm[1] + m[1] * ctm[3],
        m[2] * ctm[0] + m[3] * ctm[2],
        m[2] * ctm[1] + m[3] * ctm[3],
        m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
        m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
    ]
}

/// Transform a point through a 2x3 matrix.
fn transform_point(m: [f32; 6], x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

/// Map the image unit square through `ctm` and return the covered
/// rectangle in top-origin coordinates.
fn unit_square_bbox(ctm: [f32; 6], page_height: f32) -> BoundingBox {
    let corners = [
        transform_point(ctm, 0.0, 0.0),
        transform_point(ctm, 1.0, 0.0),
        transform_point(ctm, 0.0, 1.0),
        transform_point(ctm, 1.0, 1.0),
    ];

    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for (x, y) in corners {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    BoundingBox::new(min_x, page_height - max_y, max_x, page_height - min_y)
}

/// Walk a page's content stream tracking the graphics state and return the
/// placement rectangle of every `Do` invocation.
///
/// Image XObjects are painted into the unit square mapped through the
/// current transformation matrix, so the rectangle is recovered by pushing
/// the four unit-square corners through the CTM at the time of the `Do`.
pub fn extract_image_placements(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<Placement>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let (_, height) = backend.page_dimensions(page_id)?;

    let mut ctm = IDENTITY_MATRIX;
    let mut stack: Vec<[f32; 6]> = Vec::new();
    let mut placements: Vec<Placement> = Vec::new();

    for op in &ops {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if let Some(m) = read_matrix(&op.operands) {
                    ctm = mat_mul(m, ctm);
                }
            }
            "Do" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    placements.push(Placement {
                        name: name.clone(),
                        bbox: unit_square_bbox(ctm, height),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(placements)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::backend::ContentOp;

    // -- Mock backend ------------------------------------------------------

    /// Scripted backend: a fixed list of content ops for a single page.
    struct MockBackend {
        ops: Vec<ContentOp>,
        page_height: f32,
    }

    impl MockBackend {
        fn new(ops: Vec<ContentOp>) -> Self {
            Self {
                ops,
                page_height: 842.0,
            }
        }
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            let mut m = BTreeMap::new();
            m.insert(1, (1, 0));
            m
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>, PdfError> {
            Ok(Vec::new())
        }

        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            Ok(self.ops.clone())
        }

        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).into_owned()
        }

        fn page_dimensions(&self, _page: PageId) -> Result<(f32, f32), PdfError> {
            Ok((595.0, self.page_height))
        }
    }

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    fn num(v: f32) -> PdfValue {
        PdfValue::Real(v)
    }

    fn text_at(x: f32, y: f32, s: &str) -> Vec<ContentOp> {
        vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(12.0)]),
            op("Td", vec![num(x), num(y)]),
            op("Tj", vec![PdfValue::Str(s.as_bytes().to_vec())]),
            op("ET", vec![]),
        ]
    }

    fn make_span(text: &str, x: f32, y: f32, font_size: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            x,
            y,
            width: text.chars().count() as f32 * font_size * APPROX_CHAR_WIDTH_RATIO,
            font_size,
        }
    }

    // -- span extraction ----------------------------------------------------

    #[test]
    fn tj_emits_span_at_text_position() {
        let backend = MockBackend::new(text_at(72.0, 700.0, "Aufgabe 1"));
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Aufgabe 1");
        assert!((spans[0].x - 72.0).abs() < 0.01);
        assert!((spans[0].y - 700.0).abs() < 0.01);
        assert!((spans[0].font_size - 12.0).abs() < 0.01);
    }

    #[test]
    fn td_moves_relative_to_line_start() {
        let mut ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op("Td", vec![num(72.0), num(700.0)]),
            op("Tj", vec![PdfValue::Str(b"first".to_vec())]),
        ];
        ops.push(op("Td", vec![num(0.0), num(-14.0)]));
        ops.push(op("Tj", vec![PdfValue::Str(b"second".to_vec())]));
        ops.push(op("ET", vec![]));

        let backend = MockBackend::new(ops);
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();

        assert_eq!(spans.len(), 2);
        assert!((spans[1].y - 686.0).abs() < 0.01);
        // The second Td restarts from the line matrix, not the advanced
        // text position.
        assert!((spans[1].x - 72.0).abs() < 0.01);
    }

    #[test]
    fn t_star_uses_leading() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op("TL", vec![num(14.0)]),
            op("Td", vec![num(72.0), num(700.0)]),
            op("Tj", vec![PdfValue::Str(b"first".to_vec())]),
            op("T*", vec![]),
            op("Tj", vec![PdfValue::Str(b"second".to_vec())]),
            op("ET", vec![]),
        ];

        let backend = MockBackend::new(ops);
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();

        assert_eq!(spans.len(), 2);
        assert!((spans[1].y - 686.0).abs() < 0.01);
    }

    #[test]
    fn tm_sets_position_directly() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(12.0)]),
            op(
                "Tm",
                vec![num(1.0), num(0.0), num(0.0), num(1.0), num(100.0), num(500.0)],
            ),
            op("Tj", vec![PdfValue::Str(b"hello".to_vec())]),
            op("ET", vec![]),
        ];

        let backend = MockBackend::new(ops);
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();

        assert_eq!(spans.len(), 1);
        assert!((spans[0].x - 100.0).abs() < 0.01);
        assert!((spans[0].y - 500.0).abs() < 0.01);
    }

    #[test]
    fn tj_array_inserts_space_on_large_kerning() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op("Td", vec![num(72.0), num(700.0)]),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"Aufgabe".to_vec()),
                    PdfValue::Integer(-300),
                    PdfValue::Str(b"1".to_vec()),
                ])],
            ),
            op("ET", vec![]),
        ];

        let backend = MockBackend::new(ops);
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Aufgabe 1");
    }

    #[test]
    fn tj_array_small_kerning_joins_directly() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op("Td", vec![num(72.0), num(700.0)]),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"Auf".to_vec()),
                    PdfValue::Integer(-20),
                    PdfValue::Str(b"gabe".to_vec()),
                ])],
            ),
            op("ET", vec![]),
        ];

        let backend = MockBackend::new(ops);
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Aufgabe");
    }

    #[test]
    fn empty_content_yields_no_spans() {
        let backend = MockBackend::new(vec![]);
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert!(spans.is_empty());
    }

    // -- line grouping -------------------------------------------------------

    #[test]
    fn spans_on_one_baseline_form_one_line() {
        let spans = vec![
            make_span("Aufgabe", 72.0, 700.0, 12.0),
            make_span("1", 120.0, 700.0, 12.0),
        ];
        let lines = group_spans_into_lines(spans, 1, 842.0);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Aufgabe 1");
        assert_eq!(lines[0].page, 1);
    }

    #[test]
    fn small_baseline_offset_still_merges() {
        // Symbol font glyphs often sit a point or two off the baseline.
        let spans = vec![
            make_span("\u{F0A3}", 72.0, 700.0, 12.0),
            make_span("Berlin", 90.0, 701.5, 12.0),
        ];
        let lines = group_spans_into_lines(spans, 1, 842.0);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "\u{F0A3} Berlin");
    }

    #[test]
    fn distinct_baselines_form_distinct_lines_top_first() {
        let spans = vec![
            make_span("lower", 72.0, 650.0, 12.0),
            make_span("upper", 72.0, 700.0, 12.0),
        ];
        let lines = group_spans_into_lines(spans, 1, 842.0);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "upper");
        assert_eq!(lines[1].text, "lower");
        assert!(lines[0].bbox.top < lines[1].bbox.top);
    }

    #[test]
    fn line_bbox_is_top_origin() {
        let spans = vec![make_span("text", 72.0, 700.0, 12.0)];
        let lines = group_spans_into_lines(spans, 1, 842.0);

        let bbox = lines[0].bbox;
        assert!(bbox.top < bbox.bottom);
        assert!((bbox.bottom - 142.0).abs() < 0.01);
        assert!((bbox.top - 130.0).abs() < 0.01);
        assert!((bbox.left - 72.0).abs() < 0.01);
    }

    #[test]
    fn adjacent_spans_concatenate_without_space() {
        let spans = vec![
            make_span("Auf", 72.0, 700.0, 12.0),
            // Starts exactly where the previous span ends.
            make_span("gabe", 72.0 + 3.0 * 6.0, 700.0, 12.0),
        ];
        let lines = group_spans_into_lines(spans, 1, 842.0);

        assert_eq!(lines[0].text, "Aufgabe");
    }

    #[test]
    fn grouping_empty_input() {
        assert!(group_spans_into_lines(vec![], 1, 842.0).is_empty());
    }

    // -- image placements ----------------------------------------------------

    #[test]
    fn do_records_ctm_mapped_rectangle() {
        let ops = vec![
            op("q", vec![]),
            // 100x80 image with its lower-left corner at (50, 600).
            op(
                "cm",
                vec![num(100.0), num(0.0), num(0.0), num(80.0), num(50.0), num(600.0)],
            ),
            op("Do", vec![PdfValue::Name(b"Im1".to_vec())]),
            op("Q", vec![]),
        ];

        let backend = MockBackend::new(ops);
        let placements = extract_image_placements(&backend, (1, 0)).unwrap();

        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].name, b"Im1");
        let bbox = placements[0].bbox;
        assert!((bbox.left - 50.0).abs() < 0.01);
        assert!((bbox.right - 150.0).abs() < 0.01);
        // Top-origin: page height 842, image spans 600..680 bottom-up.
        assert!((bbox.top - 162.0).abs() < 0.01);
        assert!((bbox.bottom - 242.0).abs() < 0.01);
    }

    #[test]
    fn q_restores_previous_ctm() {
        let ops = vec![
            op("q", vec![]),
            op(
                "cm",
                vec![num(100.0), num(0.0), num(0.0), num(100.0), num(0.0), num(0.0)],
            ),
            op("Q", vec![]),
            op("q", vec![]),
            op(
                "cm",
                vec![num(50.0), num(0.0), num(0.0), num(50.0), num(10.0), num(20.0)],
            ),
            op("Do", vec![PdfValue::Name(b"Im2".to_vec())]),
            op("Q", vec![]),
        ];

        let backend = MockBackend::new(ops);
        let placements = extract_image_placements(&backend, (1, 0)).unwrap();

        assert_eq!(placements.len(), 1);
        let bbox = placements[0].bbox;
        assert!((bbox.left - 10.0).abs() < 0.01);
        assert!((bbox.right - 60.0).abs() < 0.01);
    }

    #[test]
    fn nested_cm_compose() {
        let ops = vec![
            op(
                "cm",
                vec![num(2.0), num(0.0), num(0.0), num(2.0), num(0.0), num(0.0)],
            ),
            op(
                "cm",
                vec![num(10.0), num(0.0), num(0.0), num(10.0), num(5.0), num(5.0)],
            ),
            op("Do", vec![PdfValue::Name(b"Im1".to_vec())]),
        ];

        let backend = MockBackend::new(ops);
        let placements = extract_image_placements(&backend, (1, 0)).unwrap();

        // Inner 10x10 at (5,5), scaled by outer 2x: 20x20 at (10,10).
        let bbox = placements[0].bbox;
        assert!((bbox.left - 10.0).abs() < 0.01);
        assert!((bbox.right - 30.0).abs() < 0.01);
        assert!((bbox.bottom - (842.0 - 10.0)).abs() < 0.01);
        assert!((bbox.top - (842.0 - 30.0)).abs() < 0.01);
    }

    #[test]
    fn rotated_placement_covers_axis_aligned_extent() {
        // 90-degree rotation: unit square mapped through [0 1 -1 0 100 100].
        let ops = vec![
            op(
                "cm",
                vec![num(0.0), num(60.0), num(-40.0), num(0.0), num(100.0), num(100.0)],
            ),
            op("Do", vec![PdfValue::Name(b"Im1".to_vec())]),
        ];

        let backend = MockBackend::new(ops);
        let placements = extract_image_placements(&backend, (1, 0)).unwrap();

        let bbox = placements[0].bbox;
        assert!((bbox.left - 60.0).abs() < 0.01);
        assert!((bbox.right - 100.0).abs() < 0.01);
    }
}
