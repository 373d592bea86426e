use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A rectangle in top-origin page coordinates (`top < bottom`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Min/max accumulator for the extent a question covers on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl PageBounds {
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            top: bbox.top,
            bottom: bbox.bottom,
            left: bbox.left,
            right: bbox.right,
        }
    }

    /// Expand to cover `bbox` as well.
    pub fn expand(&mut self, bbox: &BoundingBox) {
        self.top = self.top.min(bbox.top);
        self.bottom = self.bottom.max(bbox.bottom);
        self.left = self.left.min(bbox.left);
        self.right = self.right.max(bbox.right);
    }
}

// ---------------------------------------------------------------------------
// Pipeline input
// ---------------------------------------------------------------------------

/// One extracted text fragment with its page and bounding box.
///
/// Produced by the document reader, already sorted page-then-top-then-left.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub bbox: BoundingBox,
    pub page: u32,
}

impl Line {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, page: u32) -> Self {
        Self {
            text: text.into(),
            bbox,
            page,
        }
    }

    /// Same position, different text. Used when a line is split or repaired.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bbox: self.bbox,
            page: self.page,
        }
    }
}

/// An embedded image drawn somewhere on a page, with its placed rectangle.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub page: u32,
    pub bbox: BoundingBox,
    pub bytes: Vec<u8>,
    pub extension: String,
}

// ---------------------------------------------------------------------------
// Dataset schema
// ---------------------------------------------------------------------------

/// Running section context, copied into each question as it is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub part: Option<String>,
    pub topic: Option<String>,
}

/// One answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An image claimed by a question, still carrying its byte content.
///
/// The persistence layer writes the bytes out and replaces the claim with a
/// relative file identifier in [`Question::images`].
#[derive(Debug, Clone)]
pub struct ClaimedImage {
    pub page: u32,
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// A finalized question record.
///
/// `id` is assigned by emission order and may diverge from `question_number`
/// (which can be missing or repeat across catalog revisions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: usize,
    pub display_number: String,
    pub question_number: Option<u32>,
    pub section: Section,
    pub question: String,
    pub answers: Vec<Answer>,
    pub pages: Vec<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<usize>,
    /// Per-page extent, used for image assignment. Internal only.
    #[serde(skip)]
    pub bounds: BTreeMap<u32, PageBounds>,
    /// Images claimed on this import run. Internal only.
    #[serde(skip)]
    pub claimed_images: Vec<ClaimedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub source: String,
    pub generated_at: String,
    pub question_count: usize,
}

/// The persisted dataset: what `import` writes and `validate` /
/// reconciliation read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub meta: DatasetMeta,
    pub questions: Vec<Question>,
}
