/// Axis-aligned rectangle in page coordinates with the origin at the
/// top-left corner. `top < bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
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

/// A horizontal line of text with its position on a page.
///
/// Pages are numbered from 1, matching the backend's page map.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub bbox: BoundingBox,
    pub page: u32,
}

/// A decoded embedded image together with the rectangle its drawing
/// operation covered on the page.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub page: u32,
    pub bbox: BoundingBox,
    pub bytes: Vec<u8>,
    /// Lower-case file extension matching the byte format (`"png"`,
    /// `"jpg"`, ...).
    pub extension: String,
}
