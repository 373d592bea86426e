//! PDF reading for the question catalog importer.
//!
//! This crate owns every interaction with the PDF container: parsing via
//! `lopdf`, walking content streams for positioned text and image
//! placements, and decoding embedded image XObjects.  Its output --
//! [`ExtractedDocument`] -- is plain positioned data with no knowledge of
//! questions or answers; interpreting it is the core crate's job.

use std::collections::BTreeMap;

use thiserror::Error;

pub mod backend;
pub mod extract;
pub mod images;
pub mod types;

pub use types::*;

use backend::PdfBackend;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Everything pulled out of the source PDF in one pass.
pub struct ExtractedDocument {
    /// Text lines across all pages, in reading order (page by page, top to
    /// bottom).
    pub lines: Vec<Line>,
    /// Decoded images grouped by 1-based page number, each with the
    /// rectangle its drawing operation covered.
    pub images_by_page: BTreeMap<u32, Vec<PlacedImage>>,
    pub page_count: usize,
}

impl ExtractedDocument {
    /// Parse PDF bytes and extract positioned text and images.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = backend::LopdfBackend::load_bytes(bytes)?;
        let page_map = backend.pages();

        let mut lines: Vec<Line> = Vec::new();
        let mut images_by_page: BTreeMap<u32, Vec<PlacedImage>> = BTreeMap::new();

        for (&page_num, &page_id) in &page_map {
            lines.extend(extract::extract_page_lines(&backend, page_num, page_id)?);

            let placements = extract::extract_image_placements(&backend, page_id)?;
            if placements.is_empty() {
                continue;
            }

            let decoded = images::decode_page_images(&backend, page_id)?;
            let mut placed: Vec<PlacedImage> = Vec::new();
            for placement in &placements {
                // One XObject may be painted several times; each placement
                // gets its own copy so every drawing site carries a rect.
                if let Some(img) = decoded.iter().find(|i| i.name == placement.name) {
                    placed.push(PlacedImage {
                        page: page_num,
                        bbox: placement.bbox,
                        bytes: img.bytes.clone(),
                        extension: img.extension.clone(),
                    });
                }
            }
            if !placed.is_empty() {
                images_by_page.insert(page_num, placed);
            }
        }

        Ok(ExtractedDocument {
            lines,
            images_by_page,
            page_count: page_map.len(),
        })
    }
}
