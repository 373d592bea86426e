//! Associates each page's embedded images with the question that overlaps
//! them vertically.
//!
//! Claims are exclusive per page: the first question (in emission order) to
//! reach an image keeps it. Claim identity is the SHA-256 of the image
//! bytes, so the same embedded image is never attached twice even when the
//! extractor lists it once per drawing operation.

use std::collections::{BTreeMap, HashSet};

use sha2::{Digest, Sha256};

use crate::model::{ClaimedImage, PlacedImage, Question};

/// Vertical slack, in layout units, within which an image just above or
/// below a question's box still belongs to it.
pub const CLAIM_PADDING: f32 = 12.0;

type ImageDigest = [u8; 32];

fn digest(bytes: &[u8]) -> ImageDigest {
    Sha256::digest(bytes).into()
}

/// Claim images for questions, page by page, in question-emission order.
pub fn assign_images(questions: &mut [Question], images_by_page: &BTreeMap<u32, Vec<PlacedImage>>) {
    let mut claims: BTreeMap<u32, HashSet<ImageDigest>> = BTreeMap::new();

    for question in questions.iter_mut() {
        for (&page, bounds) in &question.bounds {
            let Some(page_images) = images_by_page.get(&page) else {
                continue;
            };
            let claimed = claims.entry(page).or_default();

            for image in page_images {
                let id = digest(&image.bytes);
                if claimed.contains(&id) {
                    continue;
                }

                let overlap =
                    bounds.bottom.min(image.bbox.bottom) - bounds.top.max(image.bbox.top);
                if overlap >= -CLAIM_PADDING {
                    question.claimed_images.push(ClaimedImage {
                        page,
                        bytes: image.bytes.clone(),
                        extension: image.extension.clone(),
                    });
                    claimed.insert(id);
                }
            }
        }
    }
}
