//! Decoding of embedded image XObjects.
//!
//! The catalog embeds its coats of arms and photos in several encodings:
//! JPEG streams (`DCTDecode`), raw pixel data behind `FlateDecode`, and
//! bi-level scans behind `CCITTFaxDecode`.  Everything that is not already
//! in a browser-friendly container is re-encoded as PNG.

use std::io::Cursor;

use crate::backend::LopdfBackend;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Detected image byte format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Jpeg2000,
    Gif,
    Tiff,
    Bmp,
    Unknown,
}

impl ImageFormat {
    /// File extension matching the byte format.  Unknown data is written as
    /// `.png` because anything reaching persistence has been re-encoded.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg2000 => "jp2",
            ImageFormat::Gif => "gif",
            ImageFormat::Tiff => "tif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Unknown => "png",
        }
    }
}

/// A decoded image XObject keyed by its resource-dictionary name.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub name: Vec<u8>,
    pub bytes: Vec<u8>,
    pub extension: String,
}

// ---------------------------------------------------------------------------
// Pure types for raw image handling
// ---------------------------------------------------------------------------

/// Parsed color space from a PDF image stream dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

/// Parsed image metadata from a PDF stream dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawImageMeta {
    width: u32,
    height: u32,
    bits_per_component: u8,
    channels: u8,
    color_space: ColorSpace,
}

impl RawImageMeta {
    /// Expected raw byte count for this image's pixel data.
    /// Accounts for sub-byte pixel packing with per-row byte alignment.
    fn expected_byte_count(&self) -> usize {
        let bits_per_row =
            self.width as usize * self.channels as usize * self.bits_per_component as usize;
        let bytes_per_row = bits_per_row.div_ceil(8);
        bytes_per_row * self.height as usize
    }
}

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

/// Detect the image format from raw bytes using magic byte signatures.
///
/// Returns `ImageFormat::Unknown` if the bytes are too short (< 8) or no
/// known signature matches.
pub fn detect_image_format(bytes: &[u8]) -> ImageFormat {
    if bytes.len() < 8 {
        return ImageFormat::Unknown;
    }

    // JPEG: FF D8 FF
    if bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return ImageFormat::Jpeg;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if bytes[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return ImageFormat::Png;
    }

    // JPEG2000: 00 00 00 0C 6A 50 20 20
    if bytes[..8] == [0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20] {
        return ImageFormat::Jpeg2000;
    }

    // GIF: "GIF87a" or "GIF89a"
    if &bytes[..6] == b"GIF87a" || &bytes[..6] == b"GIF89a" {
        return ImageFormat::Gif;
    }

    // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
    if bytes[..4] == [0x49, 0x49, 0x2A, 0x00] || bytes[..4] == [0x4D, 0x4D, 0x00, 0x2A] {
        return ImageFormat::Tiff;
    }

    // BMP: "BM"
    if bytes[0] == b'B' && bytes[1] == b'M' {
        return ImageFormat::Bmp;
    }

    ImageFormat::Unknown
}

/// Determine image format from a PDF stream filter name.
///
/// `DCTDecode` corresponds to JPEG, `JPXDecode` to JPEG2000.  All other
/// filters return `ImageFormat::Unknown`.
pub fn format_from_pdf_filter(filter_name: &str) -> ImageFormat {
    match filter_name {
        "DCTDecode" => ImageFormat::Jpeg,
        "JPXDecode" => ImageFormat::Jpeg2000,
        _ => ImageFormat::Unknown,
    }
}

/// Resolve the image format using a PDF filter name hint with magic byte
/// fallback.
pub fn resolve_format(raw_bytes: &[u8], filter: Option<&str>) -> ImageFormat {
    if let Some(name) = filter {
        let from_filter = format_from_pdf_filter(name);
        if from_filter != ImageFormat::Unknown {
            return from_filter;
        }
    }
    detect_image_format(raw_bytes)
}

// ---------------------------------------------------------------------------
// Pure image conversion functions
// ---------------------------------------------------------------------------

/// Parse image metadata from a PDF stream dictionary.
fn extract_image_meta(dict: &lopdf::Dictionary) -> Option<RawImageMeta> {
    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    let bits_per_component = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .map(|v| v as u8)
        .unwrap_or(8);

    let color_space_name = dict.get(b"ColorSpace").ok()?.as_name().ok()?;
    let (color_space, channels) = match color_space_name {
        b"DeviceRGB" => (ColorSpace::Rgb, 3),
        b"DeviceGray" => (ColorSpace::Gray, 1),
        b"DeviceCMYK" => (ColorSpace::Cmyk, 4),
        _ => return None,
    };

    Some(RawImageMeta {
        width,
        height,
        bits_per_component,
        channels,
        color_space,
    })
}

/// Re-encode raw pixel data as PNG.
fn encode_raw_as_png(meta: &RawImageMeta, raw_bytes: &[u8]) -> Option<Vec<u8>> {
    if raw_bytes.len() != meta.expected_byte_count() {
        return None;
    }

    let expanded = if meta.bits_per_component < 8 {
        expand_sub_byte_pixels(raw_bytes, meta)
    } else {
        raw_bytes.to_vec()
    };

    let dyn_image = match meta.color_space {
        ColorSpace::Gray => {
            let img = image::GrayImage::from_raw(meta.width, meta.height, expanded)?;
            image::DynamicImage::ImageLuma8(img)
        }
        ColorSpace::Rgb => {
            let img = image::RgbImage::from_raw(meta.width, meta.height, expanded)?;
            image::DynamicImage::ImageRgb8(img)
        }
        ColorSpace::Cmyk => {
            let rgb_pixels = cmyk_to_rgb(&expanded);
            let img = image::RgbImage::from_raw(meta.width, meta.height, rgb_pixels)?;
            image::DynamicImage::ImageRgb8(img)
        }
    };

    let mut buf = Vec::new();
    dyn_image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .ok()?;
    Some(buf)
}

/// Expand sub-byte packed pixels (1-bit, 2-bit, 4-bit) to 8-bit per component.
fn expand_sub_byte_pixels(raw_bytes: &[u8], meta: &RawImageMeta) -> Vec<u8> {
    let pixels_per_row = meta.width as usize * meta.channels as usize;
    let bits_per_row = pixels_per_row * meta.bits_per_component as usize;
    let bytes_per_row = bits_per_row.div_ceil(8);
    let bpc = meta.bits_per_component;
    let max_val = (1u16 << bpc) - 1;

    let mut result = Vec::with_capacity(pixels_per_row * meta.height as usize);

    for row in 0..meta.height as usize {
        let row_start = row * bytes_per_row;
        let row_bytes = &raw_bytes[row_start..row_start + bytes_per_row];
        let mut pixel_count = 0;

        for &byte in row_bytes {
            let pixels_in_byte = 8 / bpc as usize;
            for i in 0..pixels_in_byte {
                if pixel_count >= pixels_per_row {
                    break;
                }
                let shift = 8 - bpc * (i as u8 + 1);
                let val = (byte >> shift) & (max_val as u8);
                let scaled = (val as u16 * 255 / max_val) as u8;
                result.push(scaled);
                pixel_count += 1;
            }
        }
    }

    result
}

/// Convert CMYK pixel bytes to RGB.
fn cmyk_to_rgb(cmyk_bytes: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk_bytes.len() / 4 * 3);
    for pixel in cmyk_bytes.chunks_exact(4) {
        let (c, m, y, k) = (
            pixel[0] as u16,
            pixel[1] as u16,
            pixel[2] as u16,
            pixel[3] as u16,
        );
        let r = 255u16.saturating_sub((c + k).min(255)) as u8;
        let g = 255u16.saturating_sub((m + k).min(255)) as u8;
        let b = 255u16.saturating_sub((y + k).min(255)) as u8;
        rgb.extend_from_slice(&[r, g, b]);
    }
    rgb
}

/// Decode CCITT Group 4 fax data into a PNG image.
fn decode_ccitt(dict: &lopdf::Dictionary, raw_bytes: &[u8]) -> Option<Vec<u8>> {
    let decode_parms = extract_decode_parms(dict)?;

    let width = decode_parms.get(b"Columns").ok()?.as_i64().ok()? as u16;
    let height = decode_parms
        .get(b"Rows")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .map(|v| v as u16);

    let k = decode_parms
        .get(b"K")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);

    // Only Group 4 (K < 0) is supported.
    if k >= 0 {
        return None;
    }

    let bytes_per_row = (width as usize).div_ceil(8);
    let mut rows: Vec<Vec<u8>> = Vec::new();

    fax::decoder::decode_g4(raw_bytes.iter().copied(), width, height, |transitions| {
        let mut row = pack_row_bits(transitions, width);
        row.resize(bytes_per_row, 0);
        rows.push(row);
    })?;

    if rows.is_empty() {
        return None;
    }

    let pixel_data: Vec<u8> = rows.into_iter().flatten().collect();

    let meta = RawImageMeta {
        width: width as u32,
        height: pixel_data.len() as u32 / bytes_per_row as u32,
        bits_per_component: 1,
        channels: 1,
        color_space: ColorSpace::Gray,
    };

    encode_raw_as_png(&meta, &pixel_data)
}

/// Extract the DecodeParms dictionary from a stream dictionary.
fn extract_decode_parms(dict: &lopdf::Dictionary) -> Option<&lopdf::Dictionary> {
    let obj = dict.get(b"DecodeParms").ok()?;
    match obj {
        lopdf::Object::Dictionary(d) => Some(d),
        lopdf::Object::Array(arr) => arr.first().and_then(|o| o.as_dict().ok()),
        _ => None,
    }
}

/// Convert fax transition positions into a packed 1-bit byte array.
fn pack_row_bits(transitions: &[u16], width: u16) -> Vec<u8> {
    let bytes_per_row = (width as usize).div_ceil(8);
    let mut row = vec![0u8; bytes_per_row];

    let mut set_black_run = |start: u16, end: u16| {
        for col in start..end.min(width) {
            let byte_idx = col as usize / 8;
            let bit_idx = 7 - (col as usize % 8);
            row[byte_idx] |= 1 << bit_idx;
        }
    };

    let mut is_black = false;
    let mut prev_pos: u16 = 0;

    for &pos in transitions {
        if is_black {
            set_black_run(prev_pos, pos);
        }
        prev_pos = pos;
        is_black = !is_black;
    }

    if is_black {
        set_black_run(prev_pos, width);
    }

    row
}

// ---------------------------------------------------------------------------
// Page image decoding
// ---------------------------------------------------------------------------

/// Decode every image XObject on a page.
///
/// Walks `Resources -> XObject`, skipping Form XObjects.  JPEG/JPEG2000
/// streams are passed through as-is; CCITT fax data and raw pixel data are
/// re-encoded as PNG.  Streams that cannot be decoded are silently skipped
/// so one broken scan does not lose the rest of the page.
pub fn decode_page_images(
    backend: &LopdfBackend,
    page_id: (u32, u16),
) -> Result<Vec<PageImage>, PdfError> {
    let doc = backend.raw_doc();
    let mut images = Vec::new();

    let page_obj = doc
        .get_object(page_id)
        .map_err(|e| PdfError::Parse(format!("cannot get page object: {}", e)))?;

    let page_dict = page_obj
        .as_dict()
        .map_err(|e| PdfError::Parse(format!("page object is not a dictionary: {}", e)))?;

    let xobject_dict = match resolve_xobject_dict(doc, page_dict) {
        Some(d) => d,
        None => return Ok(images),
    };

    for (name, obj) in xobject_dict.iter() {
        let resolved = resolve_object(doc, obj);
        let Some(stream) = as_stream(resolved) else {
            continue;
        };

        let is_image = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Image");

        if !is_image {
            continue;
        }

        let filter_name = extract_filter_name(&stream.dict);

        // CCITTFaxDecode: lopdf cannot decompress this -- decode from raw stream
        if filter_name.as_deref() == Some("CCITTFaxDecode") {
            if let Some(png_bytes) = decode_ccitt(&stream.dict, &stream.content) {
                images.push(PageImage {
                    name: name.clone(),
                    bytes: png_bytes,
                    extension: ImageFormat::Png.extension().to_string(),
                });
            }
            continue;
        }

        let bytes = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let format = resolve_format(&bytes, filter_name.as_deref());

        if format != ImageFormat::Unknown {
            images.push(PageImage {
                name: name.clone(),
                extension: format.extension().to_string(),
                bytes,
            });
            continue;
        }

        // Raw pixel data: try re-encoding as PNG.
        if let Some(meta) = extract_image_meta(&stream.dict) {
            if let Some(png_bytes) = encode_raw_as_png(&meta, &bytes) {
                images.push(PageImage {
                    name: name.clone(),
                    bytes: png_bytes,
                    extension: ImageFormat::Png.extension().to_string(),
                });
            }
        }
    }

    Ok(images)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Resolve a `lopdf::Object` that might be a `Reference` to the actual object.
fn resolve_object<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Resolve an object to a `Dictionary`, following one level of reference
/// indirection if needed.
fn resolve_dict<'a>(
    doc: &'a lopdf::Document,
    obj: &'a lopdf::Object,
) -> Option<&'a lopdf::Dictionary> {
    match obj {
        lopdf::Object::Dictionary(d) => Some(d),
        lopdf::Object::Reference(id) => {
            let resolved = doc.get_object(*id).ok()?;
            resolved.as_dict().ok()
        }
        _ => None,
    }
}

/// Resolve the XObject dictionary from a page dictionary, following
/// references through Resources -> XObject.
fn resolve_xobject_dict<'a>(
    doc: &'a lopdf::Document,
    page_dict: &'a lopdf::Dictionary,
) -> Option<&'a lopdf::Dictionary> {
    let resources_obj = page_dict.get(b"Resources").ok()?;
    let resources_dict = resolve_dict(doc, resources_obj)?;
    let xobject_obj = resources_dict.get(b"XObject").ok()?;
    resolve_dict(doc, xobject_obj)
}

/// Extract the stream from an object, if it is a `Stream`.
fn as_stream(obj: &lopdf::Object) -> Option<&lopdf::Stream> {
    match obj {
        lopdf::Object::Stream(s) => Some(s),
        _ => None,
    }
}

/// Extract the first filter name from a stream dictionary.
///
/// The `Filter` entry can be a single `Name` or an `Array` of names.
fn extract_filter_name(dict: &lopdf::Dictionary) -> Option<String> {
    let filter_obj = dict.get(b"Filter").ok()?;
    match filter_obj {
        lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        lopdf::Object::Array(arr) => arr.first().and_then(|o| match o {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- detect_image_format ------------------------------------------------

    #[test]
    fn detect_jpeg() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
        assert_eq!(detect_image_format(&bytes), ImageFormat::Jpeg);
    }

    #[test]
    fn detect_png() {
        let bytes = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(detect_image_format(&bytes), ImageFormat::Png);
    }

    #[test]
    fn detect_gif() {
        assert_eq!(
            detect_image_format(b"GIF87a\x00\x00\x00\x00"),
            ImageFormat::Gif
        );
        assert_eq!(
            detect_image_format(b"GIF89a\x00\x00\x00\x00"),
            ImageFormat::Gif
        );
    }

    #[test]
    fn detect_tiff_both_endians() {
        let le = [0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        let be = [0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
        assert_eq!(detect_image_format(&le), ImageFormat::Tiff);
        assert_eq!(detect_image_format(&be), ImageFormat::Tiff);
    }

    #[test]
    fn detect_too_short() {
        assert_eq!(detect_image_format(&[0xFF, 0xD8]), ImageFormat::Unknown);
    }

    #[test]
    fn detect_unknown() {
        assert_eq!(
            detect_image_format(b"not an image"),
            ImageFormat::Unknown
        );
    }

    // -- filter hints --------------------------------------------------------

    #[test]
    fn filter_hint_wins_over_bytes() {
        // Garbage bytes, but the filter says JPEG.
        assert_eq!(
            resolve_format(b"garbage bytes here", Some("DCTDecode")),
            ImageFormat::Jpeg
        );
        assert_eq!(
            resolve_format(b"garbage bytes here", Some("JPXDecode")),
            ImageFormat::Jpeg2000
        );
    }

    #[test]
    fn unhelpful_filter_falls_back_to_magic_bytes() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(
            resolve_format(&png, Some("FlateDecode")),
            ImageFormat::Png
        );
    }

    // -- extensions ----------------------------------------------------------

    #[test]
    fn extensions_match_formats() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Unknown.extension(), "png");
    }

    // -- raw pixel handling --------------------------------------------------

    #[test]
    fn expected_byte_count_with_packing() {
        // 10 px wide, 1 bit per pixel: 2 bytes per row.
        let meta = RawImageMeta {
            width: 10,
            height: 4,
            bits_per_component: 1,
            channels: 1,
            color_space: ColorSpace::Gray,
        };
        assert_eq!(meta.expected_byte_count(), 8);
    }

    #[test]
    fn encode_rgb_as_png() {
        let meta = RawImageMeta {
            width: 2,
            height: 2,
            bits_per_component: 8,
            channels: 3,
            color_space: ColorSpace::Rgb,
        };
        let pixels = vec![255u8; 12];
        let png = encode_raw_as_png(&meta, &pixels).expect("encoding should succeed");
        assert_eq!(detect_image_format(&png), ImageFormat::Png);
    }

    #[test]
    fn encode_rejects_wrong_byte_count() {
        let meta = RawImageMeta {
            width: 2,
            height: 2,
            bits_per_component: 8,
            channels: 3,
            color_space: ColorSpace::Rgb,
        };
        assert!(encode_raw_as_png(&meta, &[0u8; 5]).is_none());
    }

    #[test]
    fn expand_one_bit_pixels() {
        let meta = RawImageMeta {
            width: 8,
            height: 1,
            bits_per_component: 1,
            channels: 1,
            color_space: ColorSpace::Gray,
        };
        // 0b10100000 -> pixels 255, 0, 255, 0, 0, 0, 0, 0
        let expanded = expand_sub_byte_pixels(&[0b1010_0000], &meta);
        assert_eq!(expanded, vec![255, 0, 255, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn cmyk_conversion_black() {
        // Pure K -> black.
        let rgb = cmyk_to_rgb(&[0, 0, 0, 255]);
        assert_eq!(rgb, vec![0, 0, 0]);
    }

    #[test]
    fn cmyk_conversion_white() {
        let rgb = cmyk_to_rgb(&[0, 0, 0, 0]);
        assert_eq!(rgb, vec![255, 255, 255]);
    }

    // -- fax row packing -----------------------------------------------------

    #[test]
    fn pack_row_bits_black_run() {
        // Transitions at 2 and 5: white 0..2, black 2..5, white 5..8.
        let row = pack_row_bits(&[2, 5], 8);
        assert_eq!(row, vec![0b0011_1000]);
    }

    #[test]
    fn pack_row_bits_trailing_black() {
        // Single transition at 4: black runs to the end of the row.
        let row = pack_row_bits(&[4], 8);
        assert_eq!(row, vec![0b0000_1111]);
    }

    #[test]
    fn pack_row_bits_all_white() {
        let row = pack_row_bits(&[], 8);
        assert_eq!(row, vec![0]);
    }
}
