//! A renderer that needs no image codec: it reads dimensions straight from the
//! image header and hands the original bytes back as the preview.

use futures_util::future::{self, FutureExt, LocalBoxFuture};

use super::Renderer;
use crate::error::RenderError;
use crate::types::{ContentKind, ContentLocator, PreviewKind, RenderedPreview};

/// Built-in renderer for inline PNG, GIF, JPEG and WebP content.
///
/// PDFs and external references are reported as unsupported; hosts inject a
/// real renderer for those.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderRenderer;

impl Renderer for HeaderRenderer {
    fn render(&self, locator: &ContentLocator) -> LocalBoxFuture<'static, Result<RenderedPreview, RenderError>> {
        future::ready(render_header(locator)).boxed_local()
    }
}

fn render_header(locator: &ContentLocator) -> Result<RenderedPreview, RenderError> {
    if !locator.is_inline() {
        return Err(RenderError::Unsupported("external reference".into()));
    }
    if locator.kind() == ContentKind::Pdf {
        return Err(RenderError::Unsupported("application/pdf".into()));
    }
    let content = locator
        .decode_inline()
        .ok_or_else(|| RenderError::Decode("payload is not valid base64".into()))?;
    let (width, height) = image_dimensions(&content.bytes)
        .ok_or_else(|| RenderError::Decode(format!("unrecognised {} header", content.mime_type)))?;
    Ok(RenderedPreview {
        image_bytes: content.bytes,
        width,
        height,
        kind: PreviewKind::Image,
        page_count: None,
    })
}

/// Width and height from a PNG, GIF, JPEG or WebP header.
#[must_use]
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        png_dimensions(bytes)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some((u32::from(le_u16(bytes, 6)?), u32::from(le_u16(bytes, 8)?)))
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        jpeg_dimensions(bytes)
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP") {
        webp_dimensions(bytes)
    } else {
        None
    }
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    Some((be_u32(bytes, 16)?, be_u32(bytes, 20)?))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2;
    loop {
        // Skip fill bytes before the marker code.
        while *bytes.get(pos)? == 0xFF && *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        // Standalone markers carry no length.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let len = usize::from(be_u16(bytes, pos + 2)?);
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let height = be_u16(bytes, pos + 5)?;
            let width = be_u16(bytes, pos + 7)?;
            return Some((u32::from(width), u32::from(height)));
        }
        if marker == 0xD9 || len < 2 {
            return None;
        }
        pos += 2 + len;
    }
}

fn webp_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    match bytes.get(12..16)? {
        b"VP8X" => {
            let w = le_u24(bytes, 24)? + 1;
            let h = le_u24(bytes, 27)? + 1;
            Some((w, h))
        }
        b"VP8 " => {
            let w = le_u16(bytes, 26)? & 0x3FFF;
            let h = le_u16(bytes, 28)? & 0x3FFF;
            Some((u32::from(w), u32::from(h)))
        }
        b"VP8L" => {
            let b = bytes.get(21..25)?;
            let bits = u32::from_le_bytes([*b.first()?, *b.get(1)?, *b.get(2)?, *b.get(3)?]);
            Some(((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1))
        }
        _ => None,
    }
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([*b.first()?, *b.get(1)?]))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([*b.first()?, *b.get(1)?, *b.get(2)?, *b.get(3)?]))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([*b.first()?, *b.get(1)?]))
}

fn le_u24(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 3)?;
    Some(u32::from_le_bytes([*b.first()?, *b.get(1)?, *b.get(2)?, 0]))
}
