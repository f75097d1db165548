use std::fmt;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Sentinel glyph prefixing the visible text of a cell that carries evidence.
pub const MARKER: &str = "📌";

/// Visible cell text for a piece of evidence: `"📌 <label>"`.
#[must_use]
pub fn marker_text(label: &str) -> String {
    format!("{MARKER} {label}")
}

/// Opaque, comparable key identifying a piece of evidence content.
///
/// Inline content is a `data:<mime>;base64,<payload>` URL; anything else is an
/// external reference. The string is shared, so clones are cheap even for
/// multi-megabyte inline payloads.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentLocator(Rc<str>);

impl ContentLocator {
    /// Build an inline locator carrying `bytes` as base64.
    #[must_use]
    pub fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        let encoded = STANDARD.encode(bytes);
        Self(Rc::from(format!("data:{mime_type};base64,{encoded}")))
    }

    /// Wrap an external reference (URL or path).
    #[must_use]
    pub fn external(reference: impl Into<String>) -> Self {
        Self(Rc::from(reference.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the content is embedded in the locator itself.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// MIME type declared by an inline locator.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let header = rest.split(',').next()?;
        let mime = header.split(';').next()?;
        if mime.is_empty() {
            None
        } else {
            Some(mime)
        }
    }

    /// Decode the payload of an inline locator.
    ///
    /// Returns `None` for external locators and for inline ones that are not
    /// base64 encoded or whose payload is corrupt.
    #[must_use]
    pub fn decode_inline(&self) -> Option<InlineContent> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
            return None;
        }
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        let mime_type = self
            .mime_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        Some(InlineContent { mime_type, bytes })
    }

    /// Best-effort content kind, from the MIME type or the reference's extension.
    ///
    /// Unknown extensions are treated as images.
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        if self.is_inline() {
            return match self.mime_type() {
                Some(m) if m.eq_ignore_ascii_case("application/pdf") => ContentKind::Pdf,
                _ => ContentKind::Image,
            };
        }
        let path = self.0.split(['?', '#']).next().unwrap_or("");
        match extension(path).map(str::to_ascii_lowercase).as_deref() {
            Some("pdf") => ContentKind::Pdf,
            _ => ContentKind::Image,
        }
    }
}

impl fmt::Debug for ContentLocator {
    // Inline payloads can be huge; show only the head.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(48).collect();
        if head.len() < self.0.len() {
            write!(f, "ContentLocator({head}… {} bytes)", self.0.len())
        } else {
            write!(f, "ContentLocator({head})")
        }
    }
}

/// Decoded inline payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineContent {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Accepted evidence content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Pdf,
}

/// Evidence attached to one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceLink {
    pub locator: ContentLocator,
    /// Display label, normally the original file name.
    pub label: String,
}

impl EvidenceLink {
    #[must_use]
    pub fn new(locator: ContentLocator, label: impl Into<String>) -> Self {
        Self {
            locator,
            label: label.into(),
        }
    }

    /// The cell text this link is expected to render as.
    #[must_use]
    pub fn marker_text(&self) -> String {
        marker_text(&self.label)
    }
}

/// Extension of a file name or path, without the dot.
#[must_use]
pub fn extension(name: &str) -> Option<&str> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// MIME type for an evidence file name, inferred from its extension.
#[must_use]
pub fn mime_for_file_name(name: &str) -> &'static str {
    match extension(name).map(str::to_ascii_lowercase).as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// File extension (with dot) for a MIME type, used when a label has none.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "application/pdf" => ".pdf",
        _ => ".dat",
    }
}
