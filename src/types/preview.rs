use serde::Serialize;

/// What a preview depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Image,
    Document,
}

/// Rendered, immutable preview of a piece of evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPreview {
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub kind: PreviewKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

impl RenderedPreview {
    /// Bytes accounted against the cache for this preview.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.image_bytes.len()
    }
}
