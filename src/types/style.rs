use serde::{Deserialize, Serialize};

use crate::cell_ref::CellAddress;

/// Pass-through cell formatting carried across export and import.
///
/// Colors are 6-digit RGB hex strings without a leading `#`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStyle {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wrap_text: bool,
}

impl CellStyle {
    /// Whether the style carries nothing worth writing.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        !self.bold
            && !self.italic
            && !self.wrap_text
            && self.font_size.is_none()
            && self.font_color.is_none()
            && self.fill_color.is_none()
    }

    /// Whether any font attribute is set.
    #[must_use]
    pub fn has_font(&self) -> bool {
        self.bold || self.italic || self.font_size.is_some() || self.font_color.is_some()
    }
}

/// One cell of a spreadsheet artifact as read from or written to an archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub address: CellAddress,
    pub text: String,
    /// Raw hyperlink target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<CellStyle>,
}

impl GridCell {
    #[must_use]
    pub fn text(address: CellAddress, text: impl Into<String>) -> Self {
        Self {
            address,
            text: text.into(),
            hyperlink: None,
            style: None,
        }
    }
}
