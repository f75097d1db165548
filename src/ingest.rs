//! Upload validation: which files may become evidence.

use crate::error::ValidationError;
use crate::types::{extension, mime_for_file_name, ContentLocator};

/// MIME types accepted as evidence.
pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "pdf"];

/// A file offered by the user for attachment.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    /// MIME type reported by the host; may be empty.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// An upload whose MIME type is inferred from the file name.
    #[must_use]
    pub fn from_file_name(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for_file_name(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }
}

/// Check an upload against the accepted types and the size ceiling.
///
/// Returns the MIME type the content should be stored under. Either an accepted
/// MIME type or an accepted extension admits the file. The size ceiling applies
/// only to non-PDF content.
pub fn validate(upload: &Upload, max_bytes: u64) -> Result<String, ValidationError> {
    let mime = upload.mime_type.trim().to_ascii_lowercase();
    let mime_ok = ACCEPTED_MIME_TYPES.contains(&mime.as_str());
    let ext_ok = extension(&upload.file_name)
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));

    if !mime_ok && !ext_ok {
        return Err(ValidationError::UnsupportedType {
            file_name: upload.file_name.clone(),
            mime_type: upload.mime_type.clone(),
        });
    }

    let stored_mime = if mime_ok {
        mime
    } else {
        mime_for_file_name(&upload.file_name).to_string()
    };

    let size = u64::try_from(upload.bytes.len()).unwrap_or(u64::MAX);
    if !stored_mime.contains("pdf") && size > max_bytes {
        return Err(ValidationError::TooLarge {
            file_name: upload.file_name.clone(),
            size,
            limit: max_bytes,
        });
    }

    Ok(stored_mime)
}

/// Validate an upload and turn it into an inline locator.
pub fn ingest(upload: &Upload, max_bytes: u64) -> Result<ContentLocator, ValidationError> {
    let mime = validate(upload, max_bytes)?;
    Ok(ContentLocator::inline(&mime, &upload.bytes))
}
